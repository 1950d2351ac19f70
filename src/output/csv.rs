//! CSV output formatter for classification results.
//!
//! One row is generated for each member of each duplicate group.
//!
//! # Columns
//!
//! - `group_id`: 1-based ID of the duplicate group
//! - `path`: Path of the file
//! - `size`: File size in bytes
//!
//! The header row is written even when there are no groups.

use std::io;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use super::group_names;
use crate::duplicates::DuplicateGroup;

/// Errors that can occur during CSV output generation.
#[derive(Debug, Error)]
pub enum CsvOutputError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

const HEADER: [&str; 3] = ["group_id", "path", "size"];

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    group_id: usize,
    path: &'a str,
    size: u64,
}

/// CSV output formatter.
pub struct CsvOutput<'a, N> {
    groups: &'a [DuplicateGroup],
    names: &'a [N],
}

impl<'a, N: AsRef<Path>> CsvOutput<'a, N> {
    /// Create a new CSV output formatter.
    #[must_use]
    pub fn new(groups: &'a [DuplicateGroup], names: &'a [N]) -> Self {
        Self { groups, names }
    }

    /// Write the CSV output (with header row) to the given writer.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if writing or serialization fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), CsvOutputError> {
        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);
        csv_writer.write_record(HEADER)?;

        for (idx, group) in self.groups.iter().enumerate() {
            for path in group_names(group, self.names) {
                let path = path.to_string_lossy();
                csv_writer.serialize(CsvRow {
                    group_id: idx + 1,
                    path: &path,
                    size: group.size,
                })?;
            }
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Generate CSV output as a string.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if serialization fails.
    pub fn to_string(&self) -> Result<String, CsvOutputError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
