//! JSON output formatter for classification results.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "duplicates": [
//!     {
//!       "size": 1024,
//!       "files": ["/path/to/file1.txt", "/path/to/file2.txt"]
//!     }
//!   ],
//!   "summary": {
//!     "total_files": 100,
//!     "total_size": 1048576,
//!     "eliminated_by_size": 80,
//!     "buckets_classified": 7,
//!     "content_reads": 420,
//!     "bytes_read": 65536,
//!     "duplicate_groups": 5,
//!     "duplicate_files": 10,
//!     "reclaimable_space": 51200,
//!     "scan_duration_ms": 12
//!   }
//! }
//! ```

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use super::group_names;
use crate::duplicates::{DuplicateGroup, ScanSummary};

/// A single duplicate group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateGroup {
    /// Length shared by every member, in bytes
    pub size: u64,
    /// Paths of the members, in input order
    pub files: Vec<String>,
}

impl JsonDuplicateGroup {
    /// Resolve a group's member indices against `names`.
    #[must_use]
    pub fn from_duplicate_group<N: AsRef<Path>>(group: &DuplicateGroup, names: &[N]) -> Self {
        Self {
            size: group.size,
            files: group_names(group, names)
                .into_iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
        }
    }
}

/// Summary statistics in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Total number of candidates
    pub total_files: usize,
    /// Sum of all declared lengths in bytes
    pub total_size: u64,
    /// Candidates dropped because no other candidate had their length
    pub eliminated_by_size: usize,
    /// Size buckets that needed content comparison
    pub buckets_classified: usize,
    /// Chunk reads issued
    pub content_reads: u64,
    /// Content bytes read
    pub bytes_read: u64,
    /// Number of duplicate groups
    pub duplicate_groups: usize,
    /// Redundant copies (excluding one member per group)
    pub duplicate_files: usize,
    /// Bytes freed by keeping one member per group
    pub reclaimable_space: u64,
    /// Duration of the classification in milliseconds
    pub scan_duration_ms: u64,
}

impl From<&ScanSummary> for JsonSummary {
    fn from(summary: &ScanSummary) -> Self {
        Self {
            total_files: summary.total_files,
            total_size: summary.total_size,
            eliminated_by_size: summary.eliminated_by_size,
            buckets_classified: summary.buckets_classified,
            content_reads: summary.content_reads,
            bytes_read: summary.bytes_read,
            duplicate_groups: summary.duplicate_groups,
            duplicate_files: summary.duplicate_files,
            reclaimable_space: summary.reclaimable_space,
            scan_duration_ms: u64::try_from(summary.scan_duration.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// Complete JSON output document.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Duplicate groups
    pub duplicates: Vec<JsonDuplicateGroup>,
    /// Summary statistics
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Build the output document.
    #[must_use]
    pub fn new<N: AsRef<Path>>(
        groups: &[DuplicateGroup],
        names: &[N],
        summary: &ScanSummary,
    ) -> Self {
        Self {
            duplicates: groups
                .iter()
                .map(|g| JsonDuplicateGroup::from_duplicate_group(g, names))
                .collect(),
            summary: JsonSummary::from(summary),
        }
    }

    /// Serialize to compact JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON to a writer, followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), serde_json::Error> {
        if pretty {
            serde_json::to_writer_pretty(&mut *writer, self)?;
        } else {
            serde_json::to_writer(&mut *writer, self)?;
        }
        writeln!(writer).map_err(serde_json::Error::io)
    }
}
