//! Plain-text output for terminals.
//!
//! One block per duplicate group, separated by blank lines, followed by a
//! one-line summary:
//!
//! ```text
//! 3 files, 1.0 KiB each
//!   photos/a.jpg
//!   photos/b.jpg
//!   backup/a.jpg
//!
//! 1 duplicate group, 2 redundant files, 2.0 KiB reclaimable (read 3.0 KiB of 3.0 KiB)
//! ```

use std::io::{self, Write};
use std::path::Path;

use bytesize::ByteSize;
use yansi::{Condition, Paint};

use super::group_names;
use crate::duplicates::{DuplicateGroup, ScanSummary};

/// Text output formatter.
pub struct TextOutput<'a, N> {
    groups: &'a [DuplicateGroup],
    names: &'a [N],
    summary: &'a ScanSummary,
    color: bool,
}

impl<'a, N: AsRef<Path>> TextOutput<'a, N> {
    /// Create a new text formatter. Color is off by default.
    #[must_use]
    pub fn new(groups: &'a [DuplicateGroup], names: &'a [N], summary: &'a ScanSummary) -> Self {
        Self {
            groups,
            names,
            summary,
            color: false,
        }
    }

    /// Enable or disable ANSI styling.
    #[must_use]
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    /// Write all groups and the summary line.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let when = if self.color {
            Condition::ALWAYS
        } else {
            Condition::NEVER
        };

        for group in self.groups {
            let header = format!("{} files, {} each", group.len(), ByteSize::b(group.size));
            writeln!(writer, "{}", header.bold().whenever(when))?;
            for path in group_names(group, self.names) {
                writeln!(writer, "  {}", path.display())?;
            }
            writeln!(writer)?;
        }

        let summary = self.summary;
        if self.groups.is_empty() {
            write!(writer, "{}", "No duplicates found".green().whenever(when))?;
        } else {
            let line = format!(
                "{} duplicate group{}, {} redundant file{}, {} reclaimable",
                summary.duplicate_groups,
                plural(summary.duplicate_groups),
                summary.duplicate_files,
                plural(summary.duplicate_files),
                summary.reclaimable_display(),
            );
            write!(writer, "{}", line.yellow().whenever(when))?;
        }
        writeln!(
            writer,
            " (read {} of {})",
            ByteSize::b(summary.bytes_read),
            summary.total_size_display()
        )?;

        Ok(())
    }

    /// Render the output as a string.
    #[must_use]
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_to(&mut buffer);
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}
