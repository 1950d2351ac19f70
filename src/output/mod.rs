//! Output formatters for classification results.
//!
//! The core only reports input indices. This module maps them back to
//! names and renders them:
//! - Text for people
//! - JSON for automation and scripting
//! - CSV for spreadsheet import
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use treedupe::duplicates::DuplicateFinder;
//! use treedupe::output::json::JsonOutput;
//! use treedupe::scanner::{open_candidates, WalkerConfig};
//!
//! let mut opened = open_candidates(&[PathBuf::from("a"), PathBuf::from("b")], &WalkerConfig::default(), None)?;
//! let (groups, summary) = DuplicateFinder::with_defaults().classify(&mut opened.candidates)?;
//!
//! let output = JsonOutput::new(&groups, &opened.candidates, &summary);
//! println!("{}", output.to_json_pretty()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod csv;
pub mod json;
pub mod text;

use std::path::Path;

use crate::duplicates::DuplicateGroup;

pub use csv::CsvOutput;
pub use json::JsonOutput;
pub use text::TextOutput;

/// Names of the members of `group`, in member order.
///
/// `names` is indexed like the slice that was classified. Indices without a
/// name are left out; names never influence grouping.
///
/// ```
/// use std::path::{Path, PathBuf};
/// use treedupe::duplicates::DuplicateGroup;
/// use treedupe::output::group_names;
///
/// let names = [PathBuf::from("a"), PathBuf::from("b"), PathBuf::from("c")];
/// let group = DuplicateGroup::new(3, vec![2, 0]);
/// assert_eq!(group_names(&group, &names), vec![Path::new("a"), Path::new("c")]);
/// ```
#[must_use]
pub fn group_names<'a, N: AsRef<Path>>(group: &DuplicateGroup, names: &'a [N]) -> Vec<&'a Path> {
    group
        .members
        .iter()
        .filter_map(|&index| names.get(index).map(AsRef::as_ref))
        .collect()
}
