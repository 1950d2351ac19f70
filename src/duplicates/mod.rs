//! Duplicate classification module.
//!
//! This module provides functionality for:
//! - Size bucketing (candidates with a unique length are dropped unread)
//! - Per-bucket discrimination trees that read content chunk by chunk
//! - Collecting duplicate groups from finished trees

pub mod collector;
pub mod finder;
pub mod groups;
pub mod tree;

pub use collector::collect_groups;
pub use finder::{find_duplicates, DuplicateFinder, FinderConfig, FinderError, ScanSummary};
pub use groups::{bucket_by_size, Candidate, DuplicateGroup, GroupingStats, SizeBuckets};
pub use tree::{Branch, DiscriminationTree, Node, TreeStats};
