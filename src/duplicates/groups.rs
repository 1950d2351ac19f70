//! Size bucketing and duplicate group types.
//!
//! # Overview
//!
//! Size bucketing is the first step of classification. Every candidate's
//! declared length is looked up once, in input order, and candidates are
//! routed to the bucket for that length. Candidates whose length is unique
//! among the input can never be duplicates; their buckets are dropped here
//! and their content is never read.
//!
//! # Example
//!
//! ```
//! use std::io::Cursor;
//! use treedupe::duplicates::bucket_by_size;
//!
//! let mut sources = vec![
//!     Cursor::new(b"aaaa".to_vec()),
//!     Cursor::new(b"bbbb".to_vec()),
//!     Cursor::new(b"cc".to_vec()),
//! ];
//!
//! let (buckets, stats) = bucket_by_size(&mut sources).unwrap();
//!
//! assert_eq!(stats.total_files, 3);
//! assert_eq!(stats.eliminated_unique, 1); // the 2-byte source
//! assert_eq!(buckets.len(), 1);
//! assert_eq!(buckets[&4].len(), 2);
//! ```

use std::collections::HashMap;

use serde::Serialize;

use super::FinderError;
use crate::source::ChunkSource;

/// One input source together with its position in the input and its
/// declared length.
///
/// The candidate only borrows the source. Identity is the input index.
#[derive(Debug)]
pub struct Candidate<'a, S: ?Sized> {
    /// Position of the source in the caller's input slice
    pub index: usize,
    /// Declared length in bytes
    pub len: u64,
    /// The source itself, read strictly forward
    pub source: &'a mut S,
}

impl<'a, S: ?Sized> Candidate<'a, S> {
    /// Create a candidate for the source at `index`.
    #[must_use]
    pub fn new(index: usize, len: u64, source: &'a mut S) -> Self {
        Self { index, len, source }
    }
}

/// Candidates keyed by declared length. Only lengths shared by 2+
/// candidates are present.
pub type SizeBuckets<'a, S> = HashMap<u64, Vec<Candidate<'a, S>>>;

/// Statistics from the size bucketing step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingStats {
    /// Total number of candidates processed
    pub total_files: usize,
    /// Sum of all declared lengths in bytes
    pub total_size: u64,
    /// Number of distinct declared lengths
    pub unique_sizes: usize,
    /// Number of candidates that share their length with another
    pub potential_duplicates: usize,
    /// Number of candidates eliminated because their length is unique
    pub eliminated_unique: usize,
    /// Number of zero-length candidates seen
    pub empty_files: usize,
    /// Number of buckets with 2+ candidates
    pub duplicate_groups: usize,
}

impl GroupingStats {
    /// Percentage of candidates eliminated by size alone.
    #[must_use]
    pub fn elimination_rate(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            (self.eliminated_unique as f64 / self.total_files as f64) * 100.0
        }
    }
}

/// Route every source into a bucket keyed by its declared length.
///
/// Order within a bucket follows input order. No content is read.
///
/// # Errors
///
/// Returns [`FinderError::LengthLookup`] for the first source whose length
/// cannot be determined; nothing is returned for the others.
pub fn bucket_by_size<S: ChunkSource>(
    sources: &mut [S],
) -> Result<(SizeBuckets<'_, S>, GroupingStats), FinderError> {
    let mut all_buckets: SizeBuckets<'_, S> = HashMap::new();
    let mut stats = GroupingStats::default();

    for (index, source) in sources.iter_mut().enumerate() {
        let len = source
            .declared_len()
            .map_err(|source| FinderError::LengthLookup { index, source })?;

        stats.total_files += 1;
        stats.total_size += len;
        if len == 0 {
            stats.empty_files += 1;
        }

        all_buckets
            .entry(len)
            .or_default()
            .push(Candidate::new(index, len, source));
    }

    stats.unique_sizes = all_buckets.len();

    let buckets: SizeBuckets<'_, S> = all_buckets
        .into_iter()
        .filter(|(size, candidates)| {
            if candidates.len() == 1 {
                stats.eliminated_unique += 1;
                log::trace!(
                    "Eliminated unique size {}: candidate #{}",
                    size,
                    candidates[0].index
                );
                false
            } else {
                stats.potential_duplicates += candidates.len();
                stats.duplicate_groups += 1;
                log::debug!(
                    "Size bucket {} bytes: {} potential duplicates",
                    size,
                    candidates.len()
                );
                true
            }
        })
        .collect();

    log::info!(
        "Size bucketing complete: {} candidates → {} potential duplicates ({:.1}% eliminated)",
        stats.total_files,
        stats.potential_duplicates,
        stats.elimination_rate()
    );

    Ok((buckets, stats))
}

/// A set of two or more candidates with identical length and content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateGroup {
    /// Length in bytes shared by every member
    pub size: u64,
    /// Input indices of the members, ascending
    pub members: Vec<usize>,
}

impl DuplicateGroup {
    /// Create a group; members are sorted into input order.
    #[must_use]
    pub fn new(size: u64, mut members: Vec<usize>) -> Self {
        members.sort_unstable();
        Self { size, members }
    }

    /// Number of members in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Number of redundant copies (members minus one).
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.members.len().saturating_sub(1)
    }

    /// Bytes that removing the redundant copies would free.
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.size * self.duplicate_count() as u64
    }

    /// Check whether the candidate at `index` belongs to this group.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        self.members.binary_search(&index).is_ok()
    }
}
