//! Classification entry point and per-bucket fan-out.
//!
//! # Overview
//!
//! [`DuplicateFinder::classify`] runs the whole pipeline over a slice of
//! caller-owned sources:
//! 1. **Bucketing** - look up every declared length (see [`crate::duplicates::groups`])
//! 2. **Classifying** - build one [`DiscriminationTree`] per shared length,
//!    one rayon task per bucket
//! 3. **Collecting** - flatten every tree's terminal lists into duplicate groups
//!
//! Buckets share nothing, so each tree is built by exactly one worker and
//! all trees are finished before any group is reported. Any failure aborts
//! the whole call; a partial partition is never returned.
//!
//! # Example
//!
//! ```
//! use std::io::Cursor;
//! use treedupe::duplicates::{DuplicateFinder, FinderConfig};
//!
//! let mut sources = vec![
//!     Cursor::new(b"alpha".to_vec()),
//!     Cursor::new(b"omega".to_vec()),
//!     Cursor::new(b"alpha".to_vec()),
//! ];
//!
//! let finder = DuplicateFinder::new(FinderConfig::default().with_io_threads(1));
//! let (groups, summary) = finder.classify(&mut sources).unwrap();
//!
//! assert_eq!(groups.len(), 1);
//! assert_eq!(groups[0].members, vec![0, 2]);
//! assert_eq!(summary.duplicate_files, 1);
//! ```

use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytesize::ByteSize;
use rayon::prelude::*;

use super::{bucket_by_size, Candidate, DiscriminationTree, DuplicateGroup, TreeStats};
use crate::progress::ProgressCallback;
use crate::source::{ChunkPolicy, ChunkSource};

/// Errors that abort a classification call.
#[derive(thiserror::Error, Debug)]
pub enum FinderError {
    /// Classification was interrupted by user (Ctrl+C or shutdown signal).
    #[error("Classification interrupted by user")]
    Interrupted,

    /// The declared length of a candidate could not be determined.
    #[error("Cannot determine length of candidate #{index}: {source}")]
    LengthLookup {
        /// Input index of the candidate
        index: usize,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Reading a chunk failed for a reason other than end-of-input.
    #[error("Read failed for candidate #{index} at chunk depth {depth}: {source}")]
    Read {
        /// Input index of the candidate
        index: usize,
        /// Tree depth of the failed read
        depth: usize,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The worker pool could not be created.
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(String),
}

impl FinderError {
    /// Input index of the candidate responsible for this error, if any.
    #[must_use]
    pub fn candidate(&self) -> Option<usize> {
        match self {
            Self::LengthLookup { index, .. } | Self::Read { index, .. } => Some(*index),
            Self::Interrupted | Self::ThreadPool(_) => None,
        }
    }
}

/// Configuration for the duplicate finder.
#[derive(Clone)]
pub struct FinderConfig {
    /// Chunk sizing applied to every tree.
    pub chunk_policy: ChunkPolicy,
    /// Number of worker threads building trees.
    /// Default is 4 to prevent disk thrashing.
    pub io_threads: usize,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback for reporting.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for FinderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinderConfig")
            .field("chunk_policy", &self.chunk_policy)
            .field("io_threads", &self.io_threads)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            chunk_policy: ChunkPolicy::default(),
            io_threads: 4,
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl FinderConfig {
    /// Set the chunk sizing policy.
    #[must_use]
    pub fn with_chunk_policy(mut self, policy: ChunkPolicy) -> Self {
        self.chunk_policy = policy;
        self
    }

    /// Set the worker thread count (at least 1).
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Check if shutdown has been requested.
    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }
}

/// Summary statistics from one classification call.
#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    /// Total number of candidates
    pub total_files: usize,
    /// Sum of all declared lengths in bytes
    pub total_size: u64,
    /// Candidates eliminated because their length was unique
    pub eliminated_by_size: usize,
    /// Number of size buckets that needed a tree
    pub buckets_classified: usize,
    /// Number of chunk reads issued across all trees
    pub content_reads: u64,
    /// Content bytes read across all trees
    pub bytes_read: u64,
    /// Deepest chunk level reached in any tree
    pub max_depth: usize,
    /// Number of duplicate groups
    pub duplicate_groups: usize,
    /// Number of redundant copies (members minus one, summed over groups)
    pub duplicate_files: usize,
    /// Bytes freed by keeping one member of every group
    pub reclaimable_space: u64,
    /// Wall time of the whole call
    pub scan_duration: Duration,
}

impl ScanSummary {
    /// Percentage of the declared bytes that actually had to be read.
    #[must_use]
    pub fn read_percentage(&self) -> f64 {
        if self.total_size == 0 {
            0.0
        } else {
            (self.bytes_read as f64 / self.total_size as f64) * 100.0
        }
    }

    /// Format reclaimable space as human-readable string.
    #[must_use]
    pub fn reclaimable_display(&self) -> String {
        ByteSize::b(self.reclaimable_space).to_string()
    }

    /// Format total size as human-readable string.
    #[must_use]
    pub fn total_size_display(&self) -> String {
        ByteSize::b(self.total_size).to_string()
    }

    fn absorb_tree(&mut self, stats: &TreeStats) {
        self.buckets_classified += 1;
        self.content_reads += stats.reads;
        self.bytes_read += stats.bytes_read;
        self.max_depth = self.max_depth.max(stats.max_depth);
    }
}

/// Duplicate finder that buckets candidates and classifies each bucket.
///
/// # Example
///
/// ```no_run
/// use std::fs::File;
/// use treedupe::duplicates::DuplicateFinder;
///
/// let mut files = vec![File::open("a.bin")?, File::open("b.bin")?];
/// let (groups, summary) = DuplicateFinder::with_defaults().classify(&mut files)?;
///
/// println!("Found {} duplicate groups", groups.len());
/// println!("Read {} of {} bytes", summary.bytes_read, summary.total_size);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct DuplicateFinder {
    config: FinderConfig,
}

impl DuplicateFinder {
    /// Create a new duplicate finder with the given configuration.
    #[must_use]
    pub fn new(config: FinderConfig) -> Self {
        Self { config }
    }

    /// Create a new duplicate finder with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(FinderConfig::default())
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Partition `sources` into groups of identical content.
    ///
    /// Sources are borrowed for the duration of the call and read strictly
    /// forward from their current position; they are never closed. Groups
    /// hold input indices and are sorted by (size, first member).
    ///
    /// # Errors
    ///
    /// Returns [`FinderError`] if a length lookup or chunk read fails, if
    /// shutdown is requested, or if the worker pool cannot be created.
    pub fn classify<S: ChunkSource + Send>(
        &self,
        sources: &mut [S],
    ) -> Result<(Vec<DuplicateGroup>, ScanSummary), FinderError> {
        let start_time = Instant::now();
        let mut summary = ScanSummary::default();

        if self.config.is_shutdown_requested() {
            return Err(FinderError::Interrupted);
        }

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start("bucketing", sources.len());
        }

        let (buckets, size_stats) = bucket_by_size(sources)?;

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end("bucketing");
        }

        summary.total_files = size_stats.total_files;
        summary.total_size = size_stats.total_size;
        summary.eliminated_by_size = size_stats.eliminated_unique;

        if buckets.is_empty() {
            log::info!("No shared lengths, nothing to classify");
            summary.scan_duration = start_time.elapsed();
            return Ok((Vec::new(), summary));
        }

        let mut buckets: Vec<(u64, Vec<Candidate<'_, S>>)> = buckets.into_iter().collect();
        // Largest buckets first keeps the pool busy until the end.
        buckets.sort_unstable_by(|a, b| b.1.len().cmp(&a.1.len()).then(a.0.cmp(&b.0)));

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start("classifying", buckets.len());
        }

        log::info!(
            "Classifying {} size buckets on {} worker thread(s)",
            buckets.len(),
            self.config.io_threads
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.io_threads)
            .build()
            .map_err(|e| FinderError::ThreadPool(e.to_string()))?;

        let completed = AtomicUsize::new(0);
        let outcomes: Vec<(Vec<DuplicateGroup>, TreeStats)> = pool.install(|| {
            buckets
                .into_par_iter()
                .map(|(size, candidates)| self.classify_bucket(size, candidates, &completed))
                .collect::<Result<Vec<_>, FinderError>>()
        })?;

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end("classifying");
        }

        let mut groups = Vec::new();
        for (bucket_groups, stats) in outcomes {
            summary.absorb_tree(&stats);
            groups.extend(bucket_groups);
        }
        groups.sort_unstable_by_key(|g| (g.size, g.members.first().copied()));

        summary.duplicate_groups = groups.len();
        summary.duplicate_files = groups.iter().map(DuplicateGroup::duplicate_count).sum();
        summary.reclaimable_space = groups.iter().map(DuplicateGroup::wasted_space).sum();
        summary.scan_duration = start_time.elapsed();

        log::info!(
            "Classification complete: {} duplicate groups, {} duplicate files, {} reclaimable, {:.1}% of bytes read",
            summary.duplicate_groups,
            summary.duplicate_files,
            summary.reclaimable_display(),
            summary.read_percentage()
        );

        Ok((groups, summary))
    }

    /// Build, drain and drop the tree for one bucket.
    fn classify_bucket<S: ChunkSource>(
        &self,
        size: u64,
        candidates: Vec<Candidate<'_, S>>,
        completed: &AtomicUsize,
    ) -> Result<(Vec<DuplicateGroup>, TreeStats), FinderError> {
        let count = candidates.len();
        let mut tree = DiscriminationTree::new(size, self.config.chunk_policy);

        for candidate in candidates {
            if self.config.is_shutdown_requested() {
                log::debug!("Shutdown requested, abandoning {} byte bucket", size);
                return Err(FinderError::Interrupted);
            }
            tree.insert(candidate)?;
        }

        let stats = tree.stats();
        let groups = tree.into_groups();

        log::debug!(
            "Bucket {} bytes: {} candidates → {} groups ({} reads, {} bytes, depth {})",
            size,
            count,
            groups.len(),
            stats.reads,
            stats.bytes_read,
            stats.max_depth
        );

        if let Some(ref callback) = self.config.progress_callback {
            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            callback.on_item_completed(stats.bytes_read);
            callback.on_progress(done, &format!("{} bytes", ByteSize::b(size)));
        }

        Ok((groups, stats))
    }
}

/// Partition `sources` into groups of identical content with the default
/// configuration.
///
/// Groups with fewer than two members are never returned; an empty input
/// yields an empty result.
///
/// # Errors
///
/// See [`DuplicateFinder::classify`].
///
/// # Example
///
/// ```
/// use std::io::Cursor;
/// use treedupe::duplicates::find_duplicates;
///
/// let mut sources = vec![Cursor::new(vec![1u8; 300]), Cursor::new(vec![1u8; 300])];
/// let groups = find_duplicates(&mut sources).unwrap();
/// assert_eq!(groups[0].members, vec![0, 1]);
/// ```
pub fn find_duplicates<S: ChunkSource + Send>(
    sources: &mut [S],
) -> Result<Vec<DuplicateGroup>, FinderError> {
    DuplicateFinder::with_defaults()
        .classify(sources)
        .map(|(groups, _)| groups)
}
