//! Progress reporting utilities using indicatif.
//!
//! This module provides the [`Progress`] struct which implements [`ProgressCallback`]
//! to display progress bars on stderr while candidates are classified.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use bytesize::ByteSize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Progress callback for the classification phases.
///
/// Implement this trait to receive progress updates from
/// [`crate::duplicates::DuplicateFinder`].
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts.
    ///
    /// # Arguments
    ///
    /// * `phase` - Name of the phase ("bucketing" or "classifying")
    /// * `total` - Total number of items to process
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called for each item processed.
    ///
    /// # Arguments
    ///
    /// * `current` - Number of items finished so far (1-based)
    /// * `label` - Short description of the finished item
    fn on_progress(&self, current: usize, label: &str);

    /// Called when an item has been processed, with the content bytes it read.
    fn on_item_completed(&self, _bytes: u64) {}

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);
}

/// Progress reporter using indicatif.
pub struct Progress {
    multi: MultiProgress,
    bucketing: Mutex<Option<ProgressBar>>,
    classifying: Mutex<Option<ProgressBar>>,
    bytes_read: AtomicU64,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress bars will be displayed.
    ///
    /// # Examples
    ///
    /// ```
    /// use treedupe::progress::Progress;
    ///
    /// let progress = Progress::new(true);
    /// assert_eq!(progress.bytes_read(), 0);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            bucketing: Mutex::new(None),
            classifying: Mutex::new(None),
            bytes_read: AtomicU64::new(0),
            quiet,
        }
    }

    /// Content bytes reported through [`ProgressCallback::on_item_completed`].
    #[must_use]
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read.load(Ordering::Relaxed)
    }

    fn bucketing_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn classifying_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} buckets {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn slot(&self, phase: &str) -> Option<&Mutex<Option<ProgressBar>>> {
        match phase {
            "bucketing" => Some(&self.bucketing),
            "classifying" => Some(&self.classifying),
            _ => None,
        }
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }

        let pb = match phase {
            "bucketing" => {
                let pb = self.multi.add(ProgressBar::new_spinner());
                pb.set_style(Self::bucketing_style());
                pb.set_message(format!("Reading lengths of {total} files"));
                pb.enable_steady_tick(Duration::from_millis(100));
                pb
            }
            _ => {
                let pb = self.multi.add(ProgressBar::new(total as u64));
                pb.set_style(Self::classifying_style());
                pb
            }
        };

        if let Some(slot) = self.slot(phase) {
            if let Ok(mut guard) = slot.lock() {
                *guard = Some(pb);
            }
        }
    }

    fn on_progress(&self, current: usize, label: &str) {
        if self.quiet {
            return;
        }

        if let Ok(guard) = self.classifying.lock() {
            if let Some(ref pb) = *guard {
                pb.set_position(current as u64);
                pb.set_message(format!(
                    "{} ({} read)",
                    label,
                    ByteSize::b(self.bytes_read())
                ));
            }
        }
    }

    fn on_item_completed(&self, bytes: u64) {
        self.bytes_read.fetch_add(bytes, Ordering::Relaxed);
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }

        if let Some(slot) = self.slot(phase) {
            if let Some(pb) = slot.lock().ok().and_then(|mut guard| guard.take()) {
                pb.finish_and_clear();
            }
        }
    }
}
