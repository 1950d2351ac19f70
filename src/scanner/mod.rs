//! Opening the files to classify.
//!
//! The scanner turns command-line paths into opened [`FileCandidate`]s.
//! Paths are expanded by the [`walker`] when recursion is enabled; paths
//! that cannot be opened are collected as skipped instead of aborting the
//! whole run, so the caller decides whether that is fatal.
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use treedupe::duplicates::find_duplicates;
//! use treedupe::scanner::{open_candidates, WalkerConfig};
//!
//! let config = WalkerConfig { recursive: true, ..Default::default() };
//! let mut opened = open_candidates(&[PathBuf::from(".")], &config, None)?;
//! for skipped in &opened.skipped {
//!     eprintln!("Warning: {}", skipped);
//! }
//! let groups = find_duplicates(&mut opened.candidates)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod walker;

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::source::ChunkSource;

pub use walker::Walker;

/// An opened file together with the path it was opened from.
///
/// The file handle stays open until the candidate is dropped.
#[derive(Debug)]
pub struct FileCandidate {
    /// Path as given on the command line or found by the walker
    pub path: PathBuf,
    file: File,
}

impl FileCandidate {
    /// Open `path` for reading.
    ///
    /// # Errors
    ///
    /// Returns a [`ScanError`] naming the path if it cannot be opened.
    pub fn open(path: &Path) -> Result<Self, ScanError> {
        let file = File::open(path).map_err(|e| ScanError::from_io(path.to_path_buf(), e))?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }
}

impl Read for FileCandidate {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl ChunkSource for FileCandidate {
    fn declared_len(&mut self) -> io::Result<u64> {
        self.file.declared_len()
    }
}

impl AsRef<Path> for FileCandidate {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

/// Configuration for path expansion.
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Expand directory arguments into the files below them.
    pub recursive: bool,

    /// Skip hidden files and directories (names starting with `.`).
    pub skip_hidden: bool,
}

/// Errors that can occur while expanding or opening paths.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// A directory was given without `--recursive`.
    #[error("Is a directory (use --recursive to scan it): {0}")]
    IsADirectory(PathBuf),

    /// An I/O error occurred while accessing a path.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Expansion was stopped by a shutdown request.
    #[error("Scan interrupted by user")]
    Interrupted,
}

impl ScanError {
    /// Classify an I/O error for `path`.
    #[must_use]
    pub fn from_io(path: PathBuf, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path),
            io::ErrorKind::NotFound => Self::NotFound(path),
            _ => Self::Io {
                path,
                source: error,
            },
        }
    }
}

/// Result of opening every requested path.
#[derive(Debug, Default)]
pub struct OpenedCandidates {
    /// Successfully opened files, in argument (then walk) order
    pub candidates: Vec<FileCandidate>,
    /// Paths that could not be expanded or opened
    pub skipped: Vec<ScanError>,
}

impl OpenedCandidates {
    /// Paths of the opened candidates, indexed like `candidates`.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.candidates.iter().map(|c| c.path.clone()).collect()
    }
}

/// Expand `paths` and open every resulting file.
///
/// A path listed more than once (literally) is opened only once. Without
/// [`WalkerConfig::recursive`], directory arguments are skipped with
/// [`ScanError::IsADirectory`].
///
/// # Errors
///
/// Returns [`ScanError::Interrupted`] if the shutdown flag was set during
/// expansion. All other failures land in [`OpenedCandidates::skipped`].
pub fn open_candidates(
    paths: &[PathBuf],
    config: &WalkerConfig,
    shutdown_flag: Option<Arc<AtomicBool>>,
) -> Result<OpenedCandidates, ScanError> {
    let mut walker = Walker::new(config.clone());
    if let Some(flag) = shutdown_flag {
        walker = walker.with_shutdown_flag(flag);
    }

    let mut opened = OpenedCandidates::default();
    let mut seen = HashSet::new();

    for path in paths {
        if config.recursive {
            for found in walker.walk(path) {
                match found {
                    Ok(file) => open_into(&mut opened, &mut seen, file),
                    Err(e) => opened.skipped.push(e),
                }
            }
        } else {
            match fs::metadata(path) {
                Ok(meta) if meta.is_dir() => {
                    opened.skipped.push(ScanError::IsADirectory(path.clone()));
                }
                Ok(_) => open_into(&mut opened, &mut seen, path.clone()),
                Err(e) => opened.skipped.push(ScanError::from_io(path.clone(), e)),
            }
        }

        if walker.is_shutdown_requested() {
            return Err(ScanError::Interrupted);
        }
    }

    for skipped in &opened.skipped {
        log::warn!("Skipping: {}", skipped);
    }
    log::info!(
        "Opened {} files ({} skipped)",
        opened.candidates.len(),
        opened.skipped.len()
    );

    Ok(opened)
}

fn open_into(opened: &mut OpenedCandidates, seen: &mut HashSet<PathBuf>, path: PathBuf) {
    if !seen.insert(path.clone()) {
        log::debug!("Ignoring repeated path: {}", path.display());
        return;
    }
    match FileCandidate::open(&path) {
        Ok(candidate) => opened.candidates.push(candidate),
        Err(e) => opened.skipped.push(e),
    }
}
