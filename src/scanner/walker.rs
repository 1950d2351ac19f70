//! Directory expansion using walkdir.
//!
//! # Features
//!
//! - Deterministic order (entries sorted by file name)
//! - Symbolic links are never followed below the root
//! - Optional skipping of hidden entries
//! - Graceful shutdown via atomic flag

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use walkdir::{DirEntry, WalkDir};

use super::{ScanError, WalkerConfig};

/// Directory walker that yields regular file paths.
#[derive(Debug, Clone)]
pub struct Walker {
    config: WalkerConfig,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Walker {
    /// Create a new walker.
    #[must_use]
    pub fn new(config: WalkerConfig) -> Self {
        Self {
            config,
            shutdown_flag: None,
        }
    }

    /// Set the shutdown flag for graceful termination.
    ///
    /// When the flag is set the walk stops yielding entries.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Check if shutdown has been requested.
    pub(crate) fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Walk `root` and yield every regular file below it.
    ///
    /// A root that is itself a file is yielded as is. Unreadable directories
    /// are reported as errors and the walk continues.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use treedupe::scanner::{Walker, WalkerConfig};
    /// use std::path::Path;
    ///
    /// let walker = Walker::new(WalkerConfig::default());
    /// let files: Vec<_> = walker.walk(Path::new(".")).filter_map(Result::ok).collect();
    /// println!("Found {} files", files.len());
    /// ```
    pub fn walk<'a>(&'a self, root: &'a Path) -> impl Iterator<Item = Result<PathBuf, ScanError>> + 'a {
        let skip_hidden = self.config.skip_hidden;

        WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| !(skip_hidden && entry.depth() > 0 && is_hidden(entry)))
            .take_while(move |_| {
                if self.is_shutdown_requested() {
                    log::debug!("Walker: Shutdown requested, stopping iteration");
                    false
                } else {
                    true
                }
            })
            .filter_map(move |entry| match entry {
                Ok(entry) => {
                    let file_type = entry.file_type();
                    if file_type.is_file() {
                        Some(Ok(entry.into_path()))
                    } else {
                        if file_type.is_symlink() {
                            log::trace!("Skipping symlink: {}", entry.path().display());
                        }
                        None
                    }
                }
                Err(e) => Some(Err(walk_error(root, e))),
            })
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

fn walk_error(root: &Path, error: walkdir::Error) -> ScanError {
    let path = error.path().unwrap_or(root).to_path_buf();
    log::warn!("Walker error for {}: {}", path.display(), error);

    let message = error.to_string();
    match error.into_io_error() {
        Some(source) => ScanError::from_io(path, source),
        None => ScanError::Io {
            path,
            source: io::Error::other(message),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::TempDir;

    fn create_test_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();

        fs::create_dir(root.join("sub")).unwrap();
        fs::create_dir(root.join(".hidden_dir")).unwrap();

        for (name, content) in [
            ("b.txt", "bbb"),
            ("a.txt", "aaa"),
            ("sub/c.txt", "ccc"),
            (".hidden", "hhh"),
            (".hidden_dir/d.txt", "ddd"),
            ("empty.txt", ""),
        ] {
            let mut f = File::create(root.join(name)).unwrap();
            f.write_all(content.as_bytes()).unwrap();
        }

        dir
    }

    fn relative(dir: &TempDir, paths: Vec<PathBuf>) -> Vec<String> {
        paths
            .into_iter()
            .map(|p| {
                p.strip_prefix(dir.path())
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn test_walker_finds_files_sorted() {
        let dir = create_test_dir();
        let walker = Walker::new(WalkerConfig::default());
        let files: Vec<_> = walker.walk(dir.path()).map(Result::unwrap).collect();

        assert_eq!(
            relative(&dir, files),
            vec![
                ".hidden",
                ".hidden_dir/d.txt",
                "a.txt",
                "b.txt",
                "empty.txt",
                "sub/c.txt"
            ]
        );
    }

    #[test]
    fn test_walker_skip_hidden() {
        let dir = create_test_dir();
        let walker = Walker::new(WalkerConfig {
            skip_hidden: true,
            ..WalkerConfig::default()
        });
        let files: Vec<_> = walker.walk(dir.path()).map(Result::unwrap).collect();

        assert_eq!(
            relative(&dir, files),
            vec!["a.txt", "b.txt", "empty.txt", "sub/c.txt"]
        );
    }

    #[test]
    fn test_walker_file_root() {
        let dir = create_test_dir();
        let file = dir.path().join("a.txt");
        let walker = Walker::new(WalkerConfig::default());
        let files: Vec<_> = walker.walk(&file).map(Result::unwrap).collect();
        assert_eq!(files, vec![file]);
    }

    #[cfg(unix)]
    #[test]
    fn test_walker_does_not_follow_symlinks() {
        let dir = create_test_dir();
        std::os::unix::fs::symlink(dir.path().join("a.txt"), dir.path().join("link.txt"))
            .unwrap();
        std::os::unix::fs::symlink(dir.path().join("sub"), dir.path().join("linkdir")).unwrap();

        let walker = Walker::new(WalkerConfig {
            skip_hidden: true,
            ..WalkerConfig::default()
        });
        let files: Vec<_> = walker.walk(dir.path()).map(Result::unwrap).collect();
        assert_eq!(
            relative(&dir, files),
            vec!["a.txt", "b.txt", "empty.txt", "sub/c.txt"]
        );
    }

    #[test]
    fn test_walker_shutdown_flag() {
        let dir = create_test_dir();
        let shutdown = Arc::new(AtomicBool::new(true));
        let walker = Walker::new(WalkerConfig::default()).with_shutdown_flag(shutdown);

        assert_eq!(walker.walk(dir.path()).count(), 0);
        assert!(walker.is_shutdown_requested());
    }

    #[test]
    fn test_walker_handles_nonexistent_path() {
        let walker = Walker::new(WalkerConfig::default());
        let results: Vec<_> = walker.walk(Path::new("/nonexistent/path/12345")).collect();

        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(ScanError::NotFound(_))));
    }
}
