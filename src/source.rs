//! Chunk sources and chunk sizing.
//!
//! # Overview
//!
//! A [`ChunkSource`] is a forward-only byte stream with a declared length.
//! The classification engine only ever calls [`read_chunk`] on it, always
//! from the current position, and never seeks, rewinds, or closes it.
//!
//! [`ChunkPolicy`] decides how many bytes are read at each tree depth. The
//! same policy is applied to every candidate of a tree, so two candidates
//! with identical content always read identical chunk boundaries.
//!
//! # Example
//!
//! ```
//! use std::io::Cursor;
//! use treedupe::source::{read_chunk, ChunkPolicy};
//!
//! let mut source = Cursor::new(b"hello world".to_vec());
//! let policy = ChunkPolicy::fixed(8).unwrap();
//!
//! let first = read_chunk(&mut source, policy.chunk_len(0)).unwrap();
//! assert_eq!(first.as_deref(), Some(&b"hello wo"[..]));
//!
//! let second = read_chunk(&mut source, policy.chunk_len(1)).unwrap();
//! assert_eq!(second.as_deref(), Some(&b"rld"[..]));
//!
//! // End of input with nothing left
//! assert!(read_chunk(&mut source, policy.chunk_len(2)).unwrap().is_none());
//! ```

use std::fs::File;
use std::io::{self, Cursor, ErrorKind, Read};

use serde::{Deserialize, Serialize};

/// Default chunk size in bytes.
pub const DEFAULT_CHUNK_SIZE: usize = 256;

/// Default upper bound for accelerating chunk sizes (1 MiB).
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 1024 * 1024;

/// Default growth factor for accelerating chunk sizes.
pub const DEFAULT_GROWTH_FACTOR: usize = 2;

/// Initial buffer size for a single chunk read; larger chunks grow from here.
const READ_BUFFER_STEP: usize = 64 * 1024;

/// A readable, forward-only byte stream with a declared length.
///
/// The declared length is what the size bucketer keys on. For files it is
/// the length reported by the filesystem, not the number of bytes that a
/// full read would produce.
pub trait ChunkSource: Read {
    /// Declared length of the content in bytes.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the length cannot be determined.
    fn declared_len(&mut self) -> io::Result<u64>;
}

impl ChunkSource for File {
    fn declared_len(&mut self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }
}

impl<T: AsRef<[u8]>> ChunkSource for Cursor<T> {
    fn declared_len(&mut self) -> io::Result<u64> {
        Ok(self.get_ref().as_ref().len() as u64)
    }
}

impl<S: ChunkSource + ?Sized> ChunkSource for &mut S {
    fn declared_len(&mut self) -> io::Result<u64> {
        (**self).declared_len()
    }
}

impl<S: ChunkSource + ?Sized> ChunkSource for Box<S> {
    fn declared_len(&mut self) -> io::Result<u64> {
        (**self).declared_len()
    }
}

/// Read the next chunk of at most `len` bytes from `source`.
///
/// Short reads are not end-of-input: the buffer is refilled until either
/// `len` bytes are available or the source reports end-of-input by
/// returning zero. `ErrorKind::Interrupted` is retried.
///
/// # Returns
///
/// - `Ok(None)` if the source was already at end-of-input
/// - `Ok(Some(bytes))` with `1..=len` bytes otherwise; fewer than `len`
///   bytes only when end-of-input was reached inside this chunk
///
/// # Errors
///
/// Any I/O error other than `Interrupted` is returned unchanged.
pub fn read_chunk<R: Read + ?Sized>(source: &mut R, len: usize) -> io::Result<Option<Box<[u8]>>> {
    // `len` may far exceed what the source holds; grow with the data.
    let mut buf = vec![0u8; len.min(READ_BUFFER_STEP)];
    let mut filled = 0;

    while filled < len {
        if filled == buf.len() {
            let grown = buf.len().saturating_mul(2).min(len);
            buf.resize(grown, 0);
        }
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    if filled == 0 {
        return Ok(None);
    }

    buf.truncate(filled);
    Ok(Some(buf.into_boxed_slice()))
}

/// Errors for invalid chunk sizing parameters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    /// A chunk size of zero would never make progress.
    #[error("Chunk size must be at least 1 byte")]
    ZeroChunkSize,

    /// The growth factor must be at least 1.
    #[error("Chunk growth factor must be at least 1")]
    ZeroGrowthFactor,

    /// The maximum chunk size is smaller than the initial size.
    #[error("Maximum chunk size {max} is smaller than initial chunk size {initial}")]
    MaxBelowInitial {
        /// Initial chunk size
        initial: usize,
        /// Maximum chunk size
        max: usize,
    },
}

/// How many bytes to read at each depth of a discrimination tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "lowercase")]
pub enum ChunkPolicy {
    /// The same chunk size at every depth.
    Fixed {
        /// Chunk size in bytes
        size: usize,
    },
    /// Chunk size multiplied by `factor` at every depth, capped at `max`.
    Accelerating {
        /// Chunk size at depth 0
        initial: usize,
        /// Multiplier applied per depth
        factor: usize,
        /// Upper bound for any single chunk
        max: usize,
    },
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        Self::Fixed {
            size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ChunkPolicy {
    /// Constant chunk size at every depth.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::ZeroChunkSize`] if `size` is zero.
    pub fn fixed(size: usize) -> Result<Self, PolicyError> {
        if size == 0 {
            return Err(PolicyError::ZeroChunkSize);
        }
        Ok(Self::Fixed { size })
    }

    /// Multiplicatively growing chunk size.
    ///
    /// # Errors
    ///
    /// Returns a [`PolicyError`] if any size is zero, the factor is zero,
    /// or `max < initial`.
    pub fn accelerating(initial: usize, factor: usize, max: usize) -> Result<Self, PolicyError> {
        if initial == 0 || max == 0 {
            return Err(PolicyError::ZeroChunkSize);
        }
        if factor == 0 {
            return Err(PolicyError::ZeroGrowthFactor);
        }
        if max < initial {
            return Err(PolicyError::MaxBelowInitial { initial, max });
        }
        Ok(Self::Accelerating {
            initial,
            factor,
            max,
        })
    }

    /// Chunk length in bytes for the read performed at `depth`.
    ///
    /// Always at least 1, even for a hand-built policy with zero fields.
    #[must_use]
    pub fn chunk_len(&self, depth: usize) -> usize {
        let len = match *self {
            Self::Fixed { size } => size,
            Self::Accelerating {
                initial,
                factor,
                max,
            } => {
                let exp = u32::try_from(depth).unwrap_or(u32::MAX);
                factor
                    .checked_pow(exp)
                    .and_then(|scale| initial.checked_mul(scale))
                    .map_or(max, |len| len.min(max))
            }
        };
        len.max(1)
    }
}
