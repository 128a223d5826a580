//! Error types for the `ffsnap` crate.
//!
//! This module defines [`SnapError`], the unified error type returned by all
//! fallible operations in the crate. Variants carry enough context to diagnose
//! a problem without additional logging at the call site, and always include
//! the underlying decoder diagnostic text where one is available.
//!
//! The error taxonomy mirrors how the extraction pipeline treats failures:
//!
//! - **Fatal** — [`IndexBuild`](SnapError::IndexBuild),
//!   [`NoVideoTrack`](SnapError::NoVideoTrack),
//!   [`SourceOpen`](SnapError::SourceOpen), and
//!   [`FormatNegotiation`](SnapError::FormatNegotiation) abort the whole run.
//! - **Recoverable** — [`IndexLoad`](SnapError::IndexLoad) and
//!   [`IndexMismatch`](SnapError::IndexMismatch) fall back to rebuilding the
//!   index; [`IndexPersist`](SnapError::IndexPersist) continues with the
//!   in-memory index.
//! - **Per-frame** — [`FrameDecode`](SnapError::FrameDecode) and
//!   [`Write`](SnapError::Write) skip the affected frame and continue with
//!   the rest of the batch.

use std::{io::Error as IoError, path::PathBuf};

use thiserror::Error;

/// The unified error type for all `ffsnap` operations.
///
/// Every public method that can fail returns `Result<T, SnapError>`. Each
/// error owns its message string; there is no shared mutable error state
/// between calls.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SnapError {
    /// A persisted seek index could not be read or parsed.
    #[error("Failed to read seek index {path}: {reason}")]
    IndexLoad {
        /// Path of the index file that was passed on the command line.
        path: PathBuf,
        /// Underlying reason the load failed.
        reason: String,
    },

    /// A loaded seek index does not belong to the input file.
    #[error("Seek index does not belong to {input} (file size or modification time changed)")]
    IndexMismatch {
        /// The input file the index was validated against.
        input: PathBuf,
    },

    /// Building a fresh seek index failed.
    #[error("Failed to index {path}: {reason}")]
    IndexBuild {
        /// The input file that was being indexed.
        path: PathBuf,
        /// Underlying demuxer diagnostic.
        reason: String,
    },

    /// A freshly built seek index could not be written to disk.
    #[error("Failed to write seek index {path}: {reason}")]
    IndexPersist {
        /// Destination path of the index file.
        path: PathBuf,
        /// Underlying reason the write failed.
        reason: String,
    },

    /// The container has no video track.
    #[error("No video track found in file")]
    NoVideoTrack,

    /// The video source could not be opened or its decoder constructed.
    #[error("Failed to open video source {path}: {reason}")]
    SourceOpen {
        /// Path that was passed to [`crate::VideoSource::open`].
        path: PathBuf,
        /// Underlying decoder diagnostic.
        reason: String,
    },

    /// The decoder rejected the requested output format for this stream.
    #[error("Failed to negotiate output format: {0}")]
    FormatNegotiation(String),

    /// A single frame could not be decoded. The batch continues with the
    /// next requested frame.
    #[error("Failed to decode frame {frame_number}: {reason}")]
    FrameDecode {
        /// The frame number that was requested.
        frame_number: usize,
        /// Underlying decoder diagnostic.
        reason: String,
    },

    /// A snapshot image could not be written. The batch continues with the
    /// next requested frame.
    #[error("Failed to write {path}: {reason}")]
    Write {
        /// Destination path of the snapshot.
        path: PathBuf,
        /// Underlying encoder or filesystem diagnostic.
        reason: String,
    },

    /// An I/O error outside any of the contexts above.
    #[error("I/O error: {0}")]
    Io(#[from] IoError),
}
