//! Seek index construction, persistence, and validation.
//!
//! Frame-accurate extraction needs random access into a compressed stream,
//! which means knowing where every display frame sits and which frames are
//! seekable keyframes. [`SeekIndex`] records exactly that: one
//! [`IndexEntry`] per display frame of the first video track, sorted by
//! presentation timestamp, plus a [`SourceFingerprint`] tying the index to
//! the file it was built from.
//!
//! An index can be persisted between runs. A loaded index is trusted only
//! after [`SeekIndex::validate_for`] confirms it belongs to the input file;
//! any load or validation failure falls back to a fresh build.
//!
//! # Example
//!
//! ```no_run
//! use ffsnap::{SeekIndex, SilentProgress};
//!
//! let (index, built_fresh) =
//!     SeekIndex::acquire("input.mkv".as_ref(), None, &SilentProgress)?;
//! println!("{} frames, freshly built: {built_fresh}", index.frame_count());
//! # Ok::<(), ffsnap::SnapError>(())
//! ```

use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
    time::UNIX_EPOCH,
};

use ffmpeg_next::{Error as FfmpegError, Packet, media::Type};
use serde::{Deserialize, Serialize};

use crate::{
    error::SnapError,
    progress::{IndexingProgress, PercentTracker},
};

/// Bumped whenever the on-disk layout changes; older files are rebuilt.
const INDEX_FORMAT_VERSION: u32 = 1;

/// Identity of the source file an index was built from.
///
/// An index belongs to exactly one source file. Size and modification time
/// together catch both replaced and re-encoded files without hashing the
/// content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFingerprint {
    /// File size in bytes at index time.
    pub file_size: u64,
    /// Modification time as seconds since the Unix epoch, when available.
    pub modified_secs: Option<u64>,
}

impl SourceFingerprint {
    /// Fingerprint the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SnapError::Io`] if the file's metadata cannot be read.
    pub fn of(path: &Path) -> Result<Self, SnapError> {
        let metadata = std::fs::metadata(path)?;
        let modified_secs = metadata
            .modified()
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .map(|elapsed| elapsed.as_secs());

        Ok(Self {
            file_size: metadata.len(),
            modified_secs,
        })
    }
}

/// One display frame of the indexed video track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Presentation timestamp in the stream's time base.
    pub pts: i64,
    /// Whether this frame is a seekable keyframe.
    pub keyframe: bool,
}

/// A seek table for the first video track of a container file.
///
/// Built by scanning packets (no decoding), or loaded from a previously
/// persisted file. Entries are sorted by presentation timestamp, so the
/// entry at position `n` describes display frame `n`.
///
/// The index is only needed until a [`VideoSource`](crate::VideoSource) is
/// constructed from it — the source copies the seek table it needs, and the
/// index should be dropped (after optionally persisting it).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeekIndex {
    version: u32,
    fingerprint: SourceFingerprint,
    video_stream_index: Option<usize>,
    entries: Vec<IndexEntry>,
}

impl SeekIndex {
    /// Load a persisted index if it is valid for `input`, else build fresh.
    ///
    /// When `index_path` is given, the file is read and validated against
    /// `input`; a load or validation failure is logged and the index is
    /// rebuilt from scratch. Returns the index and whether it was freshly
    /// built (a freshly built index is the caller's cue to persist it).
    ///
    /// # Errors
    ///
    /// Returns [`SnapError::IndexBuild`] if a rebuild was needed and failed.
    /// Load and mismatch failures are recoverable and never surface here.
    pub fn acquire(
        input: &Path,
        index_path: Option<&Path>,
        progress: &dyn IndexingProgress,
    ) -> Result<(Self, bool), SnapError> {
        if let Some(path) = index_path {
            log::debug!("attempting to read seek index from {}", path.display());
            match Self::read_from(path) {
                Ok(index) => match index.validate_for(input) {
                    Ok(()) => {
                        log::debug!("reusing seek index from {}", path.display());
                        return Ok((index, false));
                    }
                    Err(error) => log::warn!("{error}; rebuilding index"),
                },
                Err(error) => log::warn!("{error}; rebuilding index"),
            }
        }

        log::debug!("creating new seek index for {}", input.display());
        let index = Self::build(input, progress)?;
        Ok((index, true))
    }

    /// Build a fresh index by scanning the packets of the first video track.
    ///
    /// Packets are read without decoding, so indexing runs at demux speed.
    /// Progress is reported through `progress` as monotone integer
    /// percentages ending in a guaranteed 100.
    ///
    /// A container without a video track indexes successfully with an empty
    /// seek table; the missing track is diagnosed later by
    /// [`VideoSource::open`](crate::VideoSource::open).
    ///
    /// # Errors
    ///
    /// Returns [`SnapError::IndexBuild`] if the container cannot be opened
    /// or a packet-level read error occurs. Build failures are fatal to the
    /// run — there is no partial index.
    pub fn build(input: &Path, progress: &dyn IndexingProgress) -> Result<Self, SnapError> {
        let build_error = |reason: String| SnapError::IndexBuild {
            path: input.to_path_buf(),
            reason,
        };

        ffmpeg_next::init()
            .map_err(|error| build_error(format!("FFmpeg initialisation failed: {error}")))?;

        let fingerprint = SourceFingerprint::of(input)
            .map_err(|error| build_error(error.to_string()))?;

        let mut input_context = ffmpeg_next::format::input(&input)
            .map_err(|error| build_error(error.to_string()))?;

        let mut tracker = PercentTracker::new(progress);

        // First video track, matching what the source opener will pick.
        let Some((stream_index, duration_in_time_base)) = input_context
            .streams()
            .find(|stream| stream.parameters().medium() == Type::Video)
            .map(|stream| {
                let time_base = stream.time_base();
                let stream_duration = stream.duration();
                // Fall back to the container duration (AV_TIME_BASE units)
                // rescaled into the stream time base.
                let duration = if stream_duration > 0 {
                    stream_duration as f64
                } else {
                    let container_duration = input_context.duration();
                    if container_duration > 0 && time_base.numerator() > 0 {
                        container_duration as f64 * time_base.denominator() as f64
                            / (time_base.numerator() as f64 * 1_000_000.0)
                    } else {
                        0.0
                    }
                };
                (stream.index(), duration)
            })
        else {
            tracker.finish();
            return Ok(Self {
                version: INDEX_FORMAT_VERSION,
                fingerprint,
                video_stream_index: None,
                entries: Vec::new(),
            });
        };

        let mut entries: Vec<IndexEntry> = Vec::new();
        let mut baseline_timestamp: Option<i64> = None;

        let mut packet = Packet::empty();
        loop {
            match packet.read(&mut input_context) {
                Ok(()) => {
                    if packet.stream() != stream_index {
                        continue;
                    }
                    // Some demuxers leave pts unset on reordered packets.
                    let Some(timestamp) = packet.pts().or_else(|| packet.dts()) else {
                        continue;
                    };

                    entries.push(IndexEntry {
                        pts: timestamp,
                        keyframe: packet.is_key(),
                    });

                    if duration_in_time_base > 0.0 {
                        let baseline = *baseline_timestamp.get_or_insert(timestamp);
                        let percent = (timestamp - baseline) as f64 * 100.0
                            / duration_in_time_base;
                        tracker.update(percent as u8);
                    }
                }
                Err(FfmpegError::Eof) => break,
                Err(error) => return Err(build_error(error.to_string())),
            }
        }

        // Packets arrive in decode order; presentation order is what frame
        // numbers mean.
        entries.sort_by_key(|entry| entry.pts);
        entries.dedup_by_key(|entry| entry.pts);

        tracker.finish();

        Ok(Self {
            version: INDEX_FORMAT_VERSION,
            fingerprint,
            video_stream_index: Some(stream_index),
            entries,
        })
    }

    /// Read a persisted index from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SnapError::IndexLoad`] if the file is unreadable, corrupt,
    /// or written by an incompatible version of this crate. This is
    /// recoverable — callers fall back to [`build`](SeekIndex::build).
    pub fn read_from(path: &Path) -> Result<Self, SnapError> {
        let load_error = |reason: String| SnapError::IndexLoad {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::open(path).map_err(|error| load_error(error.to_string()))?;
        let index: Self = serde_json::from_reader(BufReader::new(file))
            .map_err(|error| load_error(error.to_string()))?;

        if index.version != INDEX_FORMAT_VERSION {
            return Err(load_error(format!(
                "unsupported index format version {} (expected {INDEX_FORMAT_VERSION})",
                index.version
            )));
        }

        Ok(index)
    }

    /// Persist the index to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SnapError::IndexPersist`]. This is recoverable — the
    /// in-memory index stays usable for the rest of the session.
    pub fn write_to(&self, path: &Path) -> Result<(), SnapError> {
        let persist_error = |reason: String| SnapError::IndexPersist {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::create(path).map_err(|error| persist_error(error.to_string()))?;
        serde_json::to_writer(BufWriter::new(file), self)
            .map_err(|error| persist_error(error.to_string()))
    }

    /// Check that this index belongs to the file at `input`.
    ///
    /// # Errors
    ///
    /// Returns [`SnapError::IndexMismatch`] when the fingerprint differs,
    /// or [`SnapError::Io`] if `input`'s metadata cannot be read. Both are
    /// recoverable — callers fall back to rebuilding.
    pub fn validate_for(&self, input: &Path) -> Result<(), SnapError> {
        let current = SourceFingerprint::of(input)?;
        if current == self.fingerprint {
            Ok(())
        } else {
            Err(SnapError::IndexMismatch {
                input: input.to_path_buf(),
            })
        }
    }

    /// Number of display frames in the indexed video track.
    pub fn frame_count(&self) -> usize {
        self.entries.len()
    }

    /// The container stream index the seek table covers, if the file had a
    /// video track at index time.
    pub fn video_stream_index(&self) -> Option<usize> {
        self.video_stream_index
    }

    /// The seek table, sorted by presentation timestamp.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }
}
