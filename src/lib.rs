//! # ffsnap
//!
//! Create high quality, frame accurate snapshots of video files.
//!
//! `ffsnap` decodes arbitrary, possibly non-sequential frame numbers from a
//! video file and writes each as an 8-bit RGB PNG, powered by FFmpeg via the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate. Random
//! access is driven by a [`SeekIndex`] that can be persisted between runs
//! and is revalidated against the input file before being trusted.
//!
//! ## Quick Start
//!
//! ```no_run
//! use ffsnap::{SeekIndex, SilentProgress, SnapshotWriter, VideoSource, extract_frames};
//!
//! // Build (or reuse) a seek index for the input file.
//! let (index, _built_fresh) =
//!     SeekIndex::acquire("input.mkv".as_ref(), None, &SilentProgress)?;
//!
//! // Bind a seekable decoder to the first video track; the index is no
//! // longer needed once the source holds its seek table.
//! let mut source = VideoSource::open("input.mkv", &index)?;
//! drop(index);
//!
//! // Fix the output format once, from the first decoded frame.
//! let spec = source.negotiate_format()?;
//! println!("emitting {}x{} RGB24 frames", spec.width, spec.height);
//!
//! // Extract frames 0, 120, and 240 as snapshot_<N><type>.png files.
//! let writer = SnapshotWriter::new("snapshot");
//! let summary = extract_frames(&mut source, &[0, 120, 240], &writer, |report| {
//!     println!("frame {} is type {}", report.frame_number, report.picture_type);
//! });
//! println!("{} written, {} skipped", summary.written.len(), summary.failed.len());
//! # Ok::<(), ffsnap::SnapError>(())
//! ```
//!
//! ## Pipeline
//!
//! 1. **Index** — [`SeekIndex::acquire`] loads a persisted index when it is
//!    valid for the input file, else scans the container's packets
//!    (reporting progress through [`IndexingProgress`]).
//! 2. **Open** — [`VideoSource::open`] binds a decoder to the first video
//!    track.
//! 3. **Negotiate** — [`VideoSource::negotiate_format`] probes frame 0 and
//!    fixes packed RGB24 at native resolution, with the BT.709 matrix for
//!    HD content.
//! 4. **Extract** — [`extract_frames`] decodes each requested frame and
//!    writes it through [`SnapshotWriter`]; one bad frame never aborts the
//!    batch.
//!
//! Decoding is destructive: a [`DecodedFrame`] borrows its [`VideoSource`]
//! and is invalidated by the next decode call — the borrow checker enforces
//! the copy-out-immediately discipline.
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod error;
pub mod extract;
pub mod frame;
pub mod index;
pub mod progress;
pub mod sink;
pub mod source;

pub use error::SnapError;
pub use extract::{ExtractionSummary, FrameReport, extract_frames};
pub use frame::{ColorSpace, DecodedFrame, PictureType, RasterImage};
pub use index::{IndexEntry, SeekIndex, SourceFingerprint};
pub use progress::{IndexingProgress, PercentTracker, SilentProgress};
pub use sink::SnapshotWriter;
pub use source::{ColorMatrix, OutputFormatSpec, VideoSource};
