//! Batch frame extraction with per-frame error isolation.
//!
//! [`extract_frames`] drives the whole per-frame loop: decode each requested
//! frame number, copy the pixels into a [`RasterImage`](crate::RasterImage),
//! and hand it to the [`SnapshotWriter`]. Requests are consumed strictly in
//! the order given by the caller — no reordering, no deduplication, no
//! caching of previously decoded frames (decoding is destructive, see
//! [`VideoSource::frame`](crate::VideoSource::frame)).
//!
//! One bad frame never aborts the batch: a decode or write failure is
//! logged, recorded in the [`ExtractionSummary`], and extraction continues
//! with the next request.

use std::path::PathBuf;

use crate::{
    error::SnapError,
    frame::{ColorSpace, PictureType},
    sink::SnapshotWriter,
    source::VideoSource,
};

/// What a decoded frame looked like.
///
/// Passed to the `on_decoded` callback of [`extract_frames`] as soon as a
/// frame is ready — before the snapshot is written — so callers can report
/// picture type and colorspace per frame.
#[derive(Debug, Clone)]
pub struct FrameReport {
    /// The requested frame number.
    pub frame_number: usize,
    /// Codec-level classification of the decoded frame.
    pub picture_type: PictureType,
    /// The colorspace the frame declared.
    pub color_space: ColorSpace,
    /// Width of the frame as stored in the stream.
    pub encoded_width: u32,
    /// Height of the frame as stored in the stream.
    pub encoded_height: u32,
    /// Where the snapshot will be written.
    pub path: PathBuf,
}

/// Outcome of a batch extraction.
#[derive(Debug, Default)]
pub struct ExtractionSummary {
    /// Paths of successfully written snapshots, in request order.
    pub written: Vec<PathBuf>,
    /// Requests that failed, with the per-frame error, in request order.
    pub failed: Vec<(usize, SnapError)>,
}

impl ExtractionSummary {
    /// Total number of requests this summary accounts for.
    pub fn requested(&self) -> usize {
        self.written.len() + self.failed.len()
    }
}

/// Extract every requested frame, skipping (not aborting on) failures.
///
/// `on_decoded` fires once per successfully decoded frame, before its
/// snapshot is written. Decode and write failures are logged via
/// [`log::error!`] and collected in the returned summary; they never
/// short-circuit the loop.
pub fn extract_frames<F>(
    source: &mut VideoSource,
    frame_numbers: &[usize],
    sink: &SnapshotWriter,
    mut on_decoded: F,
) -> ExtractionSummary
where
    F: FnMut(&FrameReport),
{
    let mut summary = ExtractionSummary::default();

    for &frame_number in frame_numbers {
        // Decode, then immediately copy the pixels out: the decoded view
        // dies with the next decode call.
        let (raster, picture_type) = match source.frame(frame_number) {
            Ok(frame) => {
                on_decoded(&FrameReport {
                    frame_number,
                    picture_type: frame.picture_type,
                    color_space: frame.color_space,
                    encoded_width: frame.encoded_width,
                    encoded_height: frame.encoded_height,
                    path: sink.target_path(frame_number, frame.picture_type),
                });
                (frame.to_raster(), frame.picture_type)
            }
            Err(error) => {
                log::error!("skipping frame {frame_number}: {error}");
                summary.failed.push((frame_number, error));
                continue;
            }
        };

        match sink.write(&raster, frame_number, picture_type) {
            Ok(path) => summary.written.push(path),
            Err(error) => {
                log::error!("skipping frame {frame_number}: {error}");
                summary.failed.push((frame_number, error));
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::ExtractionSummary;
    use crate::error::SnapError;

    #[test]
    fn summary_accounts_for_all_requests() {
        let mut summary = ExtractionSummary::default();
        summary.written.push("shot_0I.png".into());
        summary.written.push("shot_1P.png".into());
        summary.failed.push((
            99,
            SnapError::FrameDecode {
                frame_number: 99,
                reason: "frame is out of range".to_string(),
            },
        ));

        assert_eq!(summary.requested(), 3);
        assert_eq!(summary.written.len(), 2);
        assert_eq!(summary.failed.len(), 1);
    }
}
