//! The seekable video source: opening, format negotiation, frame decoding.
//!
//! [`VideoSource`] binds one (input file, video track, seek table) triple.
//! It owns the demuxer and decoder for the whole session and is released on
//! every exit path by drop semantics — including early returns on fatal
//! errors, with no cleanup code at the return sites.
//!
//! The extraction lifecycle on a source is strictly ordered:
//!
//! 1. [`VideoSource::open`] — locate the first video track and construct a
//!    seekable decoder bound to it.
//! 2. [`VideoSource::negotiate_format`] — decode frame 0 once to learn the
//!    native geometry, then fix the session's [`OutputFormatSpec`].
//! 3. [`VideoSource::frame`] — decode arbitrary frame numbers, in any
//!    order, under the negotiated format.
//!
//! Decode calls are destructive: each call reuses the same internal frame
//! buffers, invalidating the previous frame's data. The returned
//! [`DecodedFrame`] borrows the source mutably, so the compiler rejects a
//! second decode while one is held — copy the pixels out with
//! [`DecodedFrame::to_raster`](crate::DecodedFrame::to_raster) first.

use std::{
    ffi::c_int,
    path::{Path, PathBuf},
};

use ffmpeg_next::{
    Error as FfmpegError, Packet,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};
use ffmpeg_sys_next::{
    AVSEEK_FLAG_BACKWARD, SWS_CS_ITU601, SWS_CS_ITU709, av_seek_frame, sws_getCoefficients,
    sws_setColorspaceDetails,
};

use crate::{
    error::SnapError,
    frame::{ColorSpace, DecodedFrame, PictureType},
    index::{IndexEntry, SeekIndex},
};

/// The YUV→RGB matrix fixed at format negotiation.
///
/// High-definition content uses BT.709; standard-definition content keeps
/// the BT.601 family. The choice is part of the negotiated output format,
/// not a runtime switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMatrix {
    /// ITU-R BT.601 (standard definition).
    Bt601,
    /// ITU-R BT.709 (high definition).
    Bt709,
}

impl ColorMatrix {
    fn sws_colorspace(self) -> c_int {
        match self {
            ColorMatrix::Bt601 => SWS_CS_ITU601 as c_int,
            ColorMatrix::Bt709 => SWS_CS_ITU709 as c_int,
        }
    }
}

/// The output format fixed once per session by
/// [`VideoSource::negotiate_format`].
///
/// The pixel layout is always packed RGB24 and the resizer is always
/// bicubic (used only when the scaler must resample internally, e.g. for
/// chroma upsampling — there is no user-requested resizing). Width and
/// height come from the probe frame, so frames are emitted at native
/// resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFormatSpec {
    /// Output width in pixels (the probe frame's encoded width).
    pub width: u32,
    /// Output height in pixels (the probe frame's encoded height).
    pub height: u32,
    /// The YUV→RGB matrix applied during conversion.
    pub color_matrix: ColorMatrix,
}

impl OutputFormatSpec {
    /// Every session converts to packed 8-bit RGB.
    pub const PIXEL: Pixel = Pixel::RGB24;
    /// Resampling algorithm for internal chroma scaling.
    pub const RESIZER: ScalingFlags = ScalingFlags::BICUBIC;
}

/// Scaler state created by format negotiation, immutable thereafter.
struct Negotiated {
    scaler: ScalingContext,
    spec: OutputFormatSpec,
    source_pixel_format: Pixel,
}

/// A seekable decoding handle for one video track.
///
/// Constructed from a [`SeekIndex`]; the source copies the seek table it
/// needs, so the index can (and should) be dropped right after
/// construction.
pub struct VideoSource {
    input: Input,
    decoder: VideoDecoder,
    stream_index: usize,
    entries: Vec<IndexEntry>,
    path: PathBuf,
    decoded: VideoFrame,
    converted: VideoFrame,
    negotiated: Option<Negotiated>,
    /// Display frame number of the most recently decoded frame.
    position: Option<usize>,
    eof_sent: bool,
}

impl VideoSource {
    /// Open `path` and bind a decoder to its first video track.
    ///
    /// The first track of type video is used — not the "best" one — so the
    /// track choice matches the one the index was built from.
    ///
    /// # Errors
    ///
    /// - [`SnapError::NoVideoTrack`] if the container has no video track.
    /// - [`SnapError::SourceOpen`] on any decoder-level failure, or when
    ///   the index does not cover the located track.
    ///
    /// Both are fatal to the run.
    pub fn open(path: impl AsRef<Path>, index: &SeekIndex) -> Result<Self, SnapError> {
        let path = path.as_ref().to_path_buf();
        let open_error = |reason: String| SnapError::SourceOpen {
            path: path.clone(),
            reason,
        };

        ffmpeg_next::init()
            .map_err(|error| open_error(format!("FFmpeg initialisation failed: {error}")))?;

        let input = ffmpeg_next::format::input(&path)
            .map_err(|error| open_error(error.to_string()))?;

        let (stream_index, decoder) = {
            let stream = input
                .streams()
                .find(|stream| stream.parameters().medium() == Type::Video)
                .ok_or(SnapError::NoVideoTrack)?;
            let stream_index = stream.index();

            let decoder_context = CodecContext::from_parameters(stream.parameters())
                .map_err(|error| {
                    open_error(format!("failed to read video codec parameters: {error}"))
                })?;
            let decoder = decoder_context
                .decoder()
                .video()
                .map_err(|error| open_error(format!("failed to create video decoder: {error}")))?;

            (stream_index, decoder)
        };

        match index.video_stream_index() {
            Some(indexed) if indexed == stream_index => {}
            Some(indexed) => {
                return Err(open_error(format!(
                    "seek index covers stream {indexed} but the first video track is stream {stream_index}"
                )));
            }
            None => {
                return Err(open_error(
                    "seek index was built from a file without a video track".to_string(),
                ));
            }
        }

        let entries = index.entries().to_vec();
        if entries.is_empty() {
            return Err(open_error(
                "seek index contains no frames for the video track".to_string(),
            ));
        }

        log::debug!(
            "opened {} (stream {stream_index}, {} indexed frames)",
            path.display(),
            entries.len()
        );

        Ok(Self {
            input,
            decoder,
            stream_index,
            entries,
            path,
            decoded: VideoFrame::empty(),
            converted: VideoFrame::empty(),
            negotiated: None,
            position: None,
            eof_sent: false,
        })
    }

    /// Fix the session's output format from a probe decode of frame 0.
    ///
    /// Resolution and colorspace are per-frame properties, not global for
    /// the video, so the probe decode is mandatory before any format can be
    /// fixed. The output is packed RGB24 at the probe frame's native
    /// resolution; HD content (height above 576 lines) converts through the
    /// BT.709 matrix rather than the legacy default.
    ///
    /// Idempotent: once negotiated, the same spec is returned without
    /// re-probing.
    ///
    /// # Errors
    ///
    /// Returns [`SnapError::FormatNegotiation`] (fatal) if the probe frame
    /// cannot be decoded or the converter rejects the requested format.
    pub fn negotiate_format(&mut self) -> Result<OutputFormatSpec, SnapError> {
        if let Some(negotiated) = &self.negotiated {
            return Ok(negotiated.spec);
        }

        self.decode_frame(0).map_err(|error| {
            SnapError::FormatNegotiation(format!("probe decode of frame 0 failed: {error}"))
        })?;

        let width = self.decoded.width();
        let height = self.decoded.height();
        let source_pixel_format = self.decoded.format();
        log::debug!("probe frame: {width}x{height}, pixel format {source_pixel_format:?}");

        let color_matrix = if height > 576 {
            ColorMatrix::Bt709
        } else {
            ColorMatrix::Bt601
        };

        let mut scaler = ScalingContext::get(
            source_pixel_format,
            width,
            height,
            OutputFormatSpec::PIXEL,
            width,
            height,
            OutputFormatSpec::RESIZER,
        )
        .map_err(|error| SnapError::FormatNegotiation(error.to_string()))?;

        // SAFETY: `scaler` wraps a valid SwsContext for the duration of the
        // call, and `sws_getCoefficients` returns a pointer to a static
        // table owned by libswscale. Limited-range YUV in, full-range RGB
        // out. A negative return means the conversion has no YUV matrix to
        // configure (e.g. RGB input) and the call left the context
        // untouched.
        unsafe {
            let table = sws_getCoefficients(color_matrix.sws_colorspace());
            let status = sws_setColorspaceDetails(
                scaler.as_mut_ptr(),
                table,
                0,
                table,
                1,
                0,
                1 << 16,
                1 << 16,
            );
            if status < 0 {
                log::debug!("colorspace matrix not applied (non-YUV source)");
            }
        }

        let spec = OutputFormatSpec {
            width,
            height,
            color_matrix,
        };
        self.negotiated = Some(Negotiated {
            scaler,
            spec,
            source_pixel_format,
        });

        Ok(spec)
    }

    /// Decode display frame `frame_number` under the negotiated format.
    ///
    /// Frames may be requested in any order; the source seeks to the
    /// nearest preceding keyframe and decodes forward, or continues from
    /// the current position when the target is ahead of it.
    ///
    /// The returned [`DecodedFrame`] is valid only until the next call to
    /// this method — the mutable borrow enforces that. Copy the pixels out
    /// with [`DecodedFrame::to_raster`](crate::DecodedFrame::to_raster).
    ///
    /// # Errors
    ///
    /// - [`SnapError::FormatNegotiation`] if no format was negotiated yet.
    /// - [`SnapError::FrameDecode`] (per-frame) if the frame number is out
    ///   of range or decoding fails; the source stays usable for further
    ///   requests.
    pub fn frame(&mut self, frame_number: usize) -> Result<DecodedFrame<'_>, SnapError> {
        if self.negotiated.is_none() {
            return Err(Self::negotiation_required());
        }

        self.decode_frame(frame_number)?;

        let encoded_width = self.decoded.width();
        let encoded_height = self.decoded.height();
        let picture_type = PictureType::from(self.decoded.kind());
        let color_space = ColorSpace::from(self.decoded.color_space());

        let Some(negotiated) = self.negotiated.as_mut() else {
            return Err(Self::negotiation_required());
        };
        negotiated
            .scaler
            .run(&self.decoded, &mut self.converted)
            .map_err(|error| SnapError::FrameDecode {
                frame_number,
                reason: format!("pixel format conversion failed: {error}"),
            })?;
        let spec = negotiated.spec;

        Ok(DecodedFrame::new(
            encoded_width,
            encoded_height,
            picture_type,
            color_space,
            spec.width,
            spec.height,
            self.converted.data(0),
            self.converted.stride(0),
        ))
    }

    /// Number of display frames in the bound track's seek table.
    pub fn frame_count(&self) -> usize {
        self.entries.len()
    }

    /// The output format, if negotiation has happened.
    pub fn output_format(&self) -> Option<OutputFormatSpec> {
        self.negotiated.as_ref().map(|negotiated| negotiated.spec)
    }

    /// The probe frame's native pixel format, if negotiation has happened.
    pub fn source_pixel_format(&self) -> Option<Pixel> {
        self.negotiated
            .as_ref()
            .map(|negotiated| negotiated.source_pixel_format)
    }

    /// The input file this source is bound to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn negotiation_required() -> SnapError {
        SnapError::FormatNegotiation(
            "no output format has been negotiated for this source".to_string(),
        )
    }

    /// Decode display frame `frame_number` into `self.decoded`.
    fn decode_frame(&mut self, frame_number: usize) -> Result<(), SnapError> {
        let total = self.entries.len();
        if frame_number >= total {
            return Err(SnapError::FrameDecode {
                frame_number,
                reason: format!("frame is out of range (video has {total} frames)"),
            });
        }

        // Nearest seekable keyframe at or before the target. Entry 0 is the
        // fallback for streams whose first packet is not flagged.
        let keyframe = self.entries[..=frame_number]
            .iter()
            .rposition(|entry| entry.keyframe)
            .unwrap_or(0);

        let can_continue_forward = self
            .position
            .is_some_and(|current| current < frame_number && current >= keyframe);
        if !can_continue_forward {
            self.seek_to_keyframe(self.entries[keyframe].pts, frame_number)?;
        }

        loop {
            if self.decoder.receive_frame(&mut self.decoded).is_ok() {
                let Some(timestamp) = self.decoded.timestamp().or_else(|| self.decoded.pts())
                else {
                    continue;
                };
                let Ok(current) = self
                    .entries
                    .binary_search_by_key(&timestamp, |entry| entry.pts)
                else {
                    // Timestamps outside the seek table (decoder pre-roll)
                    // are skipped.
                    continue;
                };
                self.position = Some(current);

                if current == frame_number {
                    return Ok(());
                }
                if current > frame_number {
                    return Err(SnapError::FrameDecode {
                        frame_number,
                        reason: format!("seek landed past the target (decoder produced frame {current})"),
                    });
                }
                continue;
            }

            if self.eof_sent {
                return Err(SnapError::FrameDecode {
                    frame_number,
                    reason: "stream ended before the requested frame was produced".to_string(),
                });
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.input) {
                Ok(()) => {
                    if packet.stream() == self.stream_index {
                        self.decoder
                            .send_packet(&packet)
                            .map_err(|error| SnapError::FrameDecode {
                                frame_number,
                                reason: error.to_string(),
                            })?;
                    }
                }
                Err(FfmpegError::Eof) => {
                    self.decoder
                        .send_eof()
                        .map_err(|error| SnapError::FrameDecode {
                            frame_number,
                            reason: error.to_string(),
                        })?;
                    self.eof_sent = true;
                }
                Err(_) => {
                    // Transient read error; try the next packet.
                }
            }
        }
    }

    /// Seek the demuxer to a keyframe timestamp and reset decoder state.
    fn seek_to_keyframe(&mut self, timestamp: i64, frame_number: usize) -> Result<(), SnapError> {
        // SAFETY: the AVFormatContext pointer is valid for as long as
        // `self.input` lives; av_seek_frame only mutates demuxer state.
        let status = unsafe {
            av_seek_frame(
                self.input.as_mut_ptr(),
                self.stream_index as c_int,
                timestamp,
                AVSEEK_FLAG_BACKWARD as c_int,
            )
        };
        if status < 0 {
            return Err(SnapError::FrameDecode {
                frame_number,
                reason: format!(
                    "seek to timestamp {timestamp} failed: {}",
                    FfmpegError::from(status)
                ),
            });
        }

        self.decoder.flush();
        self.position = None;
        self.eof_sent = false;
        Ok(())
    }
}
