//! End-to-end frame extraction integration tests.
//!
//! Tests require a fixture at `tests/fixtures/sample_video.mp4` and are
//! skipped when it is absent.

use std::path::Path;

use ffsnap::{
    SeekIndex, SilentProgress, SnapError, SnapshotWriter, VideoSource, extract_frames,
};

fn sample_video_path() -> &'static str {
    "tests/fixtures/sample_video.mp4"
}

fn open_negotiated(path: &str) -> VideoSource {
    let (index, _) =
        SeekIndex::acquire(path.as_ref(), None, &SilentProgress).expect("Failed to acquire index");
    let mut source = VideoSource::open(path, &index).expect("Failed to open source");
    drop(index);
    source.negotiate_format().expect("Failed to negotiate");
    source
}

#[test]
fn produced_file_count_matches_decodable_requests() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let mut source = open_negotiated(path);
    let last_valid = source.frame_count() - 1;
    let out_of_range = source.frame_count() + 1000;

    let directory = tempfile::tempdir().unwrap();
    let base = directory.path().join("shot");
    let writer = SnapshotWriter::new(base.to_str().unwrap());

    // Three requests, one of which legitimately fails: expect exactly two
    // files and a continued run, not a crash.
    let requests = [0, out_of_range, last_valid];
    let summary = extract_frames(&mut source, &requests, &writer, |_| {});

    assert_eq!(summary.requested(), requests.len());
    assert_eq!(summary.written.len(), 2);
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].0, out_of_range);
    for written in &summary.written {
        assert!(written.exists(), "missing snapshot {}", written.display());
        assert_eq!(written.extension().and_then(|ext| ext.to_str()), Some("png"));
    }
}

#[test]
fn out_of_range_frame_reports_frame_decode_error() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let mut source = open_negotiated(path);
    let out_of_range = source.frame_count() + 7;

    match source.frame(out_of_range) {
        Err(SnapError::FrameDecode { frame_number, .. }) => {
            assert_eq!(frame_number, out_of_range);
        }
        Ok(_) => panic!("Out-of-range frame unexpectedly decoded"),
        Err(other) => panic!("Expected FrameDecode, got: {other}"),
    }
}

#[test]
fn repeated_extraction_is_byte_identical() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let mut source = open_negotiated(path);
    let target = (source.frame_count() / 2).min(10);

    let first = source.frame(target).expect("First decode failed").to_raster();
    let second = source
        .frame(target)
        .expect("Second decode failed")
        .to_raster();

    assert_eq!(first.width(), second.width());
    assert_eq!(first.height(), second.height());
    assert_eq!(first.as_bytes(), second.as_bytes());
}

#[test]
fn extraction_before_negotiation_is_rejected() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let (index, _) = SeekIndex::acquire(path.as_ref(), None, &SilentProgress)
        .expect("Failed to acquire index");
    let mut source = VideoSource::open(path, &index).expect("Failed to open source");

    assert!(matches!(
        source.frame(0),
        Err(SnapError::FormatNegotiation(_))
    ));
}

#[test]
fn negotiated_format_matches_probe_geometry() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let mut source = open_negotiated(path);
    let spec = source.negotiate_format().expect("Renegotiation failed");

    // Negotiation is idempotent and the emitted frames carry the spec's
    // native dimensions.
    let frame = source.frame(0).expect("Failed to decode frame 0");
    assert_eq!(frame.width(), spec.width);
    assert_eq!(frame.height(), spec.height);

    let raster = frame.to_raster();
    assert_eq!(
        raster.as_bytes().len(),
        spec.width as usize * spec.height as usize * 3
    );
}

#[test]
fn requests_are_consumed_in_caller_order() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let mut source = open_negotiated(path);
    if source.frame_count() < 3 {
        return;
    }

    let directory = tempfile::tempdir().unwrap();
    let base = directory.path().join("ordered");
    let writer = SnapshotWriter::new(base.to_str().unwrap());

    // Deliberately unordered, with a duplicate: no reordering, no dedup.
    let requests = [2, 0, 2];
    let mut reported = Vec::new();
    let summary = extract_frames(&mut source, &requests, &writer, |report| {
        reported.push(report.frame_number);
    });

    assert_eq!(reported, vec![2, 0, 2]);
    assert_eq!(summary.written.len(), 3);
}
