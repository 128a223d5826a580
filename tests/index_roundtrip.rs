//! Seek index build, persistence, and validation integration tests.
//!
//! Tests that need a real video expect a fixture at
//! `tests/fixtures/sample_video.mp4` and are skipped when it is absent.

use std::{io::Write, path::Path, sync::Mutex};

use ffsnap::{IndexingProgress, SeekIndex, SilentProgress, SnapError};

fn sample_video_path() -> &'static str {
    "tests/fixtures/sample_video.mp4"
}

struct RecordingProgress {
    seen: Mutex<Vec<u8>>,
}

impl RecordingProgress {
    fn new() -> Self {
        Self {
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl IndexingProgress for RecordingProgress {
    fn on_progress(&self, percent: u8) {
        self.seen.lock().unwrap().push(percent);
    }
}

#[test]
fn build_on_unreadable_input_is_fatal() {
    // No fixture needed: a file of garbage bytes is not a media file.
    let mut garbage = tempfile::NamedTempFile::new().unwrap();
    garbage.write_all(b"not a video at all").unwrap();
    garbage.flush().unwrap();

    match SeekIndex::build(garbage.path(), &SilentProgress) {
        Err(SnapError::IndexBuild { path, .. }) => assert_eq!(path, garbage.path()),
        result => panic!("Expected IndexBuild, got: {result:?}"),
    }
}

#[test]
fn build_persist_reload_belongs_to_same_file() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let index = SeekIndex::build(path.as_ref(), &SilentProgress).expect("Failed to build index");
    assert!(index.frame_count() > 0);

    let index_file = tempfile::NamedTempFile::new().unwrap();
    index.write_to(index_file.path()).expect("Failed to persist");

    let loaded = SeekIndex::read_from(index_file.path()).expect("Failed to reload");
    assert_eq!(loaded.frame_count(), index.frame_count());
    assert_eq!(loaded.entries(), index.entries());
    assert!(loaded.validate_for(path.as_ref()).is_ok());
}

#[test]
fn reloaded_index_rejects_different_file() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let index = SeekIndex::build(path.as_ref(), &SilentProgress).expect("Failed to build index");

    let mut other = tempfile::NamedTempFile::new().unwrap();
    other.write_all(b"a different file entirely").unwrap();
    other.flush().unwrap();

    assert!(matches!(
        index.validate_for(other.path()),
        Err(SnapError::IndexMismatch { .. })
    ));
}

#[test]
fn acquire_reuses_valid_persisted_index() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let index_file = tempfile::NamedTempFile::new().unwrap();

    let (index, built_fresh) =
        SeekIndex::acquire(path.as_ref(), Some(index_file.path()), &SilentProgress)
            .expect("Failed to acquire");
    assert!(built_fresh, "no valid index existed yet");
    index.write_to(index_file.path()).expect("Failed to persist");

    let (reloaded, built_fresh) =
        SeekIndex::acquire(path.as_ref(), Some(index_file.path()), &SilentProgress)
            .expect("Failed to acquire");
    assert!(!built_fresh, "persisted index should have been reused");
    assert_eq!(reloaded.frame_count(), index.frame_count());
}

#[test]
fn acquire_falls_back_to_rebuild_on_corrupt_index() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let mut index_file = tempfile::NamedTempFile::new().unwrap();
    index_file.write_all(b"{ definitely not an index").unwrap();
    index_file.flush().unwrap();

    let (index, built_fresh) =
        SeekIndex::acquire(path.as_ref(), Some(index_file.path()), &SilentProgress)
            .expect("Corrupt index must fall back to a rebuild, not fail");
    assert!(built_fresh);
    assert!(index.frame_count() > 0);
}

#[test]
fn build_progress_is_monotone_and_ends_at_hundred() {
    let path = sample_video_path();
    if !Path::new(path).exists() {
        return;
    }

    let recorder = RecordingProgress::new();
    SeekIndex::build(path.as_ref(), &recorder).expect("Failed to build index");

    let seen = recorder.seen.lock().unwrap();
    assert!(!seen.is_empty());
    for window in seen.windows(2) {
        assert!(
            window[1] > window[0],
            "progress regressed or repeated: {seen:?}"
        );
    }
    assert_eq!(*seen.last().unwrap(), 100);
}
