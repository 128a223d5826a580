//! Snapshot image writing.
//!
//! [`SnapshotWriter`] is the boundary between the extraction core and the
//! image encoder: it takes a finished [`RasterImage`] plus naming metadata
//! and persists one PNG per frame, named
//! `{base}_{frame_number}{picture_type}.png` (e.g. `snapshot_42I.png`).

use std::path::PathBuf;

use image::RgbImage;

use crate::{
    error::SnapError,
    frame::{PictureType, RasterImage},
};

/// Writes raster images to disk as PNG snapshots.
///
/// The base name may include a directory component
/// (`SnapshotWriter::new("shots/take1")` writes `shots/take1_0I.png`);
/// parent directories are not created.
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    base_name: String,
}

impl SnapshotWriter {
    /// Create a writer producing `{base_name}_{frame}{type}.png` files.
    pub fn new(base_name: impl Into<String>) -> Self {
        Self {
            base_name: base_name.into(),
        }
    }

    /// The path a given frame will be written to.
    pub fn target_path(&self, frame_number: usize, picture_type: PictureType) -> PathBuf {
        PathBuf::from(format!(
            "{}_{}{}.png",
            self.base_name,
            frame_number,
            picture_type.symbol()
        ))
    }

    /// Persist `raster` as a PNG snapshot and return the written path.
    ///
    /// # Errors
    ///
    /// Returns [`SnapError::Write`] if PNG encoding or the filesystem write
    /// fails. Write failures are per-frame: the caller logs and continues
    /// with the next request.
    pub fn write(
        &self,
        raster: &RasterImage,
        frame_number: usize,
        picture_type: PictureType,
    ) -> Result<PathBuf, SnapError> {
        let path = self.target_path(frame_number, picture_type);

        let image = RgbImage::from_raw(
            raster.width(),
            raster.height(),
            raster.as_bytes().to_vec(),
        )
        .ok_or_else(|| SnapError::Write {
            path: path.clone(),
            reason: "raster dimensions do not match its pixel data".to_string(),
        })?;

        image.save(&path).map_err(|error| SnapError::Write {
            path: path.clone(),
            reason: error.to_string(),
        })?;

        log::debug!("wrote {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::SnapshotWriter;
    use crate::frame::{PictureType, RasterImage};

    #[test]
    fn naming_follows_base_frame_type_convention() {
        let writer = SnapshotWriter::new("shot");
        let path = writer.target_path(42, PictureType::I);
        assert_eq!(path.to_str(), Some("shot_42I.png"));

        let path = writer.target_path(7, PictureType::B);
        assert_eq!(path.to_str(), Some("shot_7B.png"));
    }

    #[test]
    fn written_file_lands_at_target_path() {
        let directory = tempfile::tempdir().unwrap();
        let base = directory.path().join("shot");
        let writer = SnapshotWriter::new(base.to_str().unwrap());

        let data = vec![0x7F_u8; 4 * 3 * 3];
        let raster = RasterImage::from_interleaved(&data, 4 * 3, 4, 3);

        let path = writer.write(&raster, 42, PictureType::I).unwrap();
        assert_eq!(path, directory.path().join("shot_42I.png"));
        assert!(path.exists());
    }

    #[test]
    fn write_into_missing_directory_fails_per_frame() {
        let writer = SnapshotWriter::new("no/such/directory/shot");
        let data = vec![0_u8; 2 * 2 * 3];
        let raster = RasterImage::from_interleaved(&data, 2 * 3, 2, 2);

        let result = writer.write(&raster, 0, PictureType::P);
        assert!(matches!(
            result,
            Err(crate::error::SnapError::Write { .. })
        ));
    }
}
