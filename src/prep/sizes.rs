//! Image size correction
//!
//! Annotation tools sometimes record the wrong width/height, most often for
//! JPEGs whose EXIF orientation rotates them by 90 degrees. Dimensions are
//! read from the file header and swapped for orientations 5-8.

use image::metadata::Orientation;
use image::{ImageDecoder, ImageReader};
use log::{debug, warn};
use std::path::{Path, PathBuf};

use crate::coco::CocoFile;
use crate::error::Result;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SizeReport {
    /// file_names whose width or height changed
    pub changed: Vec<String>,
    /// Files that could not be opened or measured
    pub unreadable: Vec<PathBuf>,
}

/// Width and height as displayed, honoring EXIF orientation
pub fn actual_size(path: &Path) -> Result<(i64, i64)> {
    let size = imagesize::size(path)?;
    let (width, height) = (size.width as i64, size.height as i64);

    match orientation(path) {
        Some(
            Orientation::Rotate90
            | Orientation::Rotate270
            | Orientation::Rotate90FlipH
            | Orientation::Rotate270FlipH,
        ) => Ok((height, width)),
        _ => Ok((width, height)),
    }
}

/// Correct `file.images` dimensions in place from the images under `folder`
pub fn correct_image_sizes(folder: &Path, file: &mut CocoFile) -> SizeReport {
    let mut report = SizeReport::default();

    for image in &mut file.images {
        let path = folder.join(&image.file_name);
        let (width, height) = match actual_size(&path) {
            Ok(size) => size,
            Err(e) => {
                debug!("cannot measure {}: {}", path.display(), e);
                report.unreadable.push(path);
                continue;
            }
        };

        if image.width != width || image.height != height {
            debug!(
                "{}: {}x{} -> {}x{}",
                image.file_name, image.width, image.height, width, height
            );
            image.width = width;
            image.height = height;
            report.changed.push(image.file_name.clone());
        }
    }

    if !report.unreadable.is_empty() {
        warn!("{} images could not be measured", report.unreadable.len());
    }
    report
}

/// EXIF orientation, if the decoder can read one
fn orientation(path: &Path) -> Option<Orientation> {
    let read = || -> image::ImageResult<Orientation> {
        let mut decoder = ImageReader::open(path)?
            .with_guessed_format()?
            .into_decoder()?;
        decoder.orientation()
    };
    match read() {
        Ok(orientation) => Some(orientation),
        Err(e) => {
            debug!("no orientation for {}: {}", path.display(), e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coco::Image;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;

    /// APP1 segment holding a little-endian TIFF block with one orientation tag
    fn exif_segment(orientation: u16) -> Vec<u8> {
        let mut segment = b"Exif\0\0II".to_vec();
        segment.extend_from_slice(&42u16.to_le_bytes());
        segment.extend_from_slice(&8u32.to_le_bytes());
        segment.extend_from_slice(&1u16.to_le_bytes());
        segment.extend_from_slice(&0x0112u16.to_le_bytes());
        segment.extend_from_slice(&3u16.to_le_bytes());
        segment.extend_from_slice(&1u32.to_le_bytes());
        segment.extend_from_slice(&orientation.to_le_bytes());
        segment.extend_from_slice(&[0, 0]);
        segment.extend_from_slice(&0u32.to_le_bytes());

        let mut app1 = vec![0xFF, 0xE1];
        app1.extend_from_slice(&((segment.len() + 2) as u16).to_be_bytes());
        app1.extend_from_slice(&segment);
        app1
    }

    /// A real JPEG, stored `width` x `height`, tagged with an EXIF orientation
    fn write_jpeg(path: &Path, width: u32, height: u32, orientation: u16) {
        let mut encoded = Vec::new();
        RgbImage::new(width, height)
            .write_to(&mut Cursor::new(&mut encoded), ImageFormat::Jpeg)
            .unwrap();

        // Right after SOI
        let mut bytes = encoded[..2].to_vec();
        bytes.extend_from_slice(&exif_segment(orientation));
        bytes.extend_from_slice(&encoded[2..]);
        std::fs::write(path, bytes).unwrap();
    }

    fn record(id: i64, file_name: &str, width: i64, height: i64) -> Image {
        Image {
            id,
            width,
            height,
            file_name: file_name.to_string(),
            license: 1,
            date_captured: String::new(),
        }
    }

    #[test]
    fn test_actual_size_swaps_for_quarter_turns() {
        let dir = tempfile::tempdir().unwrap();
        let cases = [(1, (30, 20)), (3, (30, 20)), (6, (20, 30)), (8, (20, 30))];
        for (orientation, expected) in cases {
            let path = dir.path().join(format!("o{orientation}.jpg"));
            write_jpeg(&path, 30, 20, orientation);
            assert_eq!(actual_size(&path).unwrap(), expected, "orientation {orientation}");
        }
    }

    #[test]
    fn test_actual_size_without_exif() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.png");
        RgbImage::new(30, 20).save(&path).unwrap();
        assert_eq!(actual_size(&path).unwrap(), (30, 20));
    }

    #[test]
    fn test_correct_image_sizes() {
        let dir = tempfile::tempdir().unwrap();
        RgbImage::new(300, 200).save(dir.path().join("wide.png")).unwrap();
        RgbImage::new(50, 40).save(dir.path().join("ok.png")).unwrap();
        write_jpeg(&dir.path().join("rotated.jpg"), 30, 20, 6);

        let mut file = CocoFile {
            images: vec![
                record(1, "wide.png", 200, 300),
                record(2, "ok.png", 50, 40),
                record(3, "missing.png", 10, 10),
                record(4, "rotated.jpg", 30, 20),
            ],
            ..CocoFile::default()
        };

        let report = correct_image_sizes(dir.path(), &mut file);
        assert_eq!(
            report.changed,
            vec!["wide.png".to_string(), "rotated.jpg".to_string()]
        );
        assert_eq!(report.unreadable, vec![dir.path().join("missing.png")]);
        assert_eq!((file.images[0].width, file.images[0].height), (300, 200));
        assert_eq!((file.images[1].width, file.images[1].height), (50, 40));
        assert_eq!((file.images[2].width, file.images[2].height), (10, 10));
        assert_eq!((file.images[3].width, file.images[3].height), (20, 30));
    }
}
