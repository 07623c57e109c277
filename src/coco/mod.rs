//! COCO document types and file I/O
//!
//! The same document shape is used for input batches (no `info` block) and for
//! exported datasets (with `info`).

mod codec;

pub use codec::{
    decode_bbox, decode_db_fields, decode_segmentation, encode, encode_bbox,
    encode_segmentation,
};

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub id: i64,
    pub width: i64,
    pub height: i64,
    pub file_name: String,
    #[serde(default)]
    pub license: i64,
    #[serde(default)]
    pub date_captured: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default)]
    pub supercategory: String,
    pub id: i64,
    pub name: String,
}

/// Annotation with decoded geometry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// Polygons, each a flat `[x1, y1, x2, y2, ...]` list
    #[serde(default)]
    pub segmentation: Vec<Vec<i64>>,
    #[serde(default)]
    pub area: i64,
    /// `[x, y, width, height]`
    pub bbox: [i64; 4],
    #[serde(default)]
    pub iscrowd: i64,
    pub id: i64,
    pub image_id: i64,
    pub category_id: i64,
}

/// Annotation row as held in the store, geometry still serialized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAnnotation {
    pub segmentation: String,
    pub area: i64,
    pub bbox: String,
    pub iscrowd: i64,
    pub id: i64,
    pub image_id: i64,
    pub category_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Info {
    pub year: String,
    pub version: String,
    pub description: String,
    pub contributor: String,
    pub url: String,
    pub date_created: String,
}

/// A COCO document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CocoFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<Info>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub categories: Vec<Category>,
}

impl CocoFile {
    /// Read a COCO document (an annotation-tool batch or an earlier export)
    pub fn read(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    /// Write as pretty JSON with two-space indentation
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_annotation_tool_batch() {
        let json = r#"{
            "images": [
                {"id": 1, "width": 640, "height": 480, "file_name": "a.jpg", "license": 1, "date_captured": ""}
            ],
            "categories": [
                {"supercategory": "defect", "id": 3, "name": "crack"}
            ],
            "annotations": [
                {"segmentation": [[10, 10, 20, 10, 20, 20]], "area": 50, "bbox": [10, 10, 10, 10],
                 "iscrowd": 0, "id": 1, "image_id": 1, "category_id": 3}
            ]
        }"#;
        let file: CocoFile = serde_json::from_str(json).unwrap();
        assert!(file.info.is_none());
        assert_eq!(file.images[0].file_name, "a.jpg");
        assert_eq!(file.categories[0].name, "crack");
        assert_eq!(file.annotations[0].bbox, [10, 10, 10, 10]);
        assert_eq!(file.annotations[0].segmentation, vec![vec![10, 10, 20, 10, 20, 20]]);
    }

    #[test]
    fn test_write_then_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.json");
        let file = CocoFile {
            info: None,
            images: vec![Image {
                id: 7,
                width: 10,
                height: 20,
                file_name: "x.png".to_string(),
                license: 0,
                date_captured: "2020-09-30".to_string(),
            }],
            annotations: vec![],
            categories: vec![],
        };
        file.write(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  \"images\""));
        assert!(!text.contains("\"info\""));
        assert_eq!(CocoFile::read(&path).unwrap(), file);
    }
}
