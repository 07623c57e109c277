//! Conversion between store rows and COCO documents
//!
//! Geometry columns hold canonical JSON (`[[x1,y1,...]]`, `[x,y,w,h]`).
//! Rows written by older tools hold a quoted Python-style list such as
//! `'[[12, 40, 18, 44]]'`; those are read by stripping the quote and bracket
//! characters and splitting on commas, which yields a single polygon.

use super::{Annotation, Category, CocoFile, Image, Info, StoredAnnotation};
use crate::error::{Result, StoreError};

const LEGACY_TRIM: &[char] = &['\'', '"', '[', ']'];

/// Decode the serialized geometry of store rows
pub fn decode_db_fields(raw: Vec<StoredAnnotation>) -> Result<Vec<Annotation>> {
    raw.into_iter()
        .map(|row| {
            Ok(Annotation {
                segmentation: decode_segmentation(row.id, &row.segmentation)?,
                area: row.area,
                bbox: decode_bbox(row.id, &row.bbox)?,
                iscrowd: row.iscrowd,
                id: row.id,
                image_id: row.image_id,
                category_id: row.category_id,
            })
        })
        .collect()
}

pub fn decode_segmentation(annotation_id: i64, value: &str) -> Result<Vec<Vec<i64>>> {
    if let Ok(polygons) = serde_json::from_str::<Vec<Vec<i64>>>(value) {
        return Ok(polygons);
    }
    Ok(vec![parse_legacy_list(annotation_id, "segmentation", value)?])
}

pub fn decode_bbox(annotation_id: i64, value: &str) -> Result<[i64; 4]> {
    if let Ok(bbox) = serde_json::from_str::<[i64; 4]>(value) {
        return Ok(bbox);
    }
    let values = parse_legacy_list(annotation_id, "bbox", value)?;
    <[i64; 4]>::try_from(values).map_err(|_| StoreError::MalformedField {
        annotation_id,
        field: "bbox",
        value: value.to_string(),
    })
}

pub fn encode_segmentation(segmentation: &[Vec<i64>]) -> Result<String> {
    Ok(serde_json::to_string(segmentation)?)
}

pub fn encode_bbox(bbox: &[i64; 4]) -> Result<String> {
    Ok(serde_json::to_string(bbox)?)
}

fn parse_legacy_list(annotation_id: i64, field: &'static str, value: &str) -> Result<Vec<i64>> {
    let inner = value.trim().trim_matches(LEGACY_TRIM);
    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }

    inner
        .split(',')
        .map(|token| {
            token.trim().parse::<i64>().map_err(|_| StoreError::MalformedField {
                annotation_id,
                field,
                value: value.to_string(),
            })
        })
        .collect()
}

/// Assemble an output document
pub fn encode(
    images: Vec<Image>,
    annotations: Vec<Annotation>,
    categories: Vec<Category>,
    metadata: Info,
) -> CocoFile {
    CocoFile {
        info: Some(metadata),
        images,
        annotations,
        categories,
    }
}
