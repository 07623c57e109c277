//! Library error type

use thiserror::Error;

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] imagesize::ImageError),

    /// A stored segmentation/bbox value that does not parse as integers.
    #[error("annotation {annotation_id}: malformed {field} value {value:?}")]
    MalformedField {
        annotation_id: i64,
        field: &'static str,
        value: String,
    },

    /// Split ratios out of range or summing past 1.
    #[error("invalid split ratios: test={test}, val={val} (each must be in [0, 1] and test + val <= 1)")]
    RatioOverflow { test: f64, val: f64 },
}
