//! Preprocessing around the store
//!
//! - `sizes`: correct image dimensions in an annotation-tool export before import
//! - `unannotated`: find image files the store does not know yet

pub mod sizes;
pub mod unannotated;

pub use sizes::{actual_size, correct_image_sizes, SizeReport};
pub use unannotated::{copy_into, find_unannotated, list_image_files, NOT_ANNOTATED_DIR};
