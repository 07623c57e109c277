//! Batch staging and id reconciliation
//!
//! An annotation tool numbers images and annotations from 1 in every export,
//! so a batch cannot be written into the store with its own ids. Staging
//! applies the batch-local constraints, reconciliation moves the ids past the
//! store's current maximums.

use log::debug;
use std::collections::{HashMap, HashSet};

use crate::coco::{Annotation, Category, CocoFile, Image};

/// An incoming batch, ids still as assigned by the annotation tool
#[derive(Debug, Clone, Default)]
pub struct StagedBatch {
    images: Vec<Image>,
    categories: Vec<Category>,
    annotations: Vec<Annotation>,
    dropped: usize,
}

/// A staged batch whose ids are disjoint from the store's
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciledBatch {
    pub images: Vec<Image>,
    pub categories: Vec<Category>,
    pub annotations: Vec<Annotation>,
}

impl StagedBatch {
    /// Stage a batch document.
    ///
    /// Within the batch the first image wins for a repeated file_name or id,
    /// the first category wins for a repeated id, and annotations that do not
    /// reference a staged image are dropped.
    pub fn stage(file: CocoFile) -> Self {
        let mut staged = Self::default();

        let mut seen_names = HashSet::new();
        let mut seen_ids = HashSet::new();
        for image in file.images {
            if seen_ids.contains(&image.id) || seen_names.contains(&image.file_name) {
                debug!("staging: duplicate image {} ({})", image.id, image.file_name);
                staged.dropped += 1;
                continue;
            }
            seen_ids.insert(image.id);
            seen_names.insert(image.file_name.clone());
            staged.images.push(image);
        }

        let mut seen_categories = HashSet::new();
        for category in file.categories {
            if seen_categories.insert(category.id) {
                staged.categories.push(category);
            } else {
                staged.dropped += 1;
            }
        }

        for annotation in file.annotations {
            if seen_ids.contains(&annotation.image_id) {
                staged.annotations.push(annotation);
            } else {
                debug!(
                    "staging: annotation {} references unknown image {}",
                    annotation.id, annotation.image_id
                );
                staged.dropped += 1;
            }
        }

        staged
    }

    pub fn images(&self) -> &[Image] {
        &self.images
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Records rejected while staging
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Renumber images to `max_image_id + 1 ..` and annotations to
    /// `max_annotation_id + 1 ..` in staging order, rewriting each
    /// annotation's image_id to its image's new id. Category ids are stable
    /// and left untouched.
    pub fn reconcile(self, max_image_id: i64, max_annotation_id: i64) -> ReconciledBatch {
        let mut remap: HashMap<i64, i64> = HashMap::with_capacity(self.images.len());

        let images: Vec<Image> = self
            .images
            .into_iter()
            .zip(max_image_id + 1..)
            .map(|(mut image, new_id)| {
                remap.insert(image.id, new_id);
                image.id = new_id;
                image
            })
            .collect();

        // Staging guarantees every annotation's image is in `remap`.
        let annotations: Vec<Annotation> = self
            .annotations
            .into_iter()
            .filter_map(|mut annotation| {
                let image_id = *remap.get(&annotation.image_id)?;
                annotation.image_id = image_id;
                Some(annotation)
            })
            .zip(max_annotation_id + 1..)
            .map(|(mut annotation, new_id)| {
                annotation.id = new_id;
                annotation
            })
            .collect();

        ReconciledBatch {
            images,
            categories: self.categories,
            annotations,
        }
    }
}
