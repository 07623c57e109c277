//! Train/validation/test splitting
//!
//! Images matching a category filter are shuffled and cut into three
//! contiguous blocks: the first `floor(n * test)` positions go to test, the
//! next `floor(n * val)` to validation, the rest to train. Annotations follow
//! the split of their image.

use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::coco::{decode_db_fields, encode, Annotation, Category, Image};
use crate::config::ExportConfig;
use crate::error::{Result, StoreError};
use crate::store::RecordStore;

/// Which annotation field is matched against a split's image ids.
///
/// `AnnotationId` reproduces older exports that matched on the annotation's
/// own id; it only gives sensible results when annotation and image ids
/// happen to coincide.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationKey {
    #[default]
    ImageId,
    AnnotationId,
}

impl AnnotationKey {
    fn of(&self, annotation: &Annotation) -> i64 {
        match self {
            AnnotationKey::ImageId => annotation.image_id,
            AnnotationKey::AnnotationId => annotation.id,
        }
    }
}

/// Fractions of the shuffled image list; train takes the remainder
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitRatios {
    pub test: f64,
    pub val: f64,
}

impl SplitRatios {
    pub fn validate(&self) -> Result<()> {
        let in_range = |r: f64| r.is_finite() && (0.0..=1.0).contains(&r);
        if !in_range(self.test) || !in_range(self.val) || self.test + self.val > 1.0 {
            return Err(StoreError::RatioOverflow {
                test: self.test,
                val: self.val,
            });
        }
        Ok(())
    }

    /// Block boundaries `(test_end, val_end)` for `n` shuffled positions
    fn boundaries(&self, n: usize) -> (usize, usize) {
        let test_end = (n as f64 * self.test).floor() as usize;
        let val_len = (n as f64 * self.val).floor() as usize;
        (test_end.min(n), (test_end + val_len).min(n))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subset {
    pub images: Vec<Image>,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetSplit {
    pub train: Subset,
    pub val: Subset,
    pub test: Subset,
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone)]
pub struct SplitOptions {
    pub category_ids: Vec<i64>,
    pub ratios: SplitRatios,
    /// Fixed seed; `None` draws from the thread rng
    pub seed: Option<u64>,
    pub key: AnnotationKey,
}

#[derive(Clone, Copy)]
enum Bucket {
    Train,
    Val,
    Test,
}

/// Split the store's images matching `opts.category_ids`
pub fn split(store: &RecordStore, opts: &SplitOptions) -> Result<DatasetSplit> {
    opts.ratios.validate()?;

    let images = store.select_images(&opts.category_ids)?;
    let annotations = decode_db_fields(store.select_annotations(&opts.category_ids)?)?;
    let categories = store.select_categories(&opts.category_ids)?;
    debug!(
        "split: {} images, {} annotations for categories {:?}",
        images.len(),
        annotations.len(),
        opts.category_ids
    );

    let result = match opts.seed {
        Some(seed) => {
            let mut rng = StdRng::seed_from_u64(seed);
            partition(images, annotations, categories, opts.ratios, opts.key, &mut rng)?
        }
        None => {
            let mut rng = rand::rng();
            partition(images, annotations, categories, opts.ratios, opts.key, &mut rng)?
        }
    };

    info!(
        "split into train {} / val {} / test {} images",
        result.train.images.len(),
        result.val.images.len(),
        result.test.images.len()
    );
    Ok(result)
}

/// Partition already-selected images and annotations
pub fn partition<R: Rng + ?Sized>(
    images: Vec<Image>,
    annotations: Vec<Annotation>,
    categories: Vec<Category>,
    ratios: SplitRatios,
    key: AnnotationKey,
    rng: &mut R,
) -> Result<DatasetSplit> {
    ratios.validate()?;

    let n = images.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);
    let (test_end, val_end) = ratios.boundaries(n);

    let mut slots: Vec<Option<Image>> = images.into_iter().map(Some).collect();
    let mut buckets: HashMap<i64, Bucket> = HashMap::with_capacity(n);
    let mut result = DatasetSplit {
        categories,
        ..DatasetSplit::default()
    };

    for (position, &index) in order.iter().enumerate() {
        let bucket = if position < test_end {
            Bucket::Test
        } else if position < val_end {
            Bucket::Val
        } else {
            Bucket::Train
        };
        if let Some(image) = slots[index].take() {
            buckets.insert(image.id, bucket);
            result.subset_mut(bucket).images.push(image);
        }
    }

    for annotation in annotations {
        match buckets.get(&key.of(&annotation)) {
            Some(&bucket) => result.subset_mut(bucket).annotations.push(annotation),
            None => debug!("split: annotation {} matched no image", annotation.id),
        }
    }

    Ok(result)
}

impl DatasetSplit {
    fn subset_mut(&mut self, bucket: Bucket) -> &mut Subset {
        match bucket {
            Bucket::Train => &mut self.train,
            Bucket::Val => &mut self.val,
            Bucket::Test => &mut self.test,
        }
    }

    /// Write `train.json`, `val.json` and `test.json` into `dir`
    pub fn write(&self, dir: &Path, export: &ExportConfig) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;

        let outputs = [
            ("train.json", "training annotation file", &self.train),
            ("val.json", "validation annotation file", &self.val),
            ("test.json", "test annotation file", &self.test),
        ];

        let mut written = Vec::with_capacity(outputs.len());
        for (file_name, description, subset) in outputs {
            let path = dir.join(file_name);
            encode(
                subset.images.clone(),
                subset.annotations.clone(),
                self.categories.clone(),
                export.info(description),
            )
            .write(&path)?;
            written.push(path);
        }
        Ok(written)
    }
}
