//! Merge committer
//!
//! Precondition: a single writer. The maximum ids are read inside the merge
//! transaction, but two processes merging into the same database at once may
//! still race for the same id range; callers must serialize imports.

use log::info;
use std::fmt;

use super::stage::StagedBatch;
use super::{
    insert_annotation, insert_category, insert_image, max_annotation_id, max_image_id,
    AnnotationInsert, RecordStore,
};
use crate::error::Result;

/// Outcome of a load or merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub images_inserted: usize,
    /// Images whose file_name was already present
    pub images_skipped: usize,
    pub categories_inserted: usize,
    pub categories_skipped: usize,
    pub annotations_inserted: usize,
    /// Annotations whose id was already present
    pub annotations_skipped: usize,
    /// Annotations whose image did not land in the store
    pub annotations_dropped: usize,
    /// Records rejected by the stager before reconciliation
    pub staging_dropped: usize,
}

impl MergeReport {
    pub(crate) fn count_image(&mut self, inserted: bool) {
        if inserted {
            self.images_inserted += 1;
        } else {
            self.images_skipped += 1;
        }
    }

    pub(crate) fn count_category(&mut self, inserted: bool) {
        if inserted {
            self.categories_inserted += 1;
        } else {
            self.categories_skipped += 1;
        }
    }

    pub(crate) fn count_annotation(&mut self, outcome: AnnotationInsert) {
        match outcome {
            AnnotationInsert::Inserted => self.annotations_inserted += 1,
            AnnotationInsert::DuplicateId => self.annotations_skipped += 1,
            AnnotationInsert::MissingImage => self.annotations_dropped += 1,
        }
    }
}

impl fmt::Display for MergeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "images +{} (skipped {}), categories +{} (skipped {}), \
             annotations +{} (skipped {}, dropped {})",
            self.images_inserted,
            self.images_skipped,
            self.categories_inserted,
            self.categories_skipped,
            self.annotations_inserted,
            self.annotations_skipped,
            self.annotations_dropped
        )?;
        if self.staging_dropped > 0 {
            write!(f, ", {} rejected while staging", self.staging_dropped)?;
        }
        Ok(())
    }
}

impl RecordStore {
    /// Reconcile a staged batch against the store and commit it.
    ///
    /// Images land first (skipping known file_names), then categories
    /// (skipping known ids), then annotations whose renumbered image_id now
    /// exists. The batch is consumed; on error the transaction rolls back and
    /// the store is unchanged.
    pub fn merge(&self, staged: StagedBatch) -> Result<MergeReport> {
        let tx = self.conn.unchecked_transaction()?;

        let mut report = MergeReport {
            staging_dropped: staged.dropped(),
            ..MergeReport::default()
        };

        let max_image = max_image_id(&tx)?;
        let max_annotation = max_annotation_id(&tx)?;
        let batch = staged.reconcile(max_image, max_annotation);

        for image in &batch.images {
            report.count_image(insert_image(&tx, image)?);
        }
        for category in &batch.categories {
            report.count_category(insert_category(&tx, category)?);
        }
        for annotation in &batch.annotations {
            report.count_annotation(insert_annotation(&tx, annotation)?);
        }

        tx.commit()?;
        info!(
            "merged batch after image id {} / annotation id {}: {}",
            max_image, max_annotation, report
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coco::{decode_db_fields, Category, CocoFile, Image, StoredAnnotation};
    use crate::store::tests::{annotation, category, image};

    fn seeded_store() -> RecordStore {
        let store = RecordStore::open_in_memory().unwrap();
        store
            .load(&CocoFile {
                info: None,
                images: vec![image(1, "a.jpg"), image(2, "b.jpg")],
                categories: vec![category(1, "crack")],
                annotations: vec![annotation(1, 1, 1), annotation(2, 2, 1)],
            })
            .unwrap();
        store
    }

    fn tool_batch() -> CocoFile {
        CocoFile {
            info: None,
            images: vec![image(1, "c.jpg"), image(2, "d.jpg")],
            categories: vec![category(1, "crack"), category(2, "rust")],
            annotations: vec![annotation(1, 1, 2), annotation(2, 2, 1), annotation(3, 2, 2)],
        }
    }

    type Snapshot = (Vec<Image>, Vec<Category>, Vec<StoredAnnotation>);

    fn snapshot(store: &RecordStore) -> Snapshot {
        (
            store.all_images().unwrap(),
            store.all_categories().unwrap(),
            store.all_annotations().unwrap(),
        )
    }

    #[test]
    fn test_merge_appends_after_existing_ids() {
        let store = seeded_store();
        let report = store.merge(StagedBatch::stage(tool_batch())).unwrap();

        assert_eq!(report.images_inserted, 2);
        assert_eq!(report.categories_inserted, 1);
        assert_eq!(report.categories_skipped, 1);
        assert_eq!(report.annotations_inserted, 3);

        let c = store.find_image("c.jpg").unwrap().unwrap();
        let d = store.find_image("d.jpg").unwrap().unwrap();
        assert_eq!((c.id, d.id), (3, 4));

        let annotations = decode_db_fields(store.all_annotations().unwrap()).unwrap();
        let added: Vec<(i64, i64)> = annotations
            .iter()
            .filter(|a| a.id > 2)
            .map(|a| (a.id, a.image_id))
            .collect();
        assert_eq!(added, vec![(3, 3), (4, 4), (5, 4)]);
    }

    #[test]
    fn test_reimport_is_noop() {
        let store = seeded_store();
        store.merge(StagedBatch::stage(tool_batch())).unwrap();
        let before = snapshot(&store);

        let report = store.merge(StagedBatch::stage(tool_batch())).unwrap();
        assert_eq!(report.images_inserted, 0);
        assert_eq!(report.images_skipped, 2);
        assert_eq!(report.annotations_inserted, 0);
        assert_eq!(report.annotations_dropped, 3);
        assert_eq!(snapshot(&store), before);
    }

    #[test]
    fn test_duplicate_file_name_keeps_store_version() {
        let store = seeded_store();
        let mut stale = image(1, "a.jpg");
        stale.width = 4000;
        stale.height = 3000;
        let batch = CocoFile {
            info: None,
            images: vec![stale],
            categories: vec![category(1, "crack")],
            annotations: vec![annotation(1, 1, 1)],
        };

        let report = store.merge(StagedBatch::stage(batch)).unwrap();
        assert_eq!(report.images_skipped, 1);
        assert_eq!(report.annotations_dropped, 1);

        let kept = store.find_image("a.jpg").unwrap().unwrap();
        assert_eq!((kept.id, kept.width, kept.height), (1, 640, 480));
        assert_eq!(store.counts().unwrap().annotations, 2);
    }

    #[test]
    fn test_committed_annotations_reference_existing_images() {
        let store = seeded_store();
        let mut batch = tool_batch();
        batch.images.push(image(3, "a.jpg"));
        batch.annotations.push(annotation(4, 3, 1));
        batch.annotations.push(annotation(5, 77, 1));
        store.merge(StagedBatch::stage(batch)).unwrap();

        let image_ids: std::collections::HashSet<i64> =
            store.all_images().unwrap().iter().map(|i| i.id).collect();
        for annotation in store.all_annotations().unwrap() {
            assert!(image_ids.contains(&annotation.image_id));
        }
    }

    #[test]
    fn test_merge_into_empty_store() {
        let store = RecordStore::open_in_memory().unwrap();
        let report = store.merge(StagedBatch::stage(tool_batch())).unwrap();
        assert_eq!(report.images_inserted, 2);
        assert_eq!(store.max_image_id().unwrap(), 2);
        assert_eq!(store.max_annotation_id().unwrap(), 3);
    }

    #[test]
    fn test_failed_merge_rolls_back() {
        let store = seeded_store();
        let mut batch = tool_batch();
        // Unknown category violates the foreign key on the annotation step.
        batch.annotations.push(annotation(9, 1, 404));
        assert!(store.merge(StagedBatch::stage(batch)).is_err());
        assert_eq!(store.counts().unwrap().images, 2);
        assert!(store.find_image("c.jpg").unwrap().is_none());
    }
}
