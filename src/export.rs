//! Store to COCO export

use crate::coco::{decode_db_fields, encode, CocoFile, Info};
use crate::error::Result;
use crate::store::RecordStore;

/// Build a COCO document from the store.
///
/// With `category_ids`, only images having an annotation in those
/// categories, the matching annotations and the matching categories are
/// included; otherwise the whole store.
pub fn export(store: &RecordStore, category_ids: Option<&[i64]>, info: Info) -> Result<CocoFile> {
    let (images, raw_annotations, categories) = match category_ids {
        Some(ids) => (
            store.select_images(ids)?,
            store.select_annotations(ids)?,
            store.select_categories(ids)?,
        ),
        None => (
            store.all_images()?,
            store.all_annotations()?,
            store.all_categories()?,
        ),
    };

    Ok(encode(images, decode_db_fields(raw_annotations)?, categories, info))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExportConfig;
    use crate::store::tests::{annotation, category, image};

    fn store() -> RecordStore {
        let store = RecordStore::open_in_memory().unwrap();
        store
            .load(&CocoFile {
                info: None,
                images: vec![image(1, "a.jpg"), image(2, "b.jpg"), image(3, "c.jpg")],
                categories: vec![category(1, "crack"), category(2, "rust")],
                annotations: vec![annotation(1, 1, 1), annotation(2, 2, 2), annotation(3, 2, 1)],
            })
            .unwrap();
        store
    }

    #[test]
    fn test_export_everything() {
        let file = export(&store(), None, ExportConfig::default().info("all")).unwrap();
        assert_eq!(file.images.len(), 3);
        assert_eq!(file.annotations.len(), 3);
        assert_eq!(file.categories.len(), 2);
        assert_eq!(file.annotations[0].segmentation, vec![vec![1, 1, 9, 1, 9, 9]]);
        assert_eq!(file.info.unwrap().description, "all");
    }

    #[test]
    fn test_export_by_category() {
        let file = export(&store(), Some(&[2][..]), ExportConfig::default().info("rust")).unwrap();
        assert_eq!(file.images.iter().map(|i| i.id).collect::<Vec<_>>(), vec![2]);
        assert_eq!(file.annotations.iter().map(|a| a.id).collect::<Vec<_>>(), vec![2]);
        assert_eq!(file.categories[0].name, "rust");
    }

    #[test]
    fn test_load_then_export_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let original = store();
        export(&original, None, ExportConfig::default().info("dump"))
            .unwrap()
            .write(&path)
            .unwrap();

        let reloaded = RecordStore::open_in_memory().unwrap();
        reloaded.load(&CocoFile::read(&path).unwrap()).unwrap();
        assert_eq!(reloaded.all_images().unwrap(), original.all_images().unwrap());
        assert_eq!(
            reloaded.all_annotations().unwrap(),
            original.all_annotations().unwrap()
        );
    }
}
