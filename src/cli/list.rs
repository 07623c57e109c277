//! Categories and stats command implementations

use anyhow::Result;

use crate::store::RecordStore;

pub fn categories(store: &RecordStore) -> Result<()> {
    let categories = store.list_categories()?;

    if categories.is_empty() {
        println!("No categories found. Run 'cocostore load' or 'cocostore import' first.");
        return Ok(());
    }

    for (id, name) in categories {
        println!("{}: {}", id, name);
    }
    Ok(())
}

pub fn stats(store: &RecordStore) -> Result<()> {
    let counts = store.counts()?;
    println!("{:<12} {:>8}", "Images", counts.images);
    println!("{:<12} {:>8}", "Categories", counts.categories);
    println!("{:<12} {:>8}", "Annotations", counts.annotations);
    println!("{:<12} {:>8}", "Max image", store.max_image_id()?);
    println!("{:<12} {:>8}", "Max annot.", store.max_annotation_id()?);
    Ok(())
}
