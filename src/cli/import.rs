//! Load and import command implementations

use anyhow::{Context, Result};
use std::path::Path;

use crate::coco::CocoFile;
use crate::store::{MergeReport, RecordStore, StagedBatch};

/// Load a canonical annotation file keeping its ids
pub fn load(store: &RecordStore, path: &Path) -> Result<()> {
    let file = read(path)?;
    let report = store.load(&file)?;
    print_report("Loaded", path, &report);
    Ok(())
}

/// Merge an annotation-tool batch, renumbering its ids after the store's
pub fn merge(store: &RecordStore, path: &Path) -> Result<()> {
    let file = read(path)?;
    let staged = StagedBatch::stage(file);
    println!(
        "Staged {} images, {} categories, {} annotations from {}",
        staged.images().len(),
        staged.categories().len(),
        staged.annotations().len(),
        path.display()
    );

    let report = store
        .merge(staged)
        .with_context(|| format!("Failed to merge {}", path.display()))?;
    print_report("Merged", path, &report);
    Ok(())
}

fn read(path: &Path) -> Result<CocoFile> {
    CocoFile::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn print_report(verb: &str, path: &Path, report: &MergeReport) {
    println!("{} {}", verb, path.display());
    println!(
        "   images:      {:>6} added, {:>6} already present",
        report.images_inserted, report.images_skipped
    );
    println!(
        "   categories:  {:>6} added, {:>6} already present",
        report.categories_inserted, report.categories_skipped
    );
    println!(
        "   annotations: {:>6} added, {:>6} already present, {:>6} dropped (image not in store)",
        report.annotations_inserted, report.annotations_skipped, report.annotations_dropped
    );
    if report.staging_dropped > 0 {
        println!(
            "   {} records rejected while staging (duplicates or unknown image)",
            report.staging_dropped
        );
    }
}
