//! Unannotated and fix-sizes command implementations

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::coco::CocoFile;
use crate::prep::{copy_into, correct_image_sizes, find_unannotated, NOT_ANNOTATED_DIR};
use crate::store::RecordStore;

pub fn unannotated(store: &RecordStore, images_dir: &Path, copy: bool) -> Result<()> {
    let missing = find_unannotated(store, images_dir)?;

    if missing.is_empty() {
        println!("All files in {} are annotated.", images_dir.display());
        return Ok(());
    }

    for name in &missing {
        println!("{}", name);
    }
    println!("\n{} files not in the store", missing.len());

    if copy {
        let target = copy_into(images_dir, &missing, NOT_ANNOTATED_DIR)
            .with_context(|| format!("Failed to copy files from {}", images_dir.display()))?;
        println!("Copied to {}", target.display());
    }
    Ok(())
}

pub fn fix_sizes(folder: &Path, coco_file: &Path, output: Option<PathBuf>) -> Result<()> {
    let mut file = CocoFile::read(coco_file)
        .with_context(|| format!("Failed to read {}", coco_file.display()))?;

    let report = correct_image_sizes(folder, &mut file);
    for name in &report.changed {
        println!("Changed size for {}", name);
    }
    for path in &report.unreadable {
        println!("Could not read {}", path.display());
    }

    let output = output.unwrap_or_else(|| default_output(coco_file));
    file.write(&output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!(
        "{} sizes corrected, {} unreadable → {}",
        report.changed.len(),
        report.unreadable.len(),
        output.display()
    );
    Ok(())
}

/// `updated_<name>` next to the input file
fn default_output(coco_file: &Path) -> PathBuf {
    let name = coco_file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "annotations.json".to_string());
    coco_file.with_file_name(format!("updated_{}", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_name() {
        assert_eq!(
            default_output(Path::new("data/via_project_coco.json")),
            PathBuf::from("data/updated_via_project_coco.json")
        );
    }
}
