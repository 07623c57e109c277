//! Unannotated image discovery

use log::info;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::Result;
use crate::store::RecordStore;

/// Subfolder the unannotated images are copied into
pub const NOT_ANNOTATED_DIR: &str = "00 NotAnnotated";

/// File names of the regular files directly inside `dir`, sorted
pub fn list_image_files(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

/// Files in `dir` whose name is not an image file_name in the store
pub fn find_unannotated(store: &RecordStore, dir: &Path) -> Result<Vec<String>> {
    let known = store.file_names()?;
    let missing: Vec<String> = list_image_files(dir)?
        .into_iter()
        .filter(|name| !known.contains(name))
        .collect();
    info!(
        "{} of the files in {} are not in the store",
        missing.len(),
        dir.display()
    );
    Ok(missing)
}

/// Copy `files` from `dir` into `dir/<subdir>`, returning the target folder
pub fn copy_into(dir: &Path, files: &[String], subdir: &str) -> Result<PathBuf> {
    let target = dir.join(subdir);
    std::fs::create_dir_all(&target)?;
    for name in files {
        std::fs::copy(dir.join(name), target.join(name))?;
    }
    Ok(target)
}
