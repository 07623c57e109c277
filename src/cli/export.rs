//! Export command implementation

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::Config;
use crate::export::export;
use crate::store::RecordStore;

pub fn run(
    store: &RecordStore,
    config: &Config,
    categories: &[i64],
    output: &Path,
    description: &str,
) -> Result<()> {
    let filter = if categories.is_empty() {
        None
    } else {
        Some(categories)
    };

    let file = export(store, filter, config.export.info(description))?;
    file.write(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!(
        "Exported {} images, {} annotations, {} categories to {}",
        file.images.len(),
        file.annotations.len(),
        file.categories.len(),
        output.display()
    );
    Ok(())
}
