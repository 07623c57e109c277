//! Split command implementation

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::Config;
use crate::split::{split, SplitOptions, SplitRatios};
use crate::store::RecordStore;

pub fn run(
    store: &RecordStore,
    config: &Config,
    categories: Vec<i64>,
    ratios: SplitRatios,
    seed: Option<u64>,
    output_dir: &Path,
) -> Result<()> {
    // No filter means every known category
    let category_ids = if categories.is_empty() {
        store.list_categories()?.into_iter().map(|(id, _)| id).collect()
    } else {
        categories
    };

    let opts = SplitOptions {
        category_ids,
        ratios,
        seed,
        key: config.split.annotation_key,
    };
    let result = split(store, &opts)?;

    let written = result
        .write(output_dir, &config.export)
        .with_context(|| format!("Failed to write splits to {}", output_dir.display()))?;

    println!("{:<8} {:>8} {:>12}", "Split", "Images", "Annotations");
    println!("{}", "-".repeat(30));
    for (name, subset) in [
        ("train", &result.train),
        ("val", &result.val),
        ("test", &result.test),
    ] {
        println!(
            "{:<8} {:>8} {:>12}",
            name,
            subset.images.len(),
            subset.annotations.len()
        );
    }
    for path in written {
        println!("→ {}", path.display());
    }
    Ok(())
}
