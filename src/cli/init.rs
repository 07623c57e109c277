//! Init command implementation

use anyhow::Result;

use crate::store::RecordStore;

pub fn run(store: &RecordStore, reset: bool) -> Result<()> {
    if reset {
        store.reset()?;
        println!("Store reset: all images, categories and annotations removed.");
    } else {
        println!("Store ready.");
    }
    Ok(())
}
