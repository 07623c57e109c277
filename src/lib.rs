pub mod cli;
pub mod coco;
pub mod config;
pub mod error;
pub mod export;
pub mod prep;
pub mod split;
pub mod store;

pub use config::Config;
pub use error::StoreError;
pub use store::RecordStore;
