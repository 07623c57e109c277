//! Command implementations

pub mod export;
pub mod import;
pub mod init;
pub mod list;
pub mod prep;
pub mod split;
