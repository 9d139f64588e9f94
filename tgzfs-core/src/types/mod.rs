// Module declarations
pub mod metadata;
pub mod config;

// Re-export all types from submodules
pub use metadata::{FileType, FileMetadata};
pub use config::{LogLevel, TgzfsConfig};
pub use bytes::Bytes;
