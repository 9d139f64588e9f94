//! # tgzfs Core
//!
//! Decodes `.tgz` archives into memory and serves their files through a
//! virtual filesystem overlay, as if they were on disk under a chosen prefix.
//!
//! ## Overview
//!
//! Data flows one way:
//!
//! ```text
//! compressed bytes -> archive::decode -> FileMap -> VirtualOverlay -> read/list/stat
//! ```
//!
//! Paths outside the overlay's prefix always reach the real filesystem
//! unchanged.
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tgzfs_core::{archive, primitives, FileMap, InterceptionSession};
//!
//! fn example(tgz: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
//!     let mut files = FileMap::new();
//!     files.insert_entries_under("/app/node_modules/demo", "package/", archive::decode(tgz)?);
//!
//!     let mut session = InterceptionSession::new("/app/node_modules", Arc::new(files));
//!     let _active = session.enable_scoped()?;
//!
//!     // Every caller of `primitives` now sees the archive contents.
//!     let manifest = primitives::read_file("/app/node_modules/demo/package.json")?;
//!     println!("{}", String::from_utf8_lossy(&manifest));
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`archive`]: gzip + basic tar decoding, and a small ustar writer
//! - [`file_map`]: in-memory path → content store
//! - [`traits`]: blocking and async filesystem strategies
//! - [`real`]: the host filesystem strategy
//! - [`overlay`]: prefix-intercepting strategy backed by a [`FileMap`]
//! - [`primitives`]: the process-wide table of installed strategies
//! - [`session`]: install/restore state machine for the table
//! - [`error`]: error types and handling
//! - [`types`]: metadata and configuration types
//!
//! ## Limitations
//!
//! Only the basic fixed-header tar layout is read. PAX headers, GNU long
//! names, links and sparse files are not supported; see [`archive::tar`].

pub mod archive;
pub mod error;
pub mod file_map;
pub mod overlay;
pub mod primitives;
pub mod real;
pub mod session;
pub mod traits;
pub mod types;

pub use archive::{decode, ArchiveEntry};
pub use error::{Result, SessionStateError, TgzfsError};
pub use file_map::FileMap;
pub use overlay::VirtualOverlay;
pub use primitives::Primitives;
pub use real::RealFs;
pub use session::{InterceptionSession, SessionGuard};
pub use traits::{AsyncFileSystem, FileSystem};
