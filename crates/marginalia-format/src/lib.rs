//! Annotation file codec for Marginalia.
//!
//! Reads and writes the persisted JSON shapes and upgrades 1.0.0 files to
//! 2.0.0. Pure synchronous; the caller owns file I/O.
//!
//! # Quick start
//!
//! ```no_run
//! use marginalia_format::load;
//!
//! let json = std::fs::read_to_string("notes.md.annotations.json").unwrap();
//! let doc = std::fs::read_to_string("notes.md").unwrap();
//! let loaded = load(&json, Some(&doc)).unwrap();
//! println!("{} annotations, migrated={}", loaded.file.annotations.len(), loaded.migrated);
//! ```

pub mod error;
pub mod file;
pub mod history;
pub mod legacy;
pub mod migrate;

pub use error::{Error, Result};
pub use file::{AnnotationFile, FileVersion, Loaded, detect_version, load};
pub use migrate::{Migrator, migrate_annotation};

/// Value of the `_tool` tag on every file this crate reads or writes.
pub const TOOL_NAME: &str = "marginalia";
/// The format version this crate writes.
pub const CURRENT_VERSION: &str = "2.0.0";
/// The legacy format version migrated on load.
pub const LEGACY_VERSION: &str = "1.0.0";
