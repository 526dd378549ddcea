//! Backup container and manifest codec.
//!
//! A backup archive is a ZIP container with DEFLATE compression holding a
//! `manifest.json`, a `userData.db` database, and any number of opaque
//! media entries. This crate reads and writes that container and parses
//! and composes the manifest. Pure synchronous; no database dependencies.
//!
//! # Quick start
//!
//! ```no_run
//! use folio_archive::Archive;
//!
//! let bytes = std::fs::read("backup.jwlibrary").unwrap();
//! let archive = Archive::read(&bytes).unwrap();
//! println!(
//!   "{} media entries, {} byte database",
//!   archive.entries.len(),
//!   archive.database.len()
//! );
//! ```

mod container;
mod manifest;

pub mod error;

pub use container::{
  ARCHIVE_EXT, Archive, DATABASE_ENTRY, MANIFEST_ENTRY,
};
pub use error::{Error, Result};
pub use manifest::{
  DEFAULT_SCHEMA_VERSION, Manifest, MergedManifest, UserDataBackup,
  format_timestamp,
};
