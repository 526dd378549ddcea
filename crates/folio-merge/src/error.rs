//! The engine's error taxonomy.
//!
//! Errors abort the whole run; expected outcomes (duplicates, orphans) are
//! values and end up in the trace and the validation report instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Fewer than two sources, or an input rejected before opening.
  #[error("invalid input: {0}")]
  InputInvalid(String),

  /// Missing manifest/database entry, or a malformed compressed stream.
  #[error("bad container: {0}")]
  BadContainer(folio_archive::Error),

  /// The manifest is not valid JSON or omits required fields.
  #[error("bad manifest: {0}")]
  BadManifest(folio_archive::Error),

  /// The database blob fails to open or lacks required tables.
  #[error("bad database: {0}")]
  BadDatabase(String),

  #[error("combined input of {actual} bytes exceeds the {limit} byte cap")]
  InputTooLarge { actual: u64, limit: u64 },

  /// A verified-failure of a first-occurrence Location insert, or an
  /// exhausted primary-key search.
  #[error("merge conflict: {0}")]
  MergeConflict(String),

  #[error("merge cancelled")]
  Cancelled,

  #[error("internal error: {0}")]
  Internal(String),
}

impl From<folio_db::Error> for Error {
  fn from(e: folio_db::Error) -> Self { Error::Internal(e.to_string()) }
}

impl From<folio_core::Error> for Error {
  fn from(e: folio_core::Error) -> Self { Error::BadDatabase(e.to_string()) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
