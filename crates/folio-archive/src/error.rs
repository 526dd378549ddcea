//! Error types for the folio-archive codec.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A required entry (`manifest.json` or `userData.db`) is absent.
  #[error("container is missing required entry {0}")]
  MissingEntry(&'static str),

  #[error("zip error: {0}")]
  Zip(#[from] zip::result::ZipError),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("manifest error: {0}")]
  Manifest(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
