//! Error type for `folio-db`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("no such table: {0}")]
  NoSuchTable(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
