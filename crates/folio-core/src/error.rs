//! Error types for `folio-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// An identity rule or foreign key names a column the live schema lacks.
  #[error("table {table} has no column {column}")]
  MissingColumn { table: String, column: String },

  #[error("table {table} has no primary-key column {column}")]
  MissingPrimaryKey { table: String, column: String },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
