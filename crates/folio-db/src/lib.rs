//! SQLite session layer for the Folio backup merger.
//!
//! A [`Session`] hosts one database on a private temp file: either loaded
//! from the bytes of an archive's database entry, or created empty as the
//! merge target. All SQL is parameterised; identifiers are interpolated
//! only from the static catalogue or from `sqlite_master`.
//!
//! Sessions are owned by exactly one merger and never shared across
//! threads.

mod convert;

pub mod error;

use std::io::Write as _;

use rusqlite::OptionalExtension as _;
use tempfile::NamedTempFile;

use folio_core::{Datum, Row};

pub use error::{Error, Result};

// ─── Column metadata ─────────────────────────────────────────────────────────

/// One column as reported by `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
  pub name:          String,
  pub declared_type: String,
  pub nullable:      bool,
  /// 1-based position within the primary key; 0 when not part of it.
  pub pk_ordinal:    u8,
}

// ─── Session ─────────────────────────────────────────────────────────────────

/// A single database hosted on a private temp file.
pub struct Session {
  conn: rusqlite::Connection,
  file: NamedTempFile,
}

impl Session {
  /// Load a database from raw bytes.
  ///
  /// Fails if the blob is not a SQLite database. The caller treats the
  /// session as read-only; nothing here mutates it.
  pub fn open_bytes(bytes: &[u8]) -> Result<Self> {
    let mut file = NamedTempFile::new()?;
    file.write_all(bytes)?;
    file.flush()?;

    let conn = rusqlite::Connection::open(file.path())?;
    // Force a read so a non-database blob fails here, not at first use.
    conn.query_row("SELECT count(*) FROM sqlite_master", [], |_| Ok(()))?;

    Ok(Self { conn, file })
  }

  /// Create an empty database — the merge target.
  pub fn create_scratch() -> Result<Self> {
    let file = NamedTempFile::new()?;
    let conn = rusqlite::Connection::open(file.path())?;
    Ok(Self { conn, file })
  }

  /// The database's current on-disk bytes.
  ///
  /// The session runs in autocommit with the default rollback journal, so
  /// the main file is complete after every statement.
  pub fn export(&self) -> Result<Vec<u8>> {
    Ok(std::fs::read(self.file.path())?)
  }

  // ── Introspection ─────────────────────────────────────────────────────────

  /// User table names, in schema order.
  pub fn tables(&self) -> Result<Vec<String>> {
    let mut stmt = self.conn.prepare(
      "SELECT name FROM sqlite_master
       WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
    )?;
    let names = stmt
      .query_map([], |row| row.get::<_, String>(0))?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
  }

  /// Column metadata for `table`, in declaration order.
  pub fn columns(&self, table: &str) -> Result<Vec<ColumnInfo>> {
    let sql = format!("PRAGMA table_info({})", quote_identifier(table));
    let mut stmt = self.conn.prepare(&sql)?;
    let columns = stmt
      .query_map([], |row| {
        Ok(ColumnInfo {
          name:          row.get(1)?,
          declared_type: row.get(2)?,
          nullable:      !row.get::<_, bool>(3)?,
          pk_ordinal:    row.get::<_, i64>(5)? as u8,
        })
      })?
      .collect::<rusqlite::Result<Vec<_>>>()?;

    if columns.is_empty() {
      return Err(Error::NoSuchTable(table.to_owned()));
    }
    Ok(columns)
  }

  /// Column names only — the shape most callers want.
  pub fn column_names(&self, table: &str) -> Result<Vec<String>> {
    Ok(self.columns(table)?.into_iter().map(|c| c.name).collect())
  }

  /// The table's single integer primary-key column, if it declares one.
  pub fn single_integer_pk(&self, table: &str) -> Result<Option<String>> {
    let columns = self.columns(table)?;
    let mut pk_columns =
      columns.iter().filter(|c| c.pk_ordinal > 0).collect::<Vec<_>>();
    if pk_columns.len() != 1 {
      return Ok(None);
    }
    let only = pk_columns.remove(0);
    let is_integer = only.declared_type.to_ascii_uppercase().contains("INT");
    Ok(is_integer.then(|| only.name.clone()))
  }

  /// `CREATE …` statements for every user table, index, trigger, and view,
  /// tables first so dependents can be replayed verbatim into a fresh
  /// database.
  pub fn schema_ddl(&self) -> Result<Vec<String>> {
    let mut stmt = self.conn.prepare(
      "SELECT sql FROM sqlite_master
       WHERE sql IS NOT NULL AND name NOT LIKE 'sqlite_%'
       ORDER BY CASE type WHEN 'table' THEN 0 ELSE 1 END",
    )?;
    let ddl = stmt
      .query_map([], |row| row.get::<_, String>(0))?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(ddl)
  }

  // ── Statements ────────────────────────────────────────────────────────────

  /// Execute verbatim DDL copied from a source database.
  pub fn create_table(&self, ddl: &str) -> Result<()> {
    self.conn.execute_batch(ddl)?;
    Ok(())
  }

  /// Run a parameterised query and collect every row.
  pub fn query(&self, sql: &str, params: &[Datum]) -> Result<Vec<Row>> {
    let mut stmt = self.conn.prepare(sql)?;
    let column_count = stmt.column_count();
    let rows = stmt
      .query_map(
        rusqlite::params_from_iter(params.iter().map(convert::to_value)),
        |row| {
          let mut values = Vec::with_capacity(column_count);
          for i in 0..column_count {
            values.push(convert::from_ref(row.get_ref(i)?));
          }
          Ok(Row::new(values))
        },
      )?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
  }

  /// Run a parameterised query expecting zero or one row.
  pub fn query_opt(
    &self,
    sql: &str,
    params: &[Datum],
  ) -> Result<Option<Row>> {
    let mut stmt = self.conn.prepare(sql)?;
    let column_count = stmt.column_count();
    let row = stmt
      .query_row(
        rusqlite::params_from_iter(params.iter().map(convert::to_value)),
        |row| {
          let mut values = Vec::with_capacity(column_count);
          for i in 0..column_count {
            values.push(convert::from_ref(row.get_ref(i)?));
          }
          Ok(Row::new(values))
        },
      )
      .optional()?;
    Ok(row)
  }

  /// Execute a parameterised statement; returns the affected row count.
  pub fn exec(&self, sql: &str, params: &[Datum]) -> Result<usize> {
    let mut stmt = self.conn.prepare(sql)?;
    let affected = stmt.execute(rusqlite::params_from_iter(
      params.iter().map(convert::to_value),
    ))?;
    Ok(affected)
  }
}

/// Double-quote an identifier for interpolation into SQL text.
pub fn quote_identifier(name: &str) -> String {
  format!("\"{}\"", name.replace('"', "\"\""))
}
