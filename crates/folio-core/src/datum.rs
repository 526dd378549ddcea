//! `Datum` — the database-agnostic cell value.
//!
//! The merge engine never looks inside a row except through identity rules
//! and foreign keys, so one small value enum covers everything SQLite can
//! hand back.

// ─── Datum ───────────────────────────────────────────────────────────────────

/// A single cell value read from (or destined for) a database row.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
  Null,
  Integer(i64),
  Real(f64),
  Text(String),
  Blob(Vec<u8>),
}

impl Datum {
  pub fn is_null(&self) -> bool { matches!(self, Datum::Null) }

  /// The integer value, if this datum is an integer.
  pub fn as_integer(&self) -> Option<i64> {
    match self {
      Datum::Integer(i) => Some(*i),
      _ => None,
    }
  }

  /// True for NULL and for integer zero — the `MepsLanguage` degeneracy.
  pub fn is_null_or_zero(&self) -> bool {
    matches!(self, Datum::Null | Datum::Integer(0))
  }
}

impl From<i64> for Datum {
  fn from(i: i64) -> Self { Datum::Integer(i) }
}

impl From<&str> for Datum {
  fn from(s: &str) -> Self { Datum::Text(s.to_owned()) }
}

impl From<Option<i64>> for Datum {
  fn from(v: Option<i64>) -> Self {
    v.map(Datum::Integer).unwrap_or(Datum::Null)
  }
}

// ─── Row ─────────────────────────────────────────────────────────────────────

/// One table row: cell values in column order.
///
/// Column names are held once per table by the reader, not per row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
  pub values: Vec<Datum>,
}

impl Row {
  pub fn new(values: Vec<Datum>) -> Self { Self { values } }

  pub fn get(&self, index: usize) -> &Datum { &self.values[index] }
}
