//! Canonical identity signatures.
//!
//! A signature is the canonical string form of an identity tuple: each
//! column value rendered as text (`NULL` for null, lowercase hex for
//! blobs), joined with `|`. A column named `MepsLanguage` renders NULL and
//! zero identically, as `0`.

use crate::{datum::Datum, schema::MEPS_LANGUAGE};

/// Render one cell value canonically for the named column.
pub fn canonical_value(column: &str, value: &Datum) -> String {
  if column == MEPS_LANGUAGE && value.is_null_or_zero() {
    return "0".to_owned();
  }
  match value {
    Datum::Null => "NULL".to_owned(),
    Datum::Integer(i) => i.to_string(),
    Datum::Real(r) => r.to_string(),
    Datum::Text(s) => s.clone(),
    Datum::Blob(b) => {
      let mut out = String::with_capacity(b.len() * 2);
      for byte in b {
        out.push_str(&format!("{byte:02x}"));
      }
      out
    }
  }
}

/// The signature of one identity tuple.
pub fn signature<'a, I>(pairs: I) -> String
where
  I: IntoIterator<Item = (&'a str, &'a Datum)>,
{
  let mut parts = Vec::new();
  for (column, value) in pairs {
    parts.push(canonical_value(column, value));
  }
  parts.join("|")
}
