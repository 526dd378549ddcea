//! Small SQL builders shared by the mergers.
//!
//! Identifiers interpolated here come only from the static catalogue or
//! from `sqlite_master`; values always travel as bound parameters.

use folio_core::{Datum, Row, schema::MEPS_LANGUAGE};
use folio_db::{Session, quote_identifier};

use crate::error::Result;

/// Read every row of `table`, the named columns in order, sorted by
/// `order_by` when given (primary-key order keeps merges deterministic).
pub(crate) fn read_rows(
  session: &Session,
  table: &str,
  columns: &[String],
  order_by: Option<&str>,
) -> Result<Vec<Row>> {
  let column_list = columns
    .iter()
    .map(|c| quote_identifier(c))
    .collect::<Vec<_>>()
    .join(", ");
  let mut sql =
    format!("SELECT {column_list} FROM {}", quote_identifier(table));
  if let Some(pk) = order_by {
    sql.push_str(&format!(" ORDER BY {}", quote_identifier(pk)));
  }
  Ok(session.query(&sql, &[])?)
}

/// `INSERT OR IGNORE INTO "T" ("a", "b", …) VALUES (?, ?, …)`.
pub(crate) fn insert_or_ignore_sql(
  table: &str,
  columns: &[String],
) -> String {
  let column_list = columns
    .iter()
    .map(|c| quote_identifier(c))
    .collect::<Vec<_>>()
    .join(", ");
  let placeholders =
    columns.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
  format!(
    "INSERT OR IGNORE INTO {} ({column_list}) VALUES ({placeholders})",
    quote_identifier(table)
  )
}

/// Whether `table` contains a row with primary key `id`.
pub(crate) fn contains_pk(
  session: &Session,
  table: &str,
  pk_column: &str,
  id: i64,
) -> Result<bool> {
  let sql = format!(
    "SELECT 1 FROM {} WHERE {} = ?",
    quote_identifier(table),
    quote_identifier(pk_column)
  );
  Ok(session.query_opt(&sql, &[Datum::Integer(id)])?.is_some())
}

/// Build the WHERE clause and parameters matching one identity rule
/// against a concrete row.
///
/// NULL values become `IS NULL` predicates; `MepsLanguage` compares with
/// NULL and zero collapsed.
pub(crate) fn identity_predicate(
  columns: &[String],
  rule: &[usize],
  row: &Row,
) -> (String, Vec<Datum>) {
  let mut clauses = Vec::with_capacity(rule.len());
  let mut params = Vec::new();

  for &index in rule {
    let column = &columns[index];
    let value = row.get(index);
    if column == MEPS_LANGUAGE {
      clauses
        .push(format!("IFNULL({}, 0) = ?", quote_identifier(column)));
      params.push(match value {
        Datum::Null => Datum::Integer(0),
        other => other.clone(),
      });
    } else if value.is_null() {
      clauses.push(format!("{} IS NULL", quote_identifier(column)));
    } else {
      clauses.push(format!("{} = ?", quote_identifier(column)));
      params.push(value.clone());
    }
  }

  (clauses.join(" AND "), params)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn cols(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| (*s).to_owned()).collect()
  }

  #[test]
  fn insert_sql_shape() {
    assert_eq!(
      insert_or_ignore_sql("Tag", &cols(&["TagId", "Name"])),
      "INSERT OR IGNORE INTO \"Tag\" (\"TagId\", \"Name\") VALUES (?, ?)"
    );
  }

  #[test]
  fn identity_predicate_handles_null_and_meps_language() {
    let columns = cols(&["Label", "ThumbnailFilePath", "MepsLanguage"]);
    let row = Row::new(vec![
      Datum::Text("Talk 23".into()),
      Datum::Null,
      Datum::Null,
    ]);

    let (clause, params) = identity_predicate(&columns, &[0, 1, 2], &row);
    assert_eq!(
      clause,
      "\"Label\" = ? AND \"ThumbnailFilePath\" IS NULL \
       AND IFNULL(\"MepsLanguage\", 0) = ?"
    );
    assert_eq!(
      params,
      vec![Datum::Text("Talk 23".into()), Datum::Integer(0)]
    );
  }
}
