//! Post-merge integrity checks.
//!
//! Read-only queries against the target. A non-empty report is attached
//! to the merge result as a warning; it never mutates and never aborts.

use std::collections::HashMap;

use folio_core::{
  Datum, IdRegistry, OrphanSample, ValidationReport, schema,
};
use folio_db::{Session, quote_identifier};

use crate::{error::Result, location};

/// Orphan samples reported per class, at most.
const SAMPLE_LIMIT: usize = 10;

pub(crate) fn validate(
  target: &Session,
  registry: &IdRegistry,
) -> Result<ValidationReport> {
  let tables = target.tables()?;
  let present = |name: &str| tables.iter().any(|t| t == name);

  let mut report = ValidationReport::default();

  if present("Mark") && present(schema::LOCATION) {
    let (count, samples) = orphans(
      target,
      "Mark",
      "MarkId",
      "LocationId",
      schema::LOCATION,
      "LocationId",
    )?;
    report.orphaned_marks = count;
    report.orphan_samples.extend(samples);
  }

  if present("Note") && present(schema::LOCATION) {
    let (count, samples) = orphans(
      target,
      "Note",
      "NoteId",
      "LocationId",
      schema::LOCATION,
      "LocationId",
    )?;
    report.orphaned_notes = count;
    report.orphan_samples.extend(samples);
  }

  report.duplicate_locations = duplicate_locations(target)?;

  for policy in schema::CATALOGUE {
    if !present(policy.name) {
      continue;
    }
    let query =
      format!("SELECT COUNT(*) FROM {}", quote_identifier(policy.name));
    let count = target
      .query_opt(&query, &[])?
      .and_then(|r| r.get(0).as_integer())
      .unwrap_or(0);
    report.table_counts.insert(policy.name.to_owned(), count as u64);
  }

  for (table, size) in registry.table_sizes() {
    report.mapping_counts.insert(table.to_owned(), size);
  }

  Ok(report)
}

/// Count rows of `table` whose non-null `fk_column` points at no row of
/// `ref_table`, plus up to [`SAMPLE_LIMIT`] samples.
fn orphans(
  target: &Session,
  table: &str,
  pk_column: &str,
  fk_column: &str,
  ref_table: &str,
  ref_pk: &str,
) -> Result<(u64, Vec<OrphanSample>)> {
  let predicate = format!(
    "{fk} IS NOT NULL AND NOT EXISTS \
     (SELECT 1 FROM {r} WHERE {r}.{rpk} = {t}.{fk})",
    fk = quote_identifier(fk_column),
    r = quote_identifier(ref_table),
    rpk = quote_identifier(ref_pk),
    t = quote_identifier(table),
  );

  let count_sql = format!(
    "SELECT COUNT(*) FROM {t} WHERE {predicate}",
    t = quote_identifier(table),
  );
  let count = target
    .query_opt(&count_sql, &[])?
    .and_then(|r| r.get(0).as_integer())
    .unwrap_or(0) as u64;

  let sample_sql = format!(
    "SELECT {pk}, {fk} FROM {t} WHERE {predicate} ORDER BY {pk} LIMIT ?",
    pk = quote_identifier(pk_column),
    fk = quote_identifier(fk_column),
    t = quote_identifier(table),
  );
  let samples = target
    .query(&sample_sql, &[Datum::Integer(SAMPLE_LIMIT as i64)])?
    .into_iter()
    .filter_map(|row| {
      Some(OrphanSample {
        table:   table.to_owned(),
        row:     row.get(0).as_integer()?,
        column:  fk_column.to_owned(),
        missing: row.get(1).as_integer()?,
      })
    })
    .collect();

  Ok((count, samples))
}

/// Number of Location identity signatures appearing more than once.
fn duplicate_locations(target: &Session) -> Result<u64> {
  let signatures = location::target_signatures(target)?;
  let mut counts: HashMap<String, u64> = HashMap::new();
  for sig in signatures {
    *counts.entry(sig).or_insert(0) += 1;
  }
  Ok(counts.values().filter(|&&n| n > 1).count() as u64)
}
