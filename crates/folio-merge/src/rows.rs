//! The generic table-by-table row merger.
//!
//! Runs once per table (after Location), in dependency order, over every
//! source in caller order and every row in primary-key order. Per row:
//!
//! 1. rewrite foreign keys through the registry — identity rules that
//!    involve FK columns are only meaningful afterwards;
//! 2. evaluate the identity rules in declared order, first match wins:
//!    record a mapping to the survivor and skip;
//! 3. resolve primary-key conflicts per the table's strategy;
//! 4. insert with `INSERT OR IGNORE` and read back — a mapping is
//!    committed only for a verified insert.

use tracing::{debug, warn};

use folio_core::{
  CancelToken, Datum, IdRegistry, MergeEvent, Row, SourceId, TraceSink,
  schema::{self, IdStrategy, MergePlan},
};
use folio_db::{Session, quote_identifier};

use crate::{
  error::{Error, Result},
  source::Source,
  sql,
};

/// Bound on the next-free-id search before the run is declared conflicted.
const MAX_ID_ATTEMPTS: u32 = 1_000;

/// Merge one table from every source into the target.
pub(crate) fn merge_table(
  plan: &MergePlan,
  sources: &[Source],
  target: &Session,
  registry: &mut IdRegistry,
  trace: &mut dyn TraceSink,
  cancel: Option<&CancelToken>,
) -> Result<()> {
  let insert_sql = sql::insert_or_ignore_sql(&plan.table, &plan.columns);
  let order_by = plan.primary_key.as_ref().map(|(name, _)| name.as_str());

  let mut offset: i64 = 0;
  let mut next_free: Option<i64> = None;

  for source in sources {
    if let Some(token) = cancel
      && token.is_cancelled()
    {
      return Err(Error::Cancelled);
    }
    if !source.has_table(&plan.table)? {
      continue;
    }

    let rows =
      sql::read_rows(&source.session, &plan.table, &plan.columns, order_by)?;
    let mut source_max: i64 = 0;
    let mut inserted = 0usize;
    let mut duplicates = 0usize;

    for row in rows {
      let mut row = row;
      let original = plan
        .primary_key
        .as_ref()
        .and_then(|(_, index)| row.get(*index).as_integer());
      if let Some(orig) = original {
        source_max = source_max.max(orig);
      }

      rewrite_foreign_keys(
        plan, source.id, &mut row, target, registry, trace, original,
      )?;

      if let Some(survivor) = find_duplicate(plan, target, &row)? {
        duplicates += 1;
        if let (Some(orig), Some(id)) = (original, survivor) {
          registry.record(source.id, &plan.table, orig, id);
          trace.event(MergeEvent::Duplicate {
            table:    plan.table.clone(),
            original: orig,
            survivor: id,
          });
        }
        continue;
      }

      let final_id = match (&plan.primary_key, plan.id_strategy) {
        (None, _) => None,
        (Some((name, _)), strategy) => {
          let orig = original.ok_or_else(|| {
            Error::BadDatabase(format!(
              "source {} has a {} row without an integer {}",
              source.id.0, plan.table, name
            ))
          })?;
          Some(match strategy {
            IdStrategy::Offset => orig + offset,
            IdStrategy::NextFree => {
              if sql::contains_pk(target, &plan.table, name, orig)? {
                allocate_free_id(target, plan, name, &mut next_free)?
              } else {
                orig
              }
            }
          })
        }
      };

      if let (Some((_, pk_index)), Some(id)) = (&plan.primary_key, final_id)
      {
        row.values[*pk_index] = Datum::Integer(id);
      }

      let affected = target.exec(&insert_sql, &row.values)?;

      match (&plan.primary_key, final_id, original) {
        (Some((name, _)), Some(id), Some(orig)) => {
          if !sql::contains_pk(target, &plan.table, name, id)? {
            // The insert was swallowed; a mapping recorded now would
            // point at nothing.
            warn!(
              table = %plan.table,
              source = source.id.0,
              original = orig,
              "insert did not land; no mapping recorded"
            );
            continue;
          }
          inserted += 1;
          if id != orig {
            registry.record(source.id, &plan.table, orig, id);
          }
          trace.event(MergeEvent::Inserted {
            table:    plan.table.clone(),
            original: orig,
            new:      id,
          });
        }
        _ => {
          if affected == 0 {
            warn!(
              table = %plan.table,
              source = source.id.0,
              "keyless insert was ignored"
            );
          } else {
            inserted += 1;
          }
        }
      }
    }

    debug!(
      table = %plan.table,
      source = source.id.0,
      inserted,
      duplicates,
      "table merged"
    );
    offset += source_max;
  }

  Ok(())
}

/// Rewrite every foreign-key column of `row` through the registry.
///
/// Misses fall back to keeping the value: silently when the referent
/// exists in the target, flagged as an orphan candidate otherwise.
fn rewrite_foreign_keys(
  plan: &MergePlan,
  source: SourceId,
  row: &mut Row,
  target: &Session,
  registry: &IdRegistry,
  trace: &mut dyn TraceSink,
  original: Option<i64>,
) -> Result<()> {
  for fk in &plan.foreign_keys {
    let Some(value) = row.get(fk.index).as_integer() else {
      continue;
    };

    if let Some(mapped) = registry.lookup(source, &fk.references, value) {
      if mapped != value {
        row.values[fk.index] = Datum::Integer(mapped);
        trace.event(MergeEvent::Remapped {
          table:    plan.table.clone(),
          column:   fk.column.clone(),
          original: value,
          new:      mapped,
        });
      }
      continue;
    }

    let Some(ref_pk) =
      schema::policy(&fk.references).and_then(|p| p.primary_key)
    else {
      continue;
    };
    if !sql::contains_pk(target, &fk.references, ref_pk, value)? {
      trace.event(MergeEvent::Orphan {
        table:   plan.table.clone(),
        row:     original.unwrap_or(0),
        column:  fk.column.clone(),
        missing: value,
      });
    }
  }
  Ok(())
}

/// Probe the identity rules in declared order; the first rule matching an
/// existing target row wins. Returns the survivor's primary key (None for
/// keyless tables) when a duplicate is found.
fn find_duplicate(
  plan: &MergePlan,
  target: &Session,
  row: &Row,
) -> Result<Option<Option<i64>>> {
  for rule in &plan.identity {
    if rule.columns.is_empty() {
      continue;
    }
    if rule.when_present
      && rule.columns.iter().any(|&i| row.get(i).is_null())
    {
      continue;
    }

    let (clause, params) =
      sql::identity_predicate(&plan.columns, &rule.columns, row);
    let select = match &plan.primary_key {
      Some((name, _)) => quote_identifier(name),
      None => "1".to_owned(),
    };
    let query = format!(
      "SELECT {select} FROM {} WHERE {clause} LIMIT 1",
      quote_identifier(&plan.table)
    );

    if let Some(found) = target.query_opt(&query, &params)? {
      return Ok(Some(found.get(0).as_integer()));
    }
  }
  Ok(None)
}

/// Next id not present in the target, from a running counter initialised
/// to `max(pk) + 1`. Each candidate is verified by a point lookup; the
/// search is bounded so a pathological table cannot loop forever.
fn allocate_free_id(
  target: &Session,
  plan: &MergePlan,
  pk_name: &str,
  next_free: &mut Option<i64>,
) -> Result<i64> {
  let mut counter = match *next_free {
    Some(value) => value,
    None => {
      let query = format!(
        "SELECT IFNULL(MAX({}), 0) + 1 FROM {}",
        quote_identifier(pk_name),
        quote_identifier(&plan.table)
      );
      target
        .query_opt(&query, &[])?
        .and_then(|r| r.get(0).as_integer())
        .unwrap_or(1)
    }
  };

  let mut found = None;
  for _ in 0..MAX_ID_ATTEMPTS {
    let candidate = counter;
    counter += 1;
    if !sql::contains_pk(target, &plan.table, pk_name, candidate)? {
      found = Some(candidate);
      break;
    }
  }
  *next_free = Some(counter);

  found.ok_or_else(|| {
    Error::MergeConflict(format!(
      "no free {} id after {MAX_ID_ATTEMPTS} attempts",
      plan.table
    ))
  })
}
