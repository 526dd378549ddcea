//! The ID mapping registry.
//!
//! One registry is owned by the orchestrator for the duration of a merge
//! run. It records, for rows whose primary key changed or collapsed into a
//! survivor, where the row ended up in the target. Foreign-key rewriting
//! consults it; a miss means "identity".
//!
//! Original ids are only meaningful relative to the database they came
//! from, and two sources can map the same original id to different
//! survivors, so every entry is qualified by the row's [`SourceId`] — the
//! origin each in-transit row carries through the pipeline.

use std::collections::HashMap;

/// Index of a source database within the run, in caller order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(pub usize);

#[derive(Debug, Default)]
pub struct IdRegistry {
  /// table → (source, original id) → surviving id.
  maps: HashMap<String, HashMap<(SourceId, i64), i64>>,
}

impl IdRegistry {
  pub fn new() -> Self { Self::default() }

  /// Record that `original` from `source` survives as `new` in the target.
  ///
  /// Callers record only after the insert is verified; a later record for
  /// the same key replaces the earlier one.
  pub fn record(
    &mut self,
    source: SourceId,
    table: &str,
    original: i64,
    new: i64,
  ) {
    self
      .maps
      .entry(table.to_owned())
      .or_default()
      .insert((source, original), new);
  }

  /// The surviving id for `original` from `source`, if one was recorded.
  pub fn lookup(
    &self,
    source: SourceId,
    table: &str,
    original: i64,
  ) -> Option<i64> {
    self.maps.get(table)?.get(&(source, original)).copied()
  }

  /// Drop every mapping. Called once at the start of a run.
  pub fn clear(&mut self) { self.maps.clear(); }

  /// Number of mappings recorded for one table, across all sources.
  pub fn table_len(&self, table: &str) -> usize {
    self.maps.get(table).map(HashMap::len).unwrap_or(0)
  }

  /// Per-table mapping counts, for the validation report.
  pub fn table_sizes(&self) -> impl Iterator<Item = (&str, usize)> {
    self.maps.iter().map(|(t, m)| (t.as_str(), m.len()))
  }

  pub fn len(&self) -> usize { self.maps.values().map(HashMap::len).sum() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}
