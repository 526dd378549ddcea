//! The post-merge validation report.

use std::collections::BTreeMap;

use serde::Serialize;

/// One orphaned foreign-key reference, for the report's sample list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanSample {
  pub table:   String,
  /// Primary key of the row holding the dangling reference.
  pub row:     i64,
  pub column:  String,
  /// The referenced primary key that does not exist.
  pub missing: i64,
}

/// Read-only integrity summary produced after a merge.
///
/// A non-empty report is a warning, not a failure: the archive was still
/// produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
  /// `Mark` rows whose `LocationId` does not exist in `Location`.
  pub orphaned_marks:      u64,
  /// `Note` rows whose non-null `LocationId` does not exist.
  pub orphaned_notes:      u64,
  /// Location identity signatures appearing more than once. Must be zero.
  pub duplicate_locations: u64,
  /// Row counts per major table.
  pub table_counts:        BTreeMap<String, u64>,
  /// ID-registry mapping counts per table.
  pub mapping_counts:      BTreeMap<String, usize>,
  /// Up to ten samples per orphan class.
  pub orphan_samples:      Vec<OrphanSample>,
}

impl ValidationReport {
  /// True when no orphan or duplicate counter fired.
  pub fn is_clean(&self) -> bool {
    self.orphaned_marks == 0
      && self.orphaned_notes == 0
      && self.duplicate_locations == 0
  }
}
