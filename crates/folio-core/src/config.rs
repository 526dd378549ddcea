//! Per-run merge options.

use serde::{Deserialize, Serialize};

/// Which data kinds a merge run includes, plus resource limits.
///
/// Everything defaults to included. Infrastructure tables (`Location`,
/// `LastModified`, `MigrationHistory`) are merged regardless of flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeOptions {
  pub notes:       bool,
  pub bookmarks:   bool,
  pub highlights:  bool,
  pub tags:        bool,
  pub inputfields: bool,
  pub playlists:   bool,

  /// Reject the run up front when the combined input exceeds this many
  /// bytes. `None` means no cap.
  pub size_limit_bytes: Option<u64>,
}

impl Default for MergeOptions {
  fn default() -> Self {
    Self {
      notes:       true,
      bookmarks:   true,
      highlights:  true,
      tags:        true,
      inputfields: true,
      playlists:   true,

      size_limit_bytes: None,
    }
  }
}
