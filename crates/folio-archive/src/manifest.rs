//! The `manifest.json` wire format.
//!
//! Timestamps are ISO-8601 local datetimes with a numeric offset, e.g.
//! `2024-06-03T12:34:56+0200`. The backup hash is the lowercase hex
//! SHA-256 of the exact `userData.db` bytes.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Schema version assumed when a source manifest omits one.
pub const DEFAULT_SCHEMA_VERSION: i64 = 14;

const MANIFEST_VERSION: i64 = 1;
const MERGED_DEVICE_NAME: &str = "Merged Library";

/// Top level of `manifest.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
  pub name:             String,
  pub creation_date:    String,
  pub version:          i64,
  #[serde(rename = "type")]
  pub backup_type:      i64,
  pub user_data_backup: UserDataBackup,
}

/// The `userDataBackup` object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDataBackup {
  pub last_modified_date: String,
  pub database_name:      String,
  pub device_name:        String,
  /// Lowercase hex SHA-256 of the database entry's bytes.
  pub hash:               String,
  #[serde(default = "default_schema_version")]
  pub schema_version:     i64,
}

fn default_schema_version() -> i64 { DEFAULT_SCHEMA_VERSION }

impl Manifest {
  /// Parse a manifest from the container's `manifest.json` bytes.
  pub fn parse(bytes: &[u8]) -> Result<Self> {
    Ok(serde_json::from_slice(bytes)?)
  }

  pub fn to_json(&self) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(self)?)
  }
}

/// Inputs for composing the output archive's manifest.
#[derive(Debug, Clone)]
pub struct MergedManifest {
  pub name:           String,
  pub now:            DateTime<Local>,
  /// Lowercase hex SHA-256 of the merged database bytes.
  pub database_hash:  String,
  /// Copied from the first source's manifest.
  pub schema_version: i64,
}

impl MergedManifest {
  pub fn compose(&self) -> Manifest {
    let stamp = format_timestamp(self.now);
    Manifest {
      name:             self.name.clone(),
      creation_date:    stamp.clone(),
      version:          MANIFEST_VERSION,
      backup_type:      0,
      user_data_backup: UserDataBackup {
        last_modified_date: stamp,
        database_name:      crate::DATABASE_ENTRY.to_owned(),
        device_name:        MERGED_DEVICE_NAME.to_owned(),
        hash:               self.database_hash.clone(),
        schema_version:     self.schema_version,
      },
    }
  }
}

/// `2024-06-03T12:34:56+0200` — local datetime with numeric offset.
pub fn format_timestamp(dt: DateTime<Local>) -> String {
  dt.format("%Y-%m-%dT%H:%M:%S%z").to_string()
}
