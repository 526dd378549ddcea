//! An opened source archive: manifest, database session, media entries.

use folio_archive::{Archive, Manifest};
use folio_core::SourceId;
use folio_db::Session;

use crate::error::{Error, Result};

/// One source, fully opened and validated, ready to merge from.
///
/// The session is treated as read-only; it is closed when the source is
/// dropped, on every exit path.
pub struct Source {
  pub id:       SourceId,
  pub manifest: Manifest,
  pub session:  Session,
  /// Media entries in container order.
  pub media:    Vec<(String, Vec<u8>)>,
}

impl Source {
  /// Decode archive bytes into an opened source.
  pub fn open(id: SourceId, bytes: &[u8]) -> Result<Self> {
    let archive = Archive::read(bytes).map_err(Error::BadContainer)?;

    let manifest =
      Manifest::parse(&archive.manifest).map_err(Error::BadManifest)?;

    let session = Session::open_bytes(&archive.database)
      .map_err(|e| Error::BadDatabase(e.to_string()))?;

    let source = Self { id, manifest, session, media: archive.entries };
    source.check_required_tables()?;
    Ok(source)
  }

  fn check_required_tables(&self) -> Result<()> {
    let tables = self
      .session
      .tables()
      .map_err(|e| Error::BadDatabase(e.to_string()))?;
    for required in folio_core::schema::REQUIRED_TABLES {
      if !tables.iter().any(|t| t == required) {
        return Err(Error::BadDatabase(format!(
          "source {} is missing required table {required}",
          self.id.0
        )));
      }
    }
    Ok(())
  }

  /// Whether this source's database contains `table`.
  pub fn has_table(&self, table: &str) -> Result<bool> {
    Ok(self.session.tables()?.iter().any(|t| t == table))
  }
}
