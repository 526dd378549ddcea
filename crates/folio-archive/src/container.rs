//! Reading and writing the ZIP container.

use std::io::{Cursor, Read as _, Write as _};

use zip::{
  CompressionMethod, ZipArchive, ZipWriter, write::SimpleFileOptions,
};

use crate::error::{Error, Result};

/// Required manifest entry name.
pub const MANIFEST_ENTRY: &str = "manifest.json";

/// Required database entry name.
pub const DATABASE_ENTRY: &str = "userData.db";

/// Canonical file extension for backup archives.
pub const ARCHIVE_EXT: &str = "jwlibrary";

/// The decoded contents of one backup container.
#[derive(Debug, Clone)]
pub struct Archive {
  pub manifest: Vec<u8>,
  pub database: Vec<u8>,
  /// Every other entry, in container order. Treated as opaque media.
  pub entries:  Vec<(String, Vec<u8>)>,
}

impl Archive {
  /// Decode a container from raw bytes.
  ///
  /// Fails with [`Error::MissingEntry`] when the manifest or database is
  /// absent, and with [`Error::Zip`] on a malformed stream.
  pub fn read(bytes: &[u8]) -> Result<Self> {
    let mut zip = ZipArchive::new(Cursor::new(bytes))?;

    let mut manifest = None;
    let mut database = None;
    let mut entries = Vec::new();

    for index in 0..zip.len() {
      let mut entry = zip.by_index(index)?;
      if entry.is_dir() {
        continue;
      }

      let name = entry.name().to_owned();
      let mut data = Vec::with_capacity(entry.size() as usize);
      entry.read_to_end(&mut data)?;

      match name.as_str() {
        MANIFEST_ENTRY => manifest = Some(data),
        DATABASE_ENTRY => database = Some(data),
        _ => entries.push((name, data)),
      }
    }

    Ok(Self {
      manifest: manifest.ok_or(Error::MissingEntry(MANIFEST_ENTRY))?,
      database: database.ok_or(Error::MissingEntry(DATABASE_ENTRY))?,
      entries,
    })
  }

  /// Assemble a container from a manifest, a database blob, and media
  /// entries, compressed with DEFLATE.
  pub fn write(
    manifest: &[u8],
    database: &[u8],
    entries: &[(String, Vec<u8>)],
  ) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
      .compression_method(CompressionMethod::Deflated);

    zip.start_file(MANIFEST_ENTRY, options)?;
    zip.write_all(manifest)?;

    zip.start_file(DATABASE_ENTRY, options)?;
    zip.write_all(database)?;

    for (name, data) in entries {
      zip.start_file(name.as_str(), options)?;
      zip.write_all(data)?;
    }

    Ok(zip.finish()?.into_inner())
  }
}
