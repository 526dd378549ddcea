//! Media deduplication across source archives.
//!
//! Identity is the SHA-256 of the bytes; entry names are informational.
//! Sources are walked in caller order, so the first writer wins — both for
//! identical content under different names and for a name reused with
//! different content (the latter is dropped with a warning; a known
//! limitation of name-blind identity).

use std::collections::HashSet;

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::source::Source;

/// The deduplicated media set for the output archive, in first-seen order.
pub(crate) fn merge_media(sources: &[Source]) -> Vec<(String, Vec<u8>)> {
  let mut seen_hashes: HashSet<[u8; 32]> = HashSet::new();
  let mut seen_names: HashSet<String> = HashSet::new();
  let mut out = Vec::new();

  for source in sources {
    for (name, data) in &source.media {
      let hash: [u8; 32] = Sha256::digest(data).into();
      if !seen_hashes.insert(hash) {
        debug!(source = source.id.0, name, "duplicate media content");
        continue;
      }
      if !seen_names.insert(name.clone()) {
        warn!(
          source = source.id.0,
          name, "media name reused with different content; keeping first"
        );
        continue;
      }
      out.push((name.clone(), data.clone()));
    }
  }

  out
}
