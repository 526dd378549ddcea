//! The two-phase Location merger.
//!
//! Location is the one table with two alternative unique constraints whose
//! applicability depends on the row's own content. A one-pass insert that
//! reassigns ids per source cannot know that a later source holds a
//! different row under an id the first pass already burned, so identity is
//! fixed globally before any id is committed:
//!
//! 1. *Global scan* — every row of every source, in order, gets an
//!    identity signature and a pointer to the signature's first
//!    occurrence.
//! 2. *Insert* — rows are replayed in the same order; first occurrences
//!    are inserted (keeping their id when free, else taking the smallest
//!    free id above it), later occurrences only record a mapping to the
//!    first occurrence's final id.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use folio_core::{
  Datum, IdRegistry, MergeEvent, Row, SourceId, TraceSink,
  schema::{LOCATION, MEPS_LANGUAGE},
  signature,
};
use folio_db::Session;

use crate::{
  error::{Error, Result},
  source::Source,
  sql,
};

// ─── Identity ────────────────────────────────────────────────────────────────

/// Indexes of the columns the identity rules read, resolved against the
/// live schema.
struct LocationColumns {
  all:        Vec<String>,
  pk:         usize,
  book:       usize,
  chapter:    usize,
  document:   usize,
  track:      usize,
  issue:      usize,
  key_symbol: usize,
  language:   usize,
  loc_type:   usize,
}

impl LocationColumns {
  fn resolve(columns: Vec<String>) -> Result<Self> {
    let index = |name: &str| -> Result<usize> {
      columns.iter().position(|c| c == name).ok_or_else(|| {
        Error::BadDatabase(format!("Location has no column {name}"))
      })
    };
    Ok(Self {
      pk:         index("LocationId")?,
      book:       index("BookNumber")?,
      chapter:    index("ChapterNumber")?,
      document:   index("DocumentId")?,
      track:      index("Track")?,
      issue:      index("IssueTagNumber")?,
      key_symbol: index("KeySymbol")?,
      language:   index(MEPS_LANGUAGE)?,
      loc_type:   index("Type")?,
      all:        columns,
    })
  }
}

/// The identity signature of one Location row.
///
/// A row with `Type = 0` and non-null, non-zero book and chapter numbers
/// is a Bible chapter; anything else is a publication or document
/// reference. The two rules never collide: signatures carry a rule prefix.
fn location_signature(columns: &LocationColumns, row: &Row) -> String {
  let pair =
    |index: usize| (columns.all[index].as_str(), row.get(index));

  let is_bible_chapter = row.get(columns.loc_type).as_integer() == Some(0)
    && !row.get(columns.book).is_null_or_zero()
    && !row.get(columns.chapter).is_null_or_zero();

  if is_bible_chapter {
    let tuple = signature::signature([
      pair(columns.book),
      pair(columns.chapter),
      pair(columns.key_symbol),
      pair(columns.language),
      pair(columns.loc_type),
    ]);
    format!("bible|{tuple}")
  } else {
    let tuple = signature::signature([
      pair(columns.key_symbol),
      pair(columns.issue),
      pair(columns.language),
      pair(columns.document),
      pair(columns.track),
      pair(columns.loc_type),
    ]);
    format!("pub|{tuple}")
  }
}

/// Signatures of every row in the target's Location table — used by the
/// integrity validator to count residual collisions.
pub(crate) fn target_signatures(target: &Session) -> Result<Vec<String>> {
  let columns = LocationColumns::resolve(target.column_names(LOCATION)?)?;
  let rows = sql::read_rows(
    target,
    LOCATION,
    &columns.all,
    Some("LocationId"),
  )?;
  Ok(rows.iter().map(|r| location_signature(&columns, r)).collect())
}

// ─── Two-phase merge ─────────────────────────────────────────────────────────

struct Collected {
  source:   SourceId,
  original: i64,
  row:      Row,
  /// Index of the signature's first occurrence in the collected list.
  first:    usize,
}

/// Merge the Location tables of every source into the target.
pub(crate) fn merge_locations(
  sources: &[Source],
  target: &Session,
  registry: &mut IdRegistry,
  trace: &mut dyn TraceSink,
) -> Result<()> {
  let columns = LocationColumns::resolve(target.column_names(LOCATION)?)?;

  // Phase 1 — global scan. Identity is fixed before any id is committed.
  let mut first_seen: HashMap<String, usize> = HashMap::new();
  let mut collected: Vec<Collected> = Vec::new();

  for source in sources {
    let rows = sql::read_rows(
      &source.session,
      LOCATION,
      &columns.all,
      Some("LocationId"),
    )?;
    for row in rows {
      let original =
        row.get(columns.pk).as_integer().ok_or_else(|| {
          Error::BadDatabase(format!(
            "source {} has a Location row without an integer id",
            source.id.0
          ))
        })?;
      let sig = location_signature(&columns, &row);
      let first = *first_seen.entry(sig).or_insert(collected.len());
      collected.push(Collected { source: source.id, original, row, first });
    }
  }

  debug!(
    rows = collected.len(),
    distinct = first_seen.len(),
    "location scan complete"
  );

  // Phase 2 — ordered insert with global id reassignment.
  let insert_sql = sql::insert_or_ignore_sql(LOCATION, &columns.all);
  let mut used: HashSet<i64> = HashSet::new();
  let mut finals: Vec<Option<i64>> = vec![None; collected.len()];

  for index in 0..collected.len() {
    let item = &collected[index];

    if item.first != index {
      // A later occurrence: map to the survivor, skip the insert — even
      // when the ids happen to be equal.
      let survivor = finals[item.first].ok_or_else(|| {
        Error::Internal("location survivor not yet inserted".to_owned())
      })?;
      registry.record(item.source, LOCATION, item.original, survivor);
      trace.event(MergeEvent::Duplicate {
        table:    LOCATION.to_owned(),
        original: item.original,
        survivor,
      });
      continue;
    }

    let final_id = if used.contains(&item.original) {
      next_free_above(&used, item.original)
    } else {
      item.original
    };

    let mut values = item.row.values.clone();
    values[columns.pk] = Datum::Integer(final_id);
    target.exec(&insert_sql, &values)?;

    // The external SQL call succeeding is not evidence enough; a mapping
    // must never point at a row that is not there.
    if !sql::contains_pk(target, LOCATION, "LocationId", final_id)? {
      return Err(Error::MergeConflict(format!(
        "Location insert for source {} id {} (final {final_id}) \
         did not land",
        item.source.0, item.original
      )));
    }

    used.insert(final_id);
    finals[index] = Some(final_id);
    if final_id != item.original {
      registry.record(item.source, LOCATION, item.original, final_id);
    }
    trace.event(MergeEvent::Inserted {
      table:    LOCATION.to_owned(),
      original: item.original,
      new:      final_id,
    });
  }

  Ok(())
}

/// Smallest integer above `original` not yet taken.
fn next_free_above(used: &HashSet<i64>, original: i64) -> i64 {
  let mut candidate = original + 1;
  while used.contains(&candidate) {
    candidate += 1;
  }
  candidate
}

#[cfg(test)]
mod tests {
  use super::*;

  fn columns() -> LocationColumns {
    LocationColumns::resolve(vec![
      "LocationId".to_owned(),
      "BookNumber".to_owned(),
      "ChapterNumber".to_owned(),
      "DocumentId".to_owned(),
      "Track".to_owned(),
      "IssueTagNumber".to_owned(),
      "KeySymbol".to_owned(),
      "MepsLanguage".to_owned(),
      "Type".to_owned(),
      "Title".to_owned(),
    ])
    .unwrap()
  }

  fn row(
    id: i64,
    book: Option<i64>,
    chapter: Option<i64>,
    document: Option<i64>,
    key_symbol: &str,
    language: Option<i64>,
    loc_type: i64,
  ) -> Row {
    Row::new(vec![
      Datum::Integer(id),
      book.into(),
      chapter.into(),
      document.into(),
      Datum::Null,
      Datum::Integer(0),
      key_symbol.into(),
      language.into(),
      Datum::Integer(loc_type),
      Datum::Null,
    ])
  }

  #[test]
  fn bible_chapter_and_publication_rules_do_not_collide() {
    let cols = columns();
    let bible = row(1, Some(1), Some(1), None, "nwt", Some(0), 0);
    let publication = row(2, None, None, Some(77), "nwt", Some(0), 0);

    let sig_bible = location_signature(&cols, &bible);
    let sig_pub = location_signature(&cols, &publication);
    assert!(sig_bible.starts_with("bible|"));
    assert!(sig_pub.starts_with("pub|"));
    assert_ne!(sig_bible, sig_pub);
  }

  #[test]
  fn chapter_signature_ignores_document_and_issue() {
    let cols = columns();
    let a = row(1, Some(1), Some(3), Some(100), "nwt", Some(0), 0);
    let b = row(9, Some(1), Some(3), Some(999), "nwt", Some(0), 0);
    assert_eq!(
      location_signature(&cols, &a),
      location_signature(&cols, &b)
    );
  }

  #[test]
  fn meps_language_null_and_zero_are_one_signature() {
    let cols = columns();
    let with_null = row(1, Some(40), Some(5), None, "nwt", None, 0);
    let with_zero = row(2, Some(40), Some(5), None, "nwt", Some(0), 0);
    assert_eq!(
      location_signature(&cols, &with_null),
      location_signature(&cols, &with_zero)
    );
  }

  #[test]
  fn zero_book_number_falls_through_to_publication_rule() {
    let cols = columns();
    let zero_book = row(1, Some(0), Some(3), Some(42), "w24", None, 0);
    assert!(location_signature(&cols, &zero_book).starts_with("pub|"));
  }

  #[test]
  fn non_zero_type_is_a_publication_even_with_chapters() {
    let cols = columns();
    let audio = row(1, Some(1), Some(3), None, "nwt", None, 2);
    assert!(location_signature(&cols, &audio).starts_with("pub|"));
  }

  #[test]
  fn next_free_above_skips_burned_ids() {
    let used: HashSet<i64> = [1076, 1077, 1079].into_iter().collect();
    assert_eq!(next_free_above(&used, 1076), 1078);
    assert_eq!(next_free_above(&used, 1079), 1080);
    assert_eq!(next_free_above(&used, 500), 501);
  }
}
