//! Static schema knowledge for the backup database.
//!
//! The catalogue declares, for every known table: its primary-key column,
//! its semantic-identity rules (one or more alternative unique constraints),
//! its foreign keys, how primary-key conflicts are resolved, and which data
//! kind gates it. The merge engine is driven entirely by this table — there
//! is no string-based dynamic dispatch.
//!
//! Tables present in a database but absent from the catalogue are merged
//! with a synthesised plan: row-content identity, no foreign keys.

use crate::{
  config::MergeOptions,
  error::{Error, Result},
};

/// Column whose NULL and zero values are equivalent everywhere.
pub const MEPS_LANGUAGE: &str = "MepsLanguage";

/// The Location table, merged by its own two-phase resolver.
pub const LOCATION: &str = "Location";

/// Tables that must exist in every source database.
pub const REQUIRED_TABLES: &[&str] = &["LastModified", LOCATION];

// ─── Data kinds ──────────────────────────────────────────────────────────────

/// The user-facing category a table belongs to. Infrastructure tables are
/// always merged; the rest can be switched off per merge run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
  Infrastructure,
  Notes,
  Bookmarks,
  Highlights,
  Tags,
  InputFields,
  Playlists,
}

impl DataKind {
  /// Whether tables of this kind participate in the run.
  pub fn enabled(self, options: &MergeOptions) -> bool {
    match self {
      DataKind::Infrastructure => true,
      DataKind::Notes => options.notes,
      DataKind::Bookmarks => options.bookmarks,
      DataKind::Highlights => options.highlights,
      DataKind::Tags => options.tags,
      DataKind::InputFields => options.inputfields,
      DataKind::Playlists => options.playlists,
    }
  }
}

// ─── Policy declarations ─────────────────────────────────────────────────────

/// How a table resolves primary-key collisions between sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdStrategy {
  /// Monotonic surrogate ids: shift every id of a source by a per-source
  /// offset that advances past the source's maximum id.
  Offset,
  /// Keep the original id when it is free in the target; otherwise allocate
  /// the next free id from a running counter.
  NextFree,
}

/// One alternative unique constraint.
#[derive(Debug, Clone, Copy)]
pub enum IdentityRule {
  /// The named columns form the identity tuple. NULL equals NULL.
  Columns(&'static [&'static str]),
  /// Like [`IdentityRule::Columns`], but the rule only applies to rows
  /// where every named column is non-null. Used where a NULL column means
  /// "this rule's discriminator is absent", not "matches every other
  /// NULL" — the TagMap alternatives.
  ColumnsWhenPresent(&'static [&'static str]),
  /// Every column except the primary key forms the identity tuple.
  /// Resolved against the live schema at plan time.
  RowContent,
}

/// A foreign-key column and the table it references.
#[derive(Debug, Clone, Copy)]
pub struct ForeignKey {
  pub column:     &'static str,
  pub references: &'static str,
}

/// Everything the merge engine knows about one table, statically.
#[derive(Debug, Clone, Copy)]
pub struct TablePolicy {
  pub name:         &'static str,
  pub primary_key:  Option<&'static str>,
  pub identity:     &'static [IdentityRule],
  pub foreign_keys: &'static [ForeignKey],
  pub id_strategy:  IdStrategy,
  pub kind:         DataKind,
}

const fn fk(column: &'static str, references: &'static str) -> ForeignKey {
  ForeignKey { column, references }
}

/// The closed catalogue. Order here is the canonical merge order: referenced
/// tables come before their referrers.
pub const CATALOGUE: &[TablePolicy] = &[
  TablePolicy {
    name:         "LastModified",
    primary_key:  None,
    identity:     &[IdentityRule::RowContent],
    foreign_keys: &[],
    id_strategy:  IdStrategy::Offset,
    kind:         DataKind::Infrastructure,
  },
  TablePolicy {
    name:         "MigrationHistory",
    primary_key:  None,
    identity:     &[IdentityRule::Columns(&["Identifier"])],
    foreign_keys: &[],
    id_strategy:  IdStrategy::Offset,
    kind:         DataKind::Infrastructure,
  },
  TablePolicy {
    name:         "Accuracy",
    primary_key:  Some("AccuracyId"),
    identity:     &[IdentityRule::Columns(&["Description"])],
    foreign_keys: &[],
    id_strategy:  IdStrategy::NextFree,
    kind:         DataKind::Playlists,
  },
  // Location's identity depends on the row's own content and is handled by
  // the dedicated two-phase merger; the generic driver never touches it.
  TablePolicy {
    name:         LOCATION,
    primary_key:  Some("LocationId"),
    identity:     &[],
    foreign_keys: &[],
    id_strategy:  IdStrategy::NextFree,
    kind:         DataKind::Infrastructure,
  },
  TablePolicy {
    name:         "Tag",
    primary_key:  Some("TagId"),
    identity:     &[IdentityRule::Columns(&["Type", "Name"])],
    foreign_keys: &[],
    id_strategy:  IdStrategy::NextFree,
    kind:         DataKind::Tags,
  },
  TablePolicy {
    name:         "Media",
    primary_key:  Some("MediaId"),
    identity:     &[IdentityRule::Columns(&["FilePath"])],
    foreign_keys: &[],
    id_strategy:  IdStrategy::NextFree,
    kind:         DataKind::Playlists,
  },
  TablePolicy {
    name:         "Mark",
    primary_key:  Some("MarkId"),
    identity:     &[IdentityRule::Columns(&["MarkGuid"])],
    foreign_keys: &[fk("LocationId", LOCATION)],
    id_strategy:  IdStrategy::NextFree,
    kind:         DataKind::Highlights,
  },
  TablePolicy {
    name:         "Item",
    primary_key:  Some("ItemId"),
    identity:     &[IdentityRule::Columns(&["Label", "ThumbnailFilePath"])],
    foreign_keys: &[fk("AccuracyId", "Accuracy"), fk("MediaId", "Media")],
    id_strategy:  IdStrategy::NextFree,
    kind:         DataKind::Playlists,
  },
  TablePolicy {
    name:         "Bookmark",
    primary_key:  Some("BookmarkId"),
    identity:     &[IdentityRule::Columns(&[
      "LocationId",
      "PublicationLocationId",
    ])],
    foreign_keys: &[
      fk("LocationId", LOCATION),
      fk("PublicationLocationId", LOCATION),
    ],
    id_strategy:  IdStrategy::NextFree,
    kind:         DataKind::Bookmarks,
  },
  TablePolicy {
    name:         "Note",
    primary_key:  Some("NoteId"),
    identity:     &[IdentityRule::Columns(&["Guid"])],
    foreign_keys: &[fk("MarkId", "Mark"), fk("LocationId", LOCATION)],
    id_strategy:  IdStrategy::NextFree,
    kind:         DataKind::Notes,
  },
  TablePolicy {
    name:         "BlockRange",
    primary_key:  Some("BlockRangeId"),
    identity:     &[IdentityRule::RowContent],
    foreign_keys: &[fk("MarkId", "Mark")],
    id_strategy:  IdStrategy::Offset,
    kind:         DataKind::Highlights,
  },
  TablePolicy {
    name:         "ItemMarker",
    primary_key:  Some("ItemMarkerId"),
    identity:     &[IdentityRule::Columns(&["ItemId", "StartTimeTicks"])],
    foreign_keys: &[fk("ItemId", "Item")],
    id_strategy:  IdStrategy::NextFree,
    kind:         DataKind::Playlists,
  },
  TablePolicy {
    name:         "ItemLocationMap",
    primary_key:  Some("ItemLocationMapId"),
    identity:     &[IdentityRule::Columns(&["ItemId", "LocationId"])],
    foreign_keys: &[fk("ItemId", "Item"), fk("LocationId", LOCATION)],
    id_strategy:  IdStrategy::NextFree,
    kind:         DataKind::Playlists,
  },
  TablePolicy {
    name:         "ItemMediaMap",
    primary_key:  Some("ItemMediaMapId"),
    identity:     &[IdentityRule::Columns(&["ItemId", "MediaId"])],
    foreign_keys: &[fk("ItemId", "Item"), fk("MediaId", "Media")],
    id_strategy:  IdStrategy::NextFree,
    kind:         DataKind::Playlists,
  },
  TablePolicy {
    name:         "TagMap",
    primary_key:  Some("TagMapId"),
    identity:     &[
      IdentityRule::ColumnsWhenPresent(&["TagId", "Position"]),
      IdentityRule::ColumnsWhenPresent(&["TagId", "LocationId"]),
      IdentityRule::ColumnsWhenPresent(&["TagId", "NoteId"]),
    ],
    foreign_keys: &[
      fk("TagId", "Tag"),
      fk("LocationId", LOCATION),
      fk("NoteId", "Note"),
      fk("ItemId", "Item"),
    ],
    id_strategy:  IdStrategy::NextFree,
    kind:         DataKind::Tags,
  },
  TablePolicy {
    name:         "MarkerBibleVerseMap",
    primary_key:  Some("MarkerBibleVerseMapId"),
    identity:     &[IdentityRule::Columns(&["MarkerId", "VerseId"])],
    foreign_keys: &[fk("MarkerId", "ItemMarker")],
    id_strategy:  IdStrategy::NextFree,
    kind:         DataKind::Playlists,
  },
  TablePolicy {
    name:         "MarkerParagraphMap",
    primary_key:  Some("MarkerParagraphMapId"),
    identity:     &[IdentityRule::Columns(&[
      "MarkerId",
      "MepsDocumentId",
      "ParagraphIndex",
    ])],
    foreign_keys: &[fk("MarkerId", "ItemMarker")],
    id_strategy:  IdStrategy::NextFree,
    kind:         DataKind::Playlists,
  },
  TablePolicy {
    name:         "InputField",
    primary_key:  Some("InputFieldId"),
    identity:     &[IdentityRule::RowContent],
    foreign_keys: &[fk("LocationId", LOCATION)],
    id_strategy:  IdStrategy::Offset,
    kind:         DataKind::InputFields,
  },
];

/// Look up the policy for a known table.
pub fn policy(table: &str) -> Option<&'static TablePolicy> {
  CATALOGUE.iter().find(|p| p.name == table)
}

// ─── Resolved plans ──────────────────────────────────────────────────────────

/// A foreign key resolved against a live table: the column's index in the
/// row, plus what it references.
#[derive(Debug, Clone)]
pub struct ResolvedFk {
  pub column:     String,
  pub index:      usize,
  pub references: String,
}

/// One identity rule bound to column indexes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityPlan {
  pub columns:      Vec<usize>,
  /// When set, the rule is skipped for rows where any of its columns is
  /// NULL instead of treating NULL as a matchable value.
  pub when_present: bool,
}

/// A table policy bound to the columns of an actual database, ready to
/// drive the generic row merger.
#[derive(Debug, Clone)]
pub struct MergePlan {
  pub table:       String,
  pub columns:     Vec<String>,
  /// Primary-key column name and its index, if the table has a surrogate id.
  pub primary_key: Option<(String, usize)>,
  /// Alternative identity rules, in declared order; first match wins.
  pub identity:    Vec<IdentityPlan>,
  pub foreign_keys: Vec<ResolvedFk>,
  pub id_strategy: IdStrategy,
}

impl MergePlan {
  /// Bind a catalogue policy to the live column list of its table.
  pub fn resolve(policy: &TablePolicy, columns: &[String]) -> Result<Self> {
    let index_of = |name: &str| -> Result<usize> {
      columns.iter().position(|c| c == name).ok_or_else(|| {
        Error::MissingColumn {
          table:  policy.name.to_owned(),
          column: name.to_owned(),
        }
      })
    };

    let primary_key = match policy.primary_key {
      Some(pk) => {
        let index =
          index_of(pk).map_err(|_| Error::MissingPrimaryKey {
            table:  policy.name.to_owned(),
            column: pk.to_owned(),
          })?;
        Some((pk.to_owned(), index))
      }
      None => None,
    };

    let mut identity = Vec::with_capacity(policy.identity.len());
    for rule in policy.identity {
      identity.push(match rule {
        IdentityRule::Columns(names) => IdentityPlan {
          columns:      names
            .iter()
            .map(|n| index_of(n))
            .collect::<Result<Vec<_>>>()?,
          when_present: false,
        },
        IdentityRule::ColumnsWhenPresent(names) => IdentityPlan {
          columns:      names
            .iter()
            .map(|n| index_of(n))
            .collect::<Result<Vec<_>>>()?,
          when_present: true,
        },
        IdentityRule::RowContent => IdentityPlan {
          columns:      content_columns(columns, &primary_key),
          when_present: false,
        },
      });
    }

    let mut foreign_keys = Vec::with_capacity(policy.foreign_keys.len());
    for f in policy.foreign_keys {
      foreign_keys.push(ResolvedFk {
        column:     f.column.to_owned(),
        index:      index_of(f.column)?,
        references: f.references.to_owned(),
      });
    }

    Ok(Self {
      table: policy.name.to_owned(),
      columns: columns.to_vec(),
      primary_key,
      identity,
      foreign_keys,
      id_strategy: policy.id_strategy,
    })
  }

  /// Plan for a table the catalogue does not know: row-content identity,
  /// no foreign keys, offset ids. `primary_key` comes from `PRAGMA
  /// table_info` when the table declares a single integer key.
  pub fn synthesise(
    table: &str,
    columns: &[String],
    primary_key: Option<String>,
  ) -> Self {
    let primary_key = primary_key.and_then(|pk| {
      columns.iter().position(|c| *c == pk).map(|i| (pk, i))
    });
    let identity = vec![IdentityPlan {
      columns:      content_columns(columns, &primary_key),
      when_present: false,
    }];

    Self {
      table: table.to_owned(),
      columns: columns.to_vec(),
      primary_key,
      identity,
      foreign_keys: Vec::new(),
      id_strategy: IdStrategy::Offset,
    }
  }
}

fn content_columns(
  columns: &[String],
  primary_key: &Option<(String, usize)>,
) -> Vec<usize> {
  let pk = primary_key.as_ref().map(|(_, index)| *index);
  (0..columns.len()).filter(|i| Some(*i) != pk).collect()
}
