//! The merge pipeline.
//!
//! One-shot: the caller hands archive bytes in, the orchestrator returns
//! an output archive plus validation report, or an error. Any failure
//! discards the partially populated target (RAII on the scratch session);
//! no archive is produced.

use chrono::Local;
use sha2::{Digest, Sha256};
use tracing::info;

use folio_archive::{ARCHIVE_EXT, Archive, MergedManifest};
use folio_core::{
  IdRegistry, NoTrace, SourceId, TraceSink,
  schema::{self, MergePlan},
};
use folio_db::Session;

use crate::{
  MergeConfig, MergeOutput,
  error::{Error, Result},
  location, media, rows,
  source::Source,
  validate,
};

pub(crate) fn run(
  source_bytes: &[Vec<u8>],
  config: MergeConfig,
) -> Result<MergeOutput> {
  let MergeConfig { options, progress, cancel, mut trace } = config;

  let report = |message: &str, percent: u8| {
    if let Some(sink) = &progress {
      sink.report(message, percent);
    }
  };
  let check_cancel = || -> Result<()> {
    match &cancel {
      Some(token) if token.is_cancelled() => Err(Error::Cancelled),
      _ => Ok(()),
    }
  };
  let mut no_trace = NoTrace;
  let trace: &mut dyn TraceSink = match trace.as_deref_mut() {
    Some(sink) => sink,
    None => &mut no_trace,
  };

  // 0. Input checks, before anything is opened.
  if source_bytes.len() < 2 {
    return Err(Error::InputInvalid(format!(
      "need at least two source archives, got {}",
      source_bytes.len()
    )));
  }
  if let Some(limit) = options.size_limit_bytes {
    let actual: u64 = source_bytes.iter().map(|b| b.len() as u64).sum();
    if actual > limit {
      return Err(Error::InputTooLarge { actual, limit });
    }
  }

  // 1–2. Open and validate every source.
  report("Opening source archives", 5);
  let mut sources = Vec::with_capacity(source_bytes.len());
  for (index, bytes) in source_bytes.iter().enumerate() {
    check_cancel()?;
    sources.push(Source::open(SourceId(index), bytes)?);
  }

  // 3. Fresh target with source-0 schema applied verbatim.
  report("Preparing target database", 10);
  let target =
    Session::create_scratch().map_err(|e| Error::Internal(e.to_string()))?;
  for ddl in sources[0].session.schema_ddl()? {
    target.create_table(&ddl)?;
  }

  // 4. Run-scoped registry.
  let mut registry = IdRegistry::new();
  registry.clear();

  // 5. Location first; everything else points at it.
  check_cancel()?;
  report("Merging locations", 15);
  location::merge_locations(&sources, &target, &mut registry, trace)?;

  // 6. Remaining tables in dependency order, then unknown tables.
  let target_tables = target.tables()?;
  let known: Vec<&schema::TablePolicy> = schema::CATALOGUE
    .iter()
    .filter(|p| p.name != schema::LOCATION)
    .filter(|p| target_tables.iter().any(|t| t == p.name))
    .collect();
  let unknown: Vec<String> = target_tables
    .iter()
    .filter(|t| schema::policy(t).is_none())
    .cloned()
    .collect();
  let total = (known.len() + unknown.len()).max(1);

  let mut step = 0usize;
  for policy in &known {
    check_cancel()?;
    step += 1;
    report(
      &format!("Merging {}", policy.name),
      (20 + step * 60 / total) as u8,
    );
    if !policy.kind.enabled(&options) {
      info!(table = policy.name, "skipped by configuration");
      continue;
    }
    let columns = target.column_names(policy.name)?;
    let plan = MergePlan::resolve(policy, &columns)?;
    rows::merge_table(
      &plan,
      &sources,
      &target,
      &mut registry,
      trace,
      cancel.as_ref(),
    )?;
  }
  for table in &unknown {
    check_cancel()?;
    step += 1;
    report(&format!("Merging {table}"), (20 + step * 60 / total) as u8);
    let columns = target.column_names(table)?;
    let primary_key = target.single_integer_pk(table)?;
    let plan = MergePlan::synthesise(table.as_str(), &columns, primary_key);
    rows::merge_table(
      &plan,
      &sources,
      &target,
      &mut registry,
      trace,
      cancel.as_ref(),
    )?;
  }

  // 7. Media dedup by content hash.
  check_cancel()?;
  report("Merging media", 85);
  let media_entries = media::merge_media(&sources);

  // 8. Export, compose the manifest, assemble the container.
  report("Assembling output archive", 90);
  let database = target.export()?;
  let database_hash = hex::encode(Sha256::digest(&database));
  let now = Local::now();
  let filename =
    format!("merged-library-{}.{ARCHIVE_EXT}", now.format("%Y-%m-%d"));
  let manifest = MergedManifest {
    name: format!("merged-library-{}", now.format("%Y-%m-%d")),
    now,
    database_hash,
    schema_version: sources[0].manifest.user_data_backup.schema_version,
  }
  .compose();
  let manifest_bytes =
    manifest.to_json().map_err(|e| Error::Internal(e.to_string()))?;
  let archive = Archive::write(&manifest_bytes, &database, &media_entries)
    .map_err(|e| Error::Internal(e.to_string()))?;

  // 9. Read-only integrity checks on the result.
  report("Validating", 97);
  let validation = validate::validate(&target, &registry)?;
  if !validation.is_clean() {
    info!(
      orphaned_marks = validation.orphaned_marks,
      orphaned_notes = validation.orphaned_notes,
      duplicate_locations = validation.duplicate_locations,
      "merge completed with warnings"
    );
  }

  report("Merge complete", 100);
  Ok(MergeOutput { archive, filename, validation })
}
