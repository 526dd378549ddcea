//! The Folio merge engine.
//!
//! Merges two or more reading-app backup archives into one: the output
//! database is the union of the inputs with duplicates collapsed by
//! semantic identity, every foreign key rewritten to the surviving row,
//! and media blobs deduplicated by content hash.
//!
//! # Quick start
//!
//! ```no_run
//! use folio_merge::{MergeConfig, merge};
//!
//! let a = std::fs::read("a.jwlibrary").unwrap();
//! let b = std::fs::read("b.jwlibrary").unwrap();
//!
//! let output = merge(&[a, b], MergeConfig::default()).unwrap();
//! std::fs::write(&output.filename, &output.archive).unwrap();
//! assert!(output.validation.is_clean());
//! ```

mod location;
mod media;
mod rows;
mod run;
mod source;
mod sql;
mod validate;

pub mod error;

pub use error::{Error, Result};
pub use folio_core::{
  CancelToken, MergeEvent, MergeOptions, NoProgress, NoTrace, ProgressSink,
  TraceSink, ValidationReport, VecTrace,
};

/// Everything configurable about one merge run.
///
/// The sinks are called from the merge thread and must not block; the
/// engine takes no dependency on their behaviour.
#[derive(Default)]
pub struct MergeConfig {
  pub options:  MergeOptions,
  pub progress: Option<Box<dyn ProgressSink>>,
  pub cancel:   Option<CancelToken>,
  pub trace:    Option<Box<dyn TraceSink>>,
}

/// A successful merge: the output archive, its suggested filename, and
/// the validation report (which may still carry non-fatal warnings).
#[derive(Debug)]
pub struct MergeOutput {
  pub archive:    Vec<u8>,
  /// `merged-library-<YYYY-MM-DD>.jwlibrary`.
  pub filename:   String,
  pub validation: ValidationReport,
}

/// Merge `sources` (at least two, in caller order) into one archive.
///
/// Single-threaded and strictly sequential; call from a background
/// context. On failure the partially built target is discarded and no
/// archive is produced.
pub fn merge(
  sources: &[Vec<u8>],
  config: MergeConfig,
) -> Result<MergeOutput> {
  run::run(sources, config)
}
