//! `folio` — merge reading-app backup archives from the command line.
//!
//! # Usage
//!
//! ```
//! folio a.jwlibrary b.jwlibrary
//! folio a.jwlibrary b.jwlibrary -o merged.jwlibrary --no-playlists
//! folio --config merge.toml backups/*.jwlibrary --report-json
//! ```

use std::path::PathBuf;

use anyhow::{Context as _, bail};
use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use folio_archive::ARCHIVE_EXT;
use folio_core::{MergeOptions, ProgressSink};
use folio_merge::{MergeConfig, merge};

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
  name = "folio",
  version,
  about = "Merge reading-app backup archives into one"
)]
struct Args {
  /// Source archives, merged in the order given (at least two).
  #[arg(required = true, num_args = 2..)]
  sources: Vec<PathBuf>,

  /// Output path (default: merged-library-<date>.jwlibrary in the
  /// current directory).
  #[arg(short, long, value_name = "FILE")]
  output: Option<PathBuf>,

  /// Path to a TOML file with merge options (flags below override it).
  #[arg(long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Leave notes out of the merge.
  #[arg(long)]
  no_notes: bool,

  /// Leave bookmarks out of the merge.
  #[arg(long)]
  no_bookmarks: bool,

  /// Leave highlights out of the merge.
  #[arg(long)]
  no_highlights: bool,

  /// Leave tags out of the merge.
  #[arg(long)]
  no_tags: bool,

  /// Leave input fields out of the merge.
  #[arg(long)]
  no_inputfields: bool,

  /// Leave playlists out of the merge.
  #[arg(long)]
  no_playlists: bool,

  /// Reject inputs whose combined size exceeds this many MiB.
  #[arg(long, value_name = "MIB")]
  size_limit_mib: Option<u64>,

  /// Print the validation report as JSON on stdout.
  #[arg(long)]
  report_json: bool,

  /// Suppress progress output.
  #[arg(short, long)]
  quiet: bool,
}

// ─── Progress ─────────────────────────────────────────────────────────────────

/// Progress on stderr so stdout stays parseable.
struct StderrProgress;

impl ProgressSink for StderrProgress {
  fn report(&self, message: &str, percent: u8) {
    eprintln!("[{percent:>3}%] {message}");
  }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();
  let options = resolve_options(&args)?;

  // Reject unexpected extensions before reading anything.
  for path in &args.sources {
    let extension = path.extension().and_then(|e| e.to_str());
    if extension != Some(ARCHIVE_EXT) {
      bail!(
        "unexpected extension on {}: expected .{ARCHIVE_EXT}",
        path.display()
      );
    }
  }

  let mut sources = Vec::with_capacity(args.sources.len());
  for path in &args.sources {
    let bytes = std::fs::read(path)
      .with_context(|| format!("reading {}", path.display()))?;
    sources.push(bytes);
  }

  let config = MergeConfig {
    options,
    progress: (!args.quiet)
      .then(|| Box::new(StderrProgress) as Box<dyn ProgressSink>),
    cancel: None,
    trace: None,
  };

  let output = merge(&sources, config).context("merge failed")?;

  let path = args
    .output
    .clone()
    .unwrap_or_else(|| PathBuf::from(&output.filename));
  std::fs::write(&path, &output.archive)
    .with_context(|| format!("writing {}", path.display()))?;

  if args.report_json {
    println!("{}", serde_json::to_string_pretty(&output.validation)?);
  } else {
    print_summary(&path, &output.validation);
  }

  Ok(())
}

/// Options from the TOML file (if any), overridden by CLI flags.
fn resolve_options(args: &Args) -> anyhow::Result<MergeOptions> {
  let mut options: MergeOptions = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    MergeOptions::default()
  };

  if args.no_notes {
    options.notes = false;
  }
  if args.no_bookmarks {
    options.bookmarks = false;
  }
  if args.no_highlights {
    options.highlights = false;
  }
  if args.no_tags {
    options.tags = false;
  }
  if args.no_inputfields {
    options.inputfields = false;
  }
  if args.no_playlists {
    options.playlists = false;
  }
  if let Some(mib) = args.size_limit_mib {
    options.size_limit_bytes = Some(mib * 1024 * 1024);
  }

  Ok(options)
}

fn print_summary(
  path: &std::path::Path,
  report: &folio_core::ValidationReport,
) {
  println!("wrote {}", path.display());
  for (table, rows) in &report.table_counts {
    if *rows > 0 {
      println!("  {table}: {rows} rows");
    }
  }
  if report.is_clean() {
    println!("  integrity: clean");
  } else {
    println!(
      "  integrity: {} orphaned marks, {} orphaned notes, \
       {} duplicate locations",
      report.orphaned_marks,
      report.orphaned_notes,
      report.duplicate_locations
    );
    for sample in &report.orphan_samples {
      println!(
        "    {}#{} {} -> missing {}",
        sample.table, sample.row, sample.column, sample.missing
      );
    }
  }
}
