//! Core types and schema knowledge for the Folio backup merger.
//!
//! This crate is deliberately free of archive and database dependencies.
//! All other crates depend on it; it depends on nothing heavier than serde.

pub mod config;
pub mod datum;
pub mod error;
pub mod progress;
pub mod registry;
pub mod report;
pub mod schema;
pub mod signature;
pub mod trace;

pub use config::MergeOptions;
pub use datum::{Datum, Row};
pub use error::{Error, Result};
pub use progress::{CancelToken, NoProgress, ProgressSink};
pub use registry::{IdRegistry, SourceId};
pub use report::{OrphanSample, ValidationReport};
pub use trace::{MergeEvent, NoTrace, TraceSink, VecTrace};
