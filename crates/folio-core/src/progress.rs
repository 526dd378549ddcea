//! Progress reporting and cooperative cancellation.
//!
//! The engine calls the sink from the merge thread; implementations must
//! not block. Cancellation is checked between sources and between tables.

use std::sync::{
  Arc,
  atomic::{AtomicBool, Ordering},
};

/// Receives coarse progress updates during a merge run.
pub trait ProgressSink {
  /// `percent` is 0–100; messages are short and human-readable.
  fn report(&self, message: &str, percent: u8);
}

/// No-op sink when progress is not wanted.
pub struct NoProgress;

impl ProgressSink for NoProgress {
  fn report(&self, _message: &str, _percent: u8) {}
}

/// Cooperative cancel flag shared between the caller and the merge thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
  flag: Arc<AtomicBool>,
}

impl CancelToken {
  pub fn new() -> Self { Self::default() }

  pub fn cancel(&self) { self.flag.store(true, Ordering::Relaxed); }

  pub fn is_cancelled(&self) -> bool { self.flag.load(Ordering::Relaxed) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn token_starts_clear_and_latches() {
    let token = CancelToken::new();
    assert!(!token.is_cancelled());
    let clone = token.clone();
    clone.cancel();
    assert!(token.is_cancelled());
  }
}
