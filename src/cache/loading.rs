//! Loading-state tracking for wrapped requests.
//!
//! A [`RequestTracker`] counts how many wrapped requests are in flight. The
//! `loading` flag is true while that count is above zero. Failures are logged
//! and handed back to the caller unchanged.

use color_eyre::Result;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Tracks in-flight requests. Clones share the same counter.
#[derive(Debug, Clone, Default)]
pub struct RequestTracker {
  in_flight: Arc<AtomicUsize>,
}

impl RequestTracker {
  pub fn new() -> Self {
    Self::default()
  }

  /// Check if any wrapped request is currently running.
  pub fn loading(&self) -> bool {
    self.in_flight() > 0
  }

  /// Number of wrapped requests currently running.
  pub fn in_flight(&self) -> usize {
    self.in_flight.load(Ordering::SeqCst)
  }

  /// Run `request` while marking the tracker as loading.
  pub async fn wrap<T, Fut>(&self, request: Fut) -> Result<T>
  where
    Fut: Future<Output = Result<T>>,
  {
    let _guard = InFlightGuard::enter(&self.in_flight);

    let result = request.await;
    if let Err(e) = &result {
      tracing::error!(error = %e, "wrapped request failed");
    }
    result
  }
}

/// Decrements the counter on drop, so a cancelled request also clears it.
struct InFlightGuard<'a> {
  counter: &'a AtomicUsize,
}

impl<'a> InFlightGuard<'a> {
  fn enter(counter: &'a AtomicUsize) -> Self {
    counter.fetch_add(1, Ordering::SeqCst);
    Self { counter }
  }
}

impl Drop for InFlightGuard<'_> {
  fn drop(&mut self) {
    self.counter.fetch_sub(1, Ordering::SeqCst);
  }
}
