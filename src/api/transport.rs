//! The seam between the cache layer and whatever actually serves requests.

use color_eyre::Result;
use futures::future::BoxFuture;
use serde_json::Value;

use super::endpoint::RegisteredEndpoint;

/// Resolves an endpoint call to its JSON response.
///
/// Implementations report failures through the returned `Result`; the cache
/// layer passes them to its caller unchanged and never retries.
pub trait Transport: Send + Sync {
  fn fetch<'a>(
    &'a self,
    endpoint: RegisteredEndpoint,
    params: Option<&'a Value>,
  ) -> BoxFuture<'a, Result<Value>>;
}
