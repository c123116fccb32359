//! Cache key derivation.

use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use serde_json::Value;

use crate::api::endpoint::RegisteredEndpoint;

/// Separator between the endpoint name and the encoded params.
pub const PARAMS_SEPARATOR: char = '@';

/// Build the cache key for an endpoint call.
///
/// The key is the bare endpoint name when there are no params (or the params
/// are JSON `null`), otherwise `endpoint@<compact json>`. Object keys inside a
/// [`Value`] serialize in sorted order, so equal maps give equal keys.
pub fn cache_key(endpoint: RegisteredEndpoint, params: Option<&Value>) -> String {
  match params {
    None | Some(Value::Null) => endpoint.as_str().to_string(),
    Some(params) => format!("{}{}{}", endpoint.as_str(), PARAMS_SEPARATOR, params),
  }
}

/// Convert typed request params into a JSON value for keying and transport.
pub fn encode_params<P: Serialize + ?Sized>(params: Option<&P>) -> Result<Option<Value>> {
  params
    .map(|p| serde_json::to_value(p).map_err(|e| eyre!("Failed to encode request params: {}", e)))
    .transpose()
}
