use color_eyre::{eyre::eyre, Result};
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use super::endpoint::RegisteredEndpoint;
use super::transport::Transport;
use crate::config::Config;

/// HTTP transport: every endpoint is a JSON `POST <base_url>/<endpoint>`.
#[derive(Clone)]
pub struct HttpTransport {
  client: reqwest::Client,
  base_url: Url,
  token: Option<String>,
}

impl HttpTransport {
  pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
    let mut base_url =
      Url::parse(base_url).map_err(|e| eyre!("Invalid base URL {}: {}", base_url, e))?;

    // Url::join drops the last path segment unless the base ends with a slash
    if !base_url.path().ends_with('/') {
      let path = format!("{}/", base_url.path());
      base_url.set_path(&path);
    }

    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
      builder = builder.timeout(timeout);
    }
    let client = builder
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      client,
      base_url,
      token: Config::get_api_token(),
    })
  }

  /// URL an endpoint is served from.
  pub fn endpoint_url(&self, endpoint: RegisteredEndpoint) -> Result<Url> {
    self
      .base_url
      .join(endpoint.as_str())
      .map_err(|e| eyre!("Failed to build URL for {}: {}", endpoint, e))
  }

  async fn post(&self, endpoint: RegisteredEndpoint, params: Option<&Value>) -> Result<Value> {
    let url = self.endpoint_url(endpoint)?;
    let empty = Value::Object(Default::default());
    let body = params.unwrap_or(&empty);

    let mut request = self.client.post(url.clone()).json(body);
    if let Some(token) = &self.token {
      request = request.bearer_auth(token);
    }

    let response = request
      .send()
      .await
      .map_err(|e| eyre!("Request to {} failed: {}", url, e))?
      .error_for_status()
      .map_err(|e| eyre!("{} returned an error: {}", endpoint, e))?;

    let bytes = response
      .bytes()
      .await
      .map_err(|e| eyre!("Failed to read response from {}: {}", endpoint, e))?;

    if bytes.is_empty() {
      return Ok(Value::Null);
    }

    serde_json::from_slice(&bytes)
      .map_err(|e| eyre!("Failed to parse response from {}: {}", endpoint, e))
  }
}

impl Transport for HttpTransport {
  fn fetch<'a>(
    &'a self,
    endpoint: RegisteredEndpoint,
    params: Option<&'a Value>,
  ) -> BoxFuture<'a, Result<Value>> {
    self.post(endpoint, params).boxed()
  }
}
