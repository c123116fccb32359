//! Logging bootstrap.
//!
//! The shell owns stdout, so diagnostics go to a daily rolling file written by
//! a non-blocking worker. Keep the returned guard alive until exit or buffered
//! lines are lost.

use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

const ENV_FILTER_VARS: [&str; 2] = ["REQCACHE_LOG", "RUST_LOG"];
const DEFAULT_DIRECTIVE: &str = "info";
const FILE_PREFIX: &str = "reqcache.log";

/// Install the global subscriber. Call once from `main`.
pub fn init(config: &LogConfig) -> Result<(WorkerGuard, PathBuf)> {
  let directory = match &config.directory {
    Some(dir) => dir.clone(),
    None => default_directory()?,
  };
  std::fs::create_dir_all(&directory)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", directory.display(), e))?;

  let appender = tracing_appender::rolling::daily(&directory, FILE_PREFIX);
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let directive = filter_directive(config.level.as_deref());
  let filter = EnvFilter::try_new(&directive)
    .map_err(|e| eyre!("Invalid log filter '{}': {}", directive, e))?;

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false)
    .try_init()
    .map_err(|e| eyre!("Failed to install log subscriber: {}", e))?;

  Ok((guard, directory))
}

/// Environment first, then the configured level, then the default.
fn filter_directive(configured: Option<&str>) -> String {
  ENV_FILTER_VARS
    .iter()
    .filter_map(|var| std::env::var(var).ok())
    .find(|directive| !directive.trim().is_empty())
    .or_else(|| configured.map(String::from))
    .unwrap_or_else(|| DEFAULT_DIRECTIVE.to_string())
}

fn default_directory() -> Result<PathBuf> {
  let data_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?;

  Ok(data_dir.join("reqcache").join("logs"))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_filter_directive_falls_back() {
    let env_set = ENV_FILTER_VARS
      .iter()
      .any(|var| std::env::var(var).map(|v| !v.trim().is_empty()).unwrap_or(false));
    if env_set {
      return;
    }

    assert_eq!(filter_directive(None), "info");
    assert_eq!(filter_directive(Some("reqcache=debug")), "reqcache=debug");
  }
}
