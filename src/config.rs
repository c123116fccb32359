use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub transport: TransportConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub log: LogConfig,
}

/// Where requests are served from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TransportConfig {
  /// Built-in in-memory API
  Fixture {
    /// YAML or JSON dataset; the built-in sample is used when unset
    #[serde(default)]
    fixtures: Option<PathBuf>,
    /// Artificial delay added to every response
    #[serde(default)]
    latency_ms: u64,
  },
  /// JSON over HTTP, one POST route per endpoint
  Http {
    base_url: String,
    #[serde(default)]
    timeout_secs: Option<u64>,
  },
}

impl Default for TransportConfig {
  fn default() -> Self {
    TransportConfig::Fixture {
      fixtures: None,
      latency_ms: 0,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// When false no store is provisioned and every fetch hits the transport
  #[serde(default = "default_true")]
  pub enabled: bool,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self { enabled: true }
  }
}

fn default_true() -> bool {
  true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogConfig {
  /// Filter directive used when REQCACHE_LOG / RUST_LOG are unset (e.g. "reqcache=debug")
  pub level: Option<String>,
  /// Directory for the rolling log files (defaults to the data directory)
  pub directory: Option<PathBuf>,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./reqcache.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/reqcache/config.yaml
  ///
  /// Without any file the defaults apply: cached fixture transport.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("reqcache.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("reqcache").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    Ok(serde_yaml::from_str(contents)?)
  }

  /// Get the API bearer token from the environment, if set.
  ///
  /// Checks REQCACHE_API_TOKEN.
  pub fn get_api_token() -> Option<String> {
    std::env::var("REQCACHE_API_TOKEN")
      .ok()
      .filter(|token| !token.is_empty())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_file_gives_defaults() {
    let config = Config::parse("{}").unwrap();
    assert_eq!(config.transport, TransportConfig::default());
    assert!(config.cache.enabled);
    assert!(config.log.level.is_none());
  }

  #[test]
  fn test_http_transport() {
    let config = Config::parse(
      r#"
transport:
  kind: http
  base_url: http://localhost:3000/api
  timeout_secs: 5
cache:
  enabled: false
"#,
    )
    .unwrap();

    assert_eq!(
      config.transport,
      TransportConfig::Http {
        base_url: "http://localhost:3000/api".into(),
        timeout_secs: Some(5),
      }
    );
    assert!(!config.cache.enabled);
  }

  #[test]
  fn test_fixture_transport() {
    let config = Config::parse(
      r#"
transport:
  kind: fixture
  fixtures: ./data.yaml
  latency_ms: 250
log:
  level: reqcache=debug
"#,
    )
    .unwrap();

    assert_eq!(
      config.transport,
      TransportConfig::Fixture {
        fixtures: Some(PathBuf::from("./data.yaml")),
        latency_ms: 250,
      }
    );
    assert_eq!(config.log.level.as_deref(), Some("reqcache=debug"));
  }

  #[test]
  fn test_unknown_transport_kind() {
    assert!(Config::parse("transport:\n  kind: grpc\n").is_err());
  }

  #[test]
  fn test_missing_explicit_path() {
    let err = Config::load(Some(Path::new("/definitely/not/here.yaml"))).unwrap_err();
    assert!(err.to_string().starts_with("Config file not found"));
  }
}
