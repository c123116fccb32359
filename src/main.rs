use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

use reqcache::api::cached_client::ApprovalsClient;
use reqcache::app::App;
use reqcache::config::{Config, TransportConfig};
use reqcache::logging;

#[derive(Parser, Debug)]
#[command(name = "reqcache")]
#[command(about = "Interactive shell over a read-through request cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./reqcache.yaml or $XDG_CONFIG_HOME/reqcache/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Run without a cache store; every request goes to the transport
  #[arg(long)]
  no_cache: bool,

  /// Serve requests from this fixture dataset instead of the configured transport
  #[arg(long)]
  fixtures: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = Config::load(args.config.as_deref())?;

  // Command line overrides
  if args.no_cache {
    config.cache.enabled = false;
  }
  if let Some(fixtures) = args.fixtures {
    config.transport = TransportConfig::Fixture {
      fixtures: Some(fixtures),
      latency_ms: 0,
    };
  }

  let (_log_guard, log_dir) = logging::init(&config.log)?;
  tracing::info!(transport = ?config.transport, cache = config.cache.enabled, "starting");

  let client = ApprovalsClient::from_config(&config)?;
  println!("Logging to {}", log_dir.display());

  // Initialize and run the shell
  let mut app = App::new(client);
  app.run().await?;

  tracing::info!("exiting");
  Ok(())
}
