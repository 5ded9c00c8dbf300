//! Command-line entry point and subscriber setup for the `oauth2-relay` binary.

// std
use std::{net::SocketAddr, path::PathBuf};
// crates.io
use clap::Parser;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};
// self
use crate::{
	_prelude::*,
	config::{ConfigLoader, LogFormat, RelayConfig},
};

/// OAuth 2.0 authorization-code relay.
#[derive(Clone, Debug, Parser)]
#[command(name = "oauth2-relay", version, about)]
pub struct Cli {
	/// Directory containing the optional `.env` file.
	#[arg(long, env = "RELAY_ENV_DIR")]
	pub env_dir: Option<PathBuf>,
	/// Overrides `RELAY_BIND_ADDR`.
	#[arg(long)]
	pub bind: Option<SocketAddr>,
	/// Emits JSON log lines regardless of `RELAY_LOG_FORMAT`.
	#[arg(long)]
	pub json_logs: bool,
}
impl Cli {
	/// Loads the configuration and applies command-line overrides.
	pub fn load_config(&self) -> Result<RelayConfig> {
		let loader = match &self.env_dir {
			Some(dir) => ConfigLoader::with_base_dir(dir),
			None => ConfigLoader::new(),
		};
		let mut config = loader.load()?;

		if let Some(bind) = self.bind {
			config.bind_addr = bind;
		}
		if self.json_logs {
			config.log_format = LogFormat::Json;
		}

		Ok(config)
	}
}

/// Installs the global subscriber.
///
/// `RUST_LOG` wins over `config.log_level`.
pub fn init_subscriber(config: &RelayConfig) -> Result<(), SetGlobalDefaultError> {
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
	let registry = Registry::default().with(filter);

	match config.log_format {
		LogFormat::Json => tracing::subscriber::set_global_default(registry.with(fmt::layer().json())),
		LogFormat::Text => tracing::subscriber::set_global_default(registry.with(fmt::layer())),
	}
}

/// Parses the command line, loads the configuration, and serves until shutdown.
pub async fn run() -> Result<()> {
	let cli = Cli::parse();
	let config = cli.load_config()?;

	if let Err(e) = init_subscriber(&config) {
		eprintln!("tracing subscriber was already installed: {e}");
	}

	tracing::debug!(?config, "configuration loaded");

	super::serve(config).await
}
