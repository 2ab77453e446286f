//! Main entry point for the marketplace order service.
//!
//! Loads the configuration, wires the configured storage backend and payment
//! provider into the market engine, and serves the HTTP API next to the
//! engine's event loop.

use clap::Parser;
use market_config::Config;
use std::path::PathBuf;
use std::sync::Arc;

mod apis;
mod factory_registry;
mod server;

/// Command-line arguments for the market service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml", env = "MARKET_CONFIG")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

/// Main entry point for the market service.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging
/// 3. Loads configuration from file
/// 4. Builds and initializes the market engine
/// 5. Runs the engine (and the API server when enabled) until interrupted
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started market");

	let config_path = args
		.config
		.to_str()
		.ok_or("Configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.market.id);

	let api_config = config.api.clone().filter(|api| api.enabled);

	let engine = factory_registry::build_market_from_config(config)?;
	engine.initialize().await?;
	let engine = Arc::new(engine);

	if let Some(api_config) = api_config {
		let engine_task = engine.run();
		let api_task = server::start_server(api_config, Arc::clone(&engine));

		tokio::select! {
			result = engine_task => {
				tracing::info!("Market engine finished");
				result?;
			}
			result = api_task => {
				tracing::info!("API server finished");
				result?;
			}
		}
	} else {
		tracing::info!("API disabled, running engine only");
		engine.run().await?;
	}

	tracing::info!("Stopped market");
	Ok(())
}
