//! Main entry point for the off-ramp service.
//!
//! Loads the configuration, builds the payment engine from the configured
//! implementations and serves the HTTP API until interrupted.

use clap::Parser;
use offramp_config::Config;
use std::path::PathBuf;
use std::sync::Arc;

mod apis;
mod factory_registry;
mod server;

/// Command-line arguments for the off-ramp service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
	fmt().with_env_filter(env_filter).with_target(true).init();

	tracing::info!("Started off-ramp");

	let config_path = args
		.config
		.to_str()
		.ok_or("Configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.service.id);

	let engine = Arc::new(factory_registry::build_engine_from_config(config.clone())?);
	let active = engine.active_network().await;
	tracing::info!(network = %active.name, chain_id = active.chain_id, "Engine ready");

	match config.api.filter(|api| api.enabled) {
		Some(api_config) => {
			let shutdown = async {
				tokio::signal::ctrl_c().await.ok();
			};
			server::start_server(api_config, Arc::clone(&engine), shutdown).await?;
		},
		None => {
			tracing::info!("API disabled, waiting for Ctrl-C");
			tokio::signal::ctrl_c().await?;
		},
	}

	engine.shutdown().await;
	tracing::info!("Stopped off-ramp");
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::tempdir;

	#[test]
	fn test_args_defaults() {
		let args = Args::parse_from(["offramp"]);
		assert_eq!(args.config, PathBuf::from("config.toml"));
		assert_eq!(args.log_level, "info");
	}

	#[test]
	fn test_args_custom_values() {
		let args = Args::parse_from(["offramp", "--config", "custom.toml", "-l", "debug"]);
		assert_eq!(args.config, PathBuf::from("custom.toml"));
		assert_eq!(args.log_level, "debug");
	}

	#[tokio::test]
	async fn test_build_engine_from_file() {
		let temp_dir = tempdir().unwrap();
		let config_path = temp_dir.path().join("offramp.toml");

		// Static key and no network access needed until the first request.
		let config_content = r#"
[service]
id = "offramp-file-test"
default_network = "Base"

[networks.8453]
name = "Base"
rpc_url = "http://localhost:8545"
gateway_address = "0x30F6A8457F8E42371E204a9c103f2Bd42341dD0F"
[[networks.8453.tokens]]
symbol = "USDC"
address = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"
decimals = 6

[polling]
interval_ms = 1000

[aggregator]
primary = "static"
[aggregator.implementations.static]
public_key = "0x0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"

[encryption]
primary = "ecies"
[encryption.implementations.ecies]

[wallet]
primary = "smart_account"
[wallet.implementations.smart_account]
network_ids = [8453]
owner_private_key = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
smart_account_address = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"

[chain]
primary = "evm_alloy"
[chain.implementations.evm_alloy]
network_ids = [8453]
"#;
		std::fs::write(&config_path, config_content).unwrap();

		let config = Config::from_file(config_path.to_str().unwrap())
			.await
			.unwrap();
		assert_eq!(config.service.id, "offramp-file-test");
		assert_eq!(config.polling.interval_ms, 1000);

		let engine = factory_registry::build_engine_from_config(config).unwrap();
		assert_eq!(engine.active_network().await.chain_id, 8453);
	}
}
