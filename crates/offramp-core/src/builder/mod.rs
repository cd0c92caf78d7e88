//! Builder for constructing the payment engine.
//!
//! Every component is created from its configuration table through a factory
//! looked up by implementation name, so the service binary decides which
//! implementations exist and the configuration decides which are used.

use crate::engine::{event_bus::EventBus, PaymentEngine};
use offramp_aggregator::{AggregatorError, AggregatorInterface, AggregatorService};
use offramp_chain::{ChainError, ChainReaderInterface, ChainService};
use offramp_config::Config;
use offramp_encryption::{EncryptionError, EncryptionInterface, EncryptionService};
use offramp_types::NetworksConfig;
use offramp_wallet::{WalletError, WalletInterface, WalletService};
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during engine construction.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Missing required component: {0}")]
	MissingComponent(String),
}

/// Factory functions for every component, keyed by implementation name.
pub struct EngineFactories<AF, EF, WF, CF> {
	pub aggregator_factories: HashMap<String, AF>,
	pub encryption_factories: HashMap<String, EF>,
	pub wallet_factories: HashMap<String, WF>,
	pub chain_factories: HashMap<String, CF>,
}

pub struct EngineBuilder {
	config: Config,
}

/// Runs `create` for every configured implementation that has a factory.
/// A factory failure aborts the build.
fn load_implementations<F, T: ?Sized, E: Display>(
	component: &str,
	primary: &str,
	configured: &HashMap<String, toml::Value>,
	factories: &HashMap<String, F>,
	create: impl Fn(&F, &toml::Value) -> Result<Box<T>, E>,
) -> Result<HashMap<String, Arc<T>>, BuilderError> {
	let mut loaded = HashMap::new();
	for (name, config) in configured {
		let Some(factory) = factories.get(name) else {
			tracing::warn!(component, implementation = %name, "No factory registered");
			continue;
		};
		match create(factory, config) {
			Ok(implementation) => {
				let is_primary = primary == name;
				tracing::info!(component, implementation = %name, enabled = %is_primary, "Loaded");
				loaded.insert(name.clone(), Arc::from(implementation));
			},
			Err(e) => {
				tracing::error!(
					component,
					implementation = %name,
					error = %e,
					"Failed to create implementation"
				);
				return Err(BuilderError::Config(format!(
					"Failed to create {} implementation '{}': {}",
					component, name, e
				)));
			},
		}
	}

	if loaded.is_empty() {
		return Err(BuilderError::MissingComponent(format!(
			"No valid {} implementations available",
			component
		)));
	}
	Ok(loaded)
}

impl EngineBuilder {
	pub fn new(config: Config) -> Self {
		Self { config }
	}

	/// Builds the engine from the configured implementations.
	pub fn build<AF, EF, WF, CF>(
		self,
		factories: EngineFactories<AF, EF, WF, CF>,
	) -> Result<PaymentEngine, BuilderError>
	where
		AF: Fn(&toml::Value) -> Result<Box<dyn AggregatorInterface>, AggregatorError>,
		EF: Fn(&toml::Value) -> Result<Box<dyn EncryptionInterface>, EncryptionError>,
		WF: Fn(&toml::Value, &NetworksConfig) -> Result<Box<dyn WalletInterface>, WalletError>,
		CF: Fn(&toml::Value, &NetworksConfig) -> Result<Box<dyn ChainReaderInterface>, ChainError>,
	{
		let config = self.config;
		let networks = &config.networks;

		let aggregators = load_implementations(
			"aggregator",
			&config.aggregator.primary,
			&config.aggregator.implementations,
			&factories.aggregator_factories,
			|factory, table| factory(table),
		)?;
		let aggregator = AggregatorService::new(aggregators, config.aggregator.primary.clone())
			.map_err(|e| BuilderError::Config(e.to_string()))?;

		let encryptions = load_implementations(
			"encryption",
			&config.encryption.primary,
			&config.encryption.implementations,
			&factories.encryption_factories,
			|factory, table| factory(table),
		)?;
		let encryption = EncryptionService::new(encryptions, config.encryption.primary.clone())
			.map_err(|e| BuilderError::Config(e.to_string()))?;

		let mut wallets = load_implementations(
			"wallet",
			&config.wallet.primary,
			&config.wallet.implementations,
			&factories.wallet_factories,
			|factory, table| factory(table, networks),
		)?;
		let primary_wallet = wallets.remove(&config.wallet.primary).ok_or_else(|| {
			BuilderError::Config(format!(
				"Primary wallet '{}' failed to load or has invalid configuration",
				config.wallet.primary
			))
		})?;
		let linked_wallet = match &config.wallet.linked {
			Some(name) => Some(wallets.remove(name).ok_or_else(|| {
				BuilderError::Config(format!("Linked wallet '{}' failed to load", name))
			})?),
			None => None,
		};
		let wallet = WalletService::new(primary_wallet, linked_wallet);
		tracing::info!(
			address = %wallet.address(),
			linked = ?wallet.linked_address(),
			"Wallet connected"
		);

		let mut readers = load_implementations(
			"chain",
			&config.chain.primary,
			&config.chain.implementations,
			&factories.chain_factories,
			|factory, table| factory(table, networks),
		)?;
		let reader = readers.remove(&config.chain.primary).ok_or_else(|| {
			BuilderError::Config(format!(
				"Primary chain reader '{}' failed to load or has invalid configuration",
				config.chain.primary
			))
		})?;

		PaymentEngine::new(
			config,
			Arc::new(aggregator),
			Arc::new(encryption),
			Some(Arc::new(wallet)),
			ChainService::new(reader),
			EventBus::new(1000),
		)
		.map_err(|e| BuilderError::Config(e.to_string()))
	}
}
