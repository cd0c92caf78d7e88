//! Registry of every implementation factory linked into the binary.
//!
//! Each component crate lists its implementations through
//! `get_all_implementations`; the configuration then picks among them by
//! name.

use offramp_aggregator::AggregatorFactory;
use offramp_chain::ChainReaderFactory;
use offramp_config::Config;
use offramp_core::{EngineBuilder, EngineFactories, PaymentEngine};
use offramp_encryption::EncryptionFactory;
use offramp_wallet::WalletFactory;
use std::collections::HashMap;
use std::sync::OnceLock;

pub struct FactoryRegistry {
	pub aggregator: HashMap<String, AggregatorFactory>,
	pub encryption: HashMap<String, EncryptionFactory>,
	pub wallet: HashMap<String, WalletFactory>,
	pub chain: HashMap<String, ChainReaderFactory>,
}

fn collect<F>(component: &str, implementations: Vec<(&'static str, F)>) -> HashMap<String, F> {
	implementations
		.into_iter()
		.map(|(name, factory)| {
			tracing::debug!(component, implementation = name, "Registered");
			(name.to_string(), factory)
		})
		.collect()
}

static REGISTRY: OnceLock<FactoryRegistry> = OnceLock::new();

pub fn get_registry() -> &'static FactoryRegistry {
	REGISTRY.get_or_init(|| FactoryRegistry {
		aggregator: collect("aggregator", offramp_aggregator::get_all_implementations()),
		encryption: collect("encryption", offramp_encryption::get_all_implementations()),
		wallet: collect("wallet", offramp_wallet::get_all_implementations()),
		chain: collect("chain", offramp_chain::get_all_implementations()),
	})
}

/// Picks the factory of every configured implementation, failing on names
/// the binary does not know.
macro_rules! build_factories {
	($registry:expr, $config_impls:expr, $registry_field:ident, $type_name:literal) => {{
		let mut factories = HashMap::new();
		for name in $config_impls.keys() {
			if let Some(factory) = $registry.$registry_field.get(name) {
				factories.insert(name.clone(), *factory);
			} else {
				let mut available: Vec<_> = $registry.$registry_field.keys().cloned().collect();
				available.sort();
				return Err(format!(
					"Unknown {} implementation '{}'. Available: [{}]",
					$type_name,
					name,
					available.join(", ")
				)
				.into());
			}
		}
		factories
	}};
}

/// Builds the payment engine from the configured implementations.
pub fn build_engine_from_config(
	config: Config,
) -> Result<PaymentEngine, Box<dyn std::error::Error>> {
	let registry = get_registry();

	let factories = EngineFactories {
		aggregator_factories: build_factories!(
			registry,
			config.aggregator.implementations,
			aggregator,
			"aggregator"
		),
		encryption_factories: build_factories!(
			registry,
			config.encryption.implementations,
			encryption,
			"encryption"
		),
		wallet_factories: build_factories!(
			registry,
			config.wallet.implementations,
			wallet,
			"wallet"
		),
		chain_factories: build_factories!(registry, config.chain.implementations, chain, "chain"),
	};

	Ok(EngineBuilder::new(config).build(factories)?)
}
