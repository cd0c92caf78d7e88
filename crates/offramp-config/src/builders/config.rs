//! Fluent builder for [`Config`] values.
//!
//! Produces a configuration with one network and in-memory friendly
//! implementation names, which tests then adjust as needed.

use crate::{
	AggregatorConfig, ApiConfig, ChainConfig, Config, EncryptionConfig, PollingConfig,
	ServiceConfig, WalletConfig,
};
use offramp_types::{Address, NetworkConfig, NetworksConfig, TokenConfig};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct ConfigBuilder {
	service_id: String,
	networks: NetworksConfig,
	default_network: Option<String>,
	polling: PollingConfig,
	aggregator_primary: String,
	encryption_primary: String,
	wallet_primary: String,
	wallet_linked: Option<String>,
	chain_primary: String,
	api: Option<ApiConfig>,
}

impl Default for ConfigBuilder {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigBuilder {
	pub fn new() -> Self {
		Self {
			service_id: "offramp-test".to_string(),
			networks: NetworksConfig::new(),
			default_network: None,
			polling: PollingConfig::default(),
			aggregator_primary: "static".to_string(),
			encryption_primary: "ecies".to_string(),
			wallet_primary: "smart_account".to_string(),
			wallet_linked: None,
			chain_primary: "evm_alloy".to_string(),
			api: None,
		}
	}

	pub fn service_id(mut self, id: impl Into<String>) -> Self {
		self.service_id = id.into();
		self
	}

	/// Adds a network with the given tokens `(symbol, address, decimals)`.
	pub fn network(
		mut self,
		chain_id: u64,
		name: impl Into<String>,
		gateway_address: Address,
		tokens: &[(&str, Address, u8)],
	) -> Self {
		let tokens = tokens
			.iter()
			.map(|(symbol, address, decimals)| TokenConfig {
				symbol: symbol.to_string(),
				address: *address,
				decimals: *decimals,
			})
			.collect();
		self.networks.insert(
			chain_id,
			NetworkConfig {
				name: name.into(),
				rpc_url: format!("http://localhost:{}", 8545 + self.networks.len()),
				gateway_address,
				tokens,
			},
		);
		self
	}

	pub fn default_network(mut self, name: impl Into<String>) -> Self {
		self.default_network = Some(name.into());
		self
	}

	pub fn polling(mut self, polling: PollingConfig) -> Self {
		self.polling = polling;
		self
	}

	pub fn linked_wallet(mut self, name: impl Into<String>) -> Self {
		self.wallet_linked = Some(name.into());
		self
	}

	pub fn api(mut self, api: Option<ApiConfig>) -> Self {
		self.api = api;
		self
	}

	/// Builds the `Config`. Implementation tables are left empty; the
	/// primaries are registered with empty tables so lookups succeed.
	pub fn build(self) -> Config {
		let single = |name: &str| {
			HashMap::from([(
				name.to_string(),
				toml::Value::Table(toml::map::Map::new()),
			)])
		};

		let mut wallets = single(&self.wallet_primary);
		if let Some(linked) = &self.wallet_linked {
			wallets.insert(linked.clone(), toml::Value::Table(toml::map::Map::new()));
		}

		Config {
			service: ServiceConfig {
				id: self.service_id,
				default_network: self.default_network,
			},
			networks: self.networks,
			polling: self.polling,
			aggregator: AggregatorConfig {
				implementations: single(&self.aggregator_primary),
				primary: self.aggregator_primary,
			},
			encryption: EncryptionConfig {
				implementations: single(&self.encryption_primary),
				primary: self.encryption_primary,
			},
			wallet: WalletConfig {
				implementations: wallets,
				primary: self.wallet_primary,
				linked: self.wallet_linked,
			},
			chain: ChainConfig {
				implementations: single(&self.chain_primary),
				primary: self.chain_primary,
			},
			api: self.api,
		}
	}
}
