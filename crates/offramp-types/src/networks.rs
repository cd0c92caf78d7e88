//! Network and token registry.
//!
//! Networks are keyed by chain id in configuration and looked up by their
//! display name at runtime, since the user selects a network by name.

use alloy_primitives::Address;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// A token supported on a network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct TokenConfig {
	pub symbol: String,
	pub address: Address,
	#[serde(default = "default_decimals")]
	pub decimals: u8,
}

fn default_decimals() -> u8 {
	18
}

/// Settings of one blockchain network.
///
/// # Fields
///
/// * `name` - Display name used for selection (e.g. "Base")
/// * `rpc_url` - HTTP(S) RPC endpoint
/// * `gateway_address` - Gateway contract accepting `createOrder` calls
/// * `tokens` - Tokens that can be off-ramped on this network
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NetworkConfig {
	pub name: String,
	pub rpc_url: String,
	pub gateway_address: Address,
	pub tokens: Vec<TokenConfig>,
}

impl NetworkConfig {
	/// Finds a token by symbol, ignoring ASCII case.
	pub fn token(&self, symbol: &str) -> Option<&TokenConfig> {
		self.tokens
			.iter()
			.find(|t| t.symbol.eq_ignore_ascii_case(symbol))
	}
}

/// Chain id to network configuration.
pub type NetworksConfig = HashMap<u64, NetworkConfig>;

/// Deserializes networks keyed by chain id.
///
/// TOML table keys are strings, so each key is parsed into a `u64`.
pub fn deserialize_networks<'de, D>(deserializer: D) -> Result<NetworksConfig, D::Error>
where
	D: Deserializer<'de>,
{
	let string_map: HashMap<String, NetworkConfig> = HashMap::deserialize(deserializer)?;
	let mut result = HashMap::new();

	for (key, value) in string_map {
		let chain_id = key
			.parse::<u64>()
			.map_err(|e| serde::de::Error::custom(format!("Invalid chain_id '{}': {}", key, e)))?;
		result.insert(chain_id, value);
	}

	Ok(result)
}

/// A network resolved by name, together with its chain id.
#[derive(Debug, Clone, Copy)]
pub struct NetworkRef<'a> {
	pub chain_id: u64,
	pub config: &'a NetworkConfig,
}

/// Read-only lookup over the configured networks.
///
/// Lookups are by network name; a missing network or token is a miss
/// (`None`), never a panic.
#[derive(Debug, Clone, Default)]
pub struct NetworkRegistry {
	networks: NetworksConfig,
}

impl NetworkRegistry {
	pub fn new(networks: NetworksConfig) -> Self {
		Self { networks }
	}

	pub fn network_by_name(&self, name: &str) -> Option<NetworkRef<'_>> {
		self.networks
			.iter()
			.find(|(_, n)| n.name.eq_ignore_ascii_case(name))
			.map(|(chain_id, config)| NetworkRef {
				chain_id: *chain_id,
				config,
			})
	}

	pub fn network(&self, chain_id: u64) -> Option<&NetworkConfig> {
		self.networks.get(&chain_id)
	}

	/// Resolves a token symbol on the named network.
	pub fn resolve_token(&self, network_name: &str, symbol: &str) -> Option<&TokenConfig> {
		self.network_by_name(network_name)?.config.token(symbol)
	}

	/// Resolves the gateway contract of the named network.
	pub fn resolve_gateway(&self, network_name: &str) -> Option<Address> {
		self.network_by_name(network_name)
			.map(|n| n.config.gateway_address)
	}

	/// All networks sorted by chain id.
	pub fn iter(&self) -> impl Iterator<Item = NetworkRef<'_>> {
		let mut ids: Vec<&u64> = self.networks.keys().collect();
		ids.sort();
		ids.into_iter().filter_map(move |id| {
			self.networks.get(id).map(|config| NetworkRef {
				chain_id: *id,
				config,
			})
		})
	}

	pub fn is_empty(&self) -> bool {
		self.networks.is_empty()
	}
}
