//! Configuration for the off-ramp service.
//!
//! Configuration is a single TOML file. `${VAR}` and `${VAR:-default}`
//! references are resolved from the environment before parsing, and the
//! parsed [`Config`] is validated for cross-section consistency.

pub mod builders;

use offramp_types::{deserialize_networks, NetworkRegistry, NetworksConfig};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub use builders::config::ConfigBuilder;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Only the message; the default rendering dumps the whole input.
		ConfigError::Parse(err.message().to_string())
	}
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	pub service: ServiceConfig,
	/// Networks keyed by chain id.
	#[serde(deserialize_with = "deserialize_networks")]
	pub networks: NetworksConfig,
	#[serde(default)]
	pub polling: PollingConfig,
	pub aggregator: AggregatorConfig,
	pub encryption: EncryptionConfig,
	pub wallet: WalletConfig,
	pub chain: ChainConfig,
	pub api: Option<ApiConfig>,
}

/// Identity of this service instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
	pub id: String,
	/// Network active at start-up. Defaults to the lowest configured chain id.
	pub default_network: Option<String>,
}

/// Confirmation polling settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PollingConfig {
	#[serde(default = "default_interval_ms")]
	pub interval_ms: u64,
	/// Blocks scanned back from the current height on every tick.
	#[serde(default = "default_lookback_blocks")]
	pub lookback_blocks: u64,
	/// Upper bound on one polling session. Zero disables the bound.
	#[serde(default = "default_timeout_minutes")]
	pub timeout_minutes: u64,
}

fn default_interval_ms() -> u64 {
	2000
}

fn default_lookback_blocks() -> u64 {
	500
}

fn default_timeout_minutes() -> u64 {
	30
}

impl Default for PollingConfig {
	fn default() -> Self {
		Self {
			interval_ms: default_interval_ms(),
			lookback_blocks: default_lookback_blocks(),
			timeout_minutes: default_timeout_minutes(),
		}
	}
}

impl PollingConfig {
	pub fn interval(&self) -> Duration {
		Duration::from_millis(self.interval_ms)
	}

	/// `None` when polling is unbounded.
	pub fn timeout(&self) -> Option<Duration> {
		(self.timeout_minutes > 0)
			.then(|| Duration::from_secs(self.timeout_minutes.saturating_mul(60)))
	}
}

/// Aggregator key service implementations.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AggregatorConfig {
	pub primary: String,
	pub implementations: HashMap<String, toml::Value>,
}

/// Encryption primitive implementations.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EncryptionConfig {
	pub primary: String,
	pub implementations: HashMap<String, toml::Value>,
}

/// Wallet implementations.
///
/// `primary` names the smart wallet that submits orders; `linked` optionally
/// names an external wallet that must follow it across chain switches.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WalletConfig {
	pub primary: String,
	pub linked: Option<String>,
	pub implementations: HashMap<String, toml::Value>,
}

/// Chain read client implementations.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainConfig {
	pub primary: String,
	pub implementations: HashMap<String, toml::Value>,
}

/// HTTP API server settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	#[serde(default)]
	pub enabled: bool,
	#[serde(default = "default_api_host")]
	pub host: String,
	#[serde(default = "default_api_port")]
	pub port: u16,
	/// Request timeout in seconds.
	#[serde(default = "default_api_timeout")]
	pub timeout_seconds: u64,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

fn default_api_timeout() -> u64 {
	30
}

/// Resolves `${VAR}` and `${VAR:-default}` references from the environment.
///
/// Input is limited to 1MB to bound regex work.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = String::with_capacity(input.len());
	let mut last = 0;
	for cap in re.captures_iter(input) {
		let (Some(whole), Some(name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let value = match (std::env::var(name.as_str()), cap.get(2)) {
			(Ok(v), _) => v,
			(Err(_), Some(default)) => default.as_str().to_string(),
			(Err(_), None) => {
				return Err(ConfigError::Validation(format!(
					"Environment variable '{}' not found",
					name.as_str()
				)))
			},
		};
		result.push_str(&input[last..whole.start()]);
		result.push_str(&value);
		last = whole.end();
	}
	result.push_str(&input[last..]);

	Ok(result)
}

fn check_primary(
	section: &str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
) -> Result<(), ConfigError> {
	if primary.is_empty() {
		return Err(ConfigError::Validation(format!(
			"{} primary implementation cannot be empty",
			section
		)));
	}
	if !implementations.contains_key(primary) {
		return Err(ConfigError::Validation(format!(
			"Primary {} '{}' not found in implementations",
			section, primary
		)));
	}
	Ok(())
}

impl Config {
	/// Reads, resolves and validates a configuration file.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let content = tokio::fs::read_to_string(path).await?;
		content.parse()
	}

	/// Registry over the configured networks.
	pub fn network_registry(&self) -> NetworkRegistry {
		NetworkRegistry::new(self.networks.clone())
	}

	/// Network active at start-up: `default_network`, or the lowest chain id.
	pub fn initial_network(&self) -> Option<String> {
		if let Some(name) = &self.service.default_network {
			return Some(name.clone());
		}
		self.networks
			.iter()
			.min_by_key(|(chain_id, _)| **chain_id)
			.map(|(_, n)| n.name.clone())
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.service.id.trim().is_empty() {
			return Err(ConfigError::Validation("Service ID cannot be empty".into()));
		}

		if self.networks.is_empty() {
			return Err(ConfigError::Validation(
				"Networks configuration cannot be empty".into(),
			));
		}
		let mut names = HashSet::new();
		for (chain_id, network) in &self.networks {
			if network.name.trim().is_empty() {
				return Err(ConfigError::Validation(format!(
					"Network {} must have a name",
					chain_id
				)));
			}
			if !names.insert(network.name.to_lowercase()) {
				return Err(ConfigError::Validation(format!(
					"Duplicate network name '{}'",
					network.name
				)));
			}
			if network.gateway_address.is_zero() {
				return Err(ConfigError::Validation(format!(
					"Network {} must have a non-zero gateway_address",
					chain_id
				)));
			}
			if network.tokens.is_empty() {
				return Err(ConfigError::Validation(format!(
					"Network {} must have at least 1 token configured",
					chain_id
				)));
			}
		}
		if let Some(name) = &self.service.default_network {
			if !names.contains(&name.to_lowercase()) {
				return Err(ConfigError::Validation(format!(
					"Default network '{}' is not configured",
					name
				)));
			}
		}

		if !(100..=60_000).contains(&self.polling.interval_ms) {
			return Err(ConfigError::Validation(
				"polling.interval_ms must be between 100 and 60000".into(),
			));
		}
		if !(1..=10_000).contains(&self.polling.lookback_blocks) {
			return Err(ConfigError::Validation(
				"polling.lookback_blocks must be between 1 and 10000".into(),
			));
		}
		if self.polling.timeout_minutes > 1_440 {
			return Err(ConfigError::Validation(
				"polling.timeout_minutes must be at most 1440 (0 disables the bound)".into(),
			));
		}
		if let Some(api) = &self.api {
			if !(1..=300).contains(&api.timeout_seconds) {
				return Err(ConfigError::Validation(
					"api.timeout_seconds must be between 1 and 300".into(),
				));
			}
		}

		check_primary(
			"aggregator",
			&self.aggregator.primary,
			&self.aggregator.implementations,
		)?;
		check_primary(
			"encryption",
			&self.encryption.primary,
			&self.encryption.implementations,
		)?;
		check_primary("wallet", &self.wallet.primary, &self.wallet.implementations)?;
		check_primary("chain", &self.chain.primary, &self.chain.implementations)?;

		if let Some(linked) = &self.wallet.linked {
			if linked == &self.wallet.primary {
				return Err(ConfigError::Validation(
					"Linked wallet must differ from the primary wallet".into(),
				));
			}
			if !self.wallet.implementations.contains_key(linked) {
				return Err(ConfigError::Validation(format!(
					"Linked wallet '{}' not found in implementations",
					linked
				)));
			}
		}

		Ok(())
	}
}

/// Parses a TOML string, resolving environment references and validating
/// the result.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	const BASE: &str = r#"
[service]
id = "offramp-test"

[networks.8453]
name = "Base"
rpc_url = "http://localhost:8545"
gateway_address = "0x30F6A8457F8E42371E204a9c103f2Bd42341dD0F"
[[networks.8453.tokens]]
symbol = "USDC"
address = "0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"
decimals = 6

[aggregator]
primary = "static"
[aggregator.implementations.static]
public_key = "02aa"

[encryption]
primary = "ecies"
[encryption.implementations.ecies]

[wallet]
primary = "smart_account"
[wallet.implementations.smart_account]
network_ids = [8453]
owner_private_key = "${TEST_OWNER_KEY:-0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80}"

[chain]
primary = "evm_alloy"
[chain.implementations.evm_alloy]
network_ids = [8453]
"#;

	#[test]
	fn test_env_var_resolution() {
		std::env::set_var("OFFRAMP_TEST_HOST", "localhost");
		std::env::set_var("OFFRAMP_TEST_PORT", "8545");

		let result = resolve_env_vars("url = \"http://${OFFRAMP_TEST_HOST}:${OFFRAMP_TEST_PORT}\"").unwrap();
		assert_eq!(result, "url = \"http://localhost:8545\"");

		std::env::remove_var("OFFRAMP_TEST_HOST");
		std::env::remove_var("OFFRAMP_TEST_PORT");
	}

	#[test]
	fn test_env_var_with_default_and_missing() {
		let result = resolve_env_vars("value = \"${OFFRAMP_MISSING:-fallback}\"").unwrap();
		assert_eq!(result, "value = \"fallback\"");

		let err = resolve_env_vars("value = \"${OFFRAMP_MISSING}\"").unwrap_err();
		assert!(err.to_string().contains("OFFRAMP_MISSING"));
	}

	#[test]
	fn test_parse_with_defaults() {
		let config: Config = BASE.parse().unwrap();
		assert_eq!(config.service.id, "offramp-test");
		assert_eq!(config.polling, PollingConfig::default());
		assert_eq!(config.polling.interval(), Duration::from_secs(2));
		assert_eq!(config.polling.timeout(), Some(Duration::from_secs(30 * 60)));
		assert_eq!(config.initial_network().as_deref(), Some("Base"));
		assert!(config.api.is_none());

		let registry = config.network_registry();
		assert_eq!(registry.resolve_token("Base", "USDC").unwrap().decimals, 6);
	}

	#[test]
	fn test_zero_timeout_disables_bound() {
		let config: Config = format!("{}\n[polling]\ntimeout_minutes = 0\n", BASE)
			.parse()
			.unwrap();
		assert_eq!(config.polling.timeout(), None);
		assert_eq!(config.polling.lookback_blocks, 500);
	}

	#[test]
	fn test_polling_bounds_rejected() {
		let err = format!("{}\n[polling]\ninterval_ms = 10\n", BASE)
			.parse::<Config>()
			.unwrap_err();
		assert!(err.to_string().contains("interval_ms"));

		let err = format!("{}\n[polling]\nlookback_blocks = 0\n", BASE)
			.parse::<Config>()
			.unwrap_err();
		assert!(err.to_string().contains("lookback_blocks"));

		let err = format!("{}\n[polling]\ntimeout_minutes = 1441\n", BASE)
			.parse::<Config>()
			.unwrap_err();
		assert!(err.to_string().contains("timeout_minutes"));

		let config: Config = format!("{}\n[polling]\ntimeout_minutes = 1440\n", BASE)
			.parse()
			.unwrap();
		assert_eq!(config.polling.timeout(), Some(Duration::from_secs(86_400)));
	}

	#[test]
	fn test_api_timeout_bounds() {
		for seconds in [0, 301] {
			let err = format!("{}\n[api]\nenabled = true\ntimeout_seconds = {}\n", BASE, seconds)
				.parse::<Config>()
				.unwrap_err();
			assert!(err.to_string().contains("api.timeout_seconds"));
		}

		let config: Config = format!("{}\n[api]\nenabled = true\n", BASE)
			.parse()
			.unwrap();
		assert_eq!(config.api.unwrap().timeout_seconds, 30);
	}

	#[test]
	fn test_huge_timeout_saturates() {
		let polling = PollingConfig {
			timeout_minutes: u64::MAX,
			..PollingConfig::default()
		};
		assert_eq!(polling.timeout(), Some(Duration::from_secs(u64::MAX)));
	}

	#[test]
	fn test_unknown_primary_rejected() {
		let config = BASE.replace("primary = \"evm_alloy\"", "primary = \"missing\"");
		let err = config.parse::<Config>().unwrap_err();
		assert!(err
			.to_string()
			.contains("Primary chain 'missing' not found in implementations"));
	}

	#[test]
	fn test_linked_wallet_rules() {
		let same = BASE.replace(
			"primary = \"smart_account\"",
			"primary = \"smart_account\"\nlinked = \"smart_account\"",
		);
		assert!(same.parse::<Config>().is_err());

		let unknown = BASE.replace(
			"primary = \"smart_account\"",
			"primary = \"smart_account\"\nlinked = \"external\"",
		);
		let err = unknown.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("Linked wallet 'external'"));
	}

	#[test]
	fn test_unknown_default_network_rejected() {
		let config = BASE.replace(
			"id = \"offramp-test\"",
			"id = \"offramp-test\"\ndefault_network = \"Polygon\"",
		);
		let err = config.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("Default network 'Polygon'"));
	}

	#[test]
	fn test_zero_gateway_rejected() {
		let config = BASE.replace(
			"0x30F6A8457F8E42371E204a9c103f2Bd42341dD0F",
			"0x0000000000000000000000000000000000000000",
		);
		let err = config.parse::<Config>().unwrap_err();
		assert!(err.to_string().contains("non-zero gateway_address"));
	}

	#[tokio::test]
	async fn test_from_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(BASE.as_bytes()).unwrap();

		let config = Config::from_file(file.path().to_str().unwrap())
			.await
			.unwrap();
		assert_eq!(config.networks.len(), 1);

		let missing = Config::from_file("/nonexistent/offramp.toml").await;
		assert!(matches!(missing, Err(ConfigError::Io(_))));
	}
}
