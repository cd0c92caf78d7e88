//! Alloy-backed EVM wallets.
//!
//! An owner key signs every transaction. Configured with a
//! `smart_account_address`, the wallet wraps submitted calls into one
//! `executeBatch` call on the smart account, so approval and order creation
//! execute in the same transaction. Without a smart account the wallet is a
//! plain externally owned account and submits exactly one call.

use crate::{WalletError, WalletInterface};
use alloy_network::EthereumWallet;
use alloy_primitives::{Address, Bytes, U256};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::TransactionRequest;
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::SolCall;
use alloy_transport_http::Http;
use async_trait::async_trait;
use offramp_types::contracts::{ISmartAccount, SmartAccountCall};
use offramp_types::{
	truncate_id, Call, ConfigSchema, Field, FieldType, NetworksConfig, Schema, SecretString,
	SubmissionReceipt, ValidationError,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

type HttpProvider = Arc<dyn Provider<Http<reqwest::Client>> + Send + Sync>;

const MAX_REASON_LEN: usize = 160;

/// First line of an error, capped for display to the user.
fn short_reason(err: impl std::fmt::Display) -> String {
	let text = err.to_string();
	let line = text.lines().next().unwrap_or_default().trim();
	if line.chars().count() > MAX_REASON_LEN {
		let head: String = line.chars().take(MAX_REASON_LEN).collect();
		format!("{}...", head)
	} else {
		line.to_string()
	}
}

pub struct AlloyWallet {
	providers: HashMap<u64, HttpProvider>,
	owner: Address,
	smart_account: Option<Address>,
	active_chain: RwLock<Option<u64>>,
}

impl AlloyWallet {
	/// Creates one signing provider per network in `network_ids`.
	pub fn new(
		network_ids: &[u64],
		networks: &NetworksConfig,
		signer: PrivateKeySigner,
		smart_account: Option<Address>,
	) -> Result<Self, WalletError> {
		if network_ids.is_empty() {
			return Err(WalletError::Configuration(
				"At least one network_id must be specified".to_string(),
			));
		}

		let owner = signer.address();
		let mut providers = HashMap::new();
		for network_id in network_ids {
			let network = networks.get(network_id).ok_or_else(|| {
				WalletError::Configuration(format!(
					"Network {} not found in configuration",
					network_id
				))
			})?;
			let url = network.rpc_url.parse().map_err(|e| {
				WalletError::Configuration(format!(
					"Invalid RPC URL for network {}: {}",
					network_id, e
				))
			})?;

			let wallet = EthereumWallet::from(signer.clone().with_chain_id(Some(*network_id)));
			let provider = ProviderBuilder::new()
				.with_recommended_fillers()
				.wallet(wallet)
				.on_http(url);

			providers.insert(*network_id, Arc::new(provider) as HttpProvider);
		}

		Ok(Self {
			providers,
			owner,
			smart_account,
			active_chain: RwLock::new(None),
		})
	}

	fn provider(&self, chain_id: u64) -> Result<&HttpProvider, WalletError> {
		self.providers
			.get(&chain_id)
			.ok_or(WalletError::UnsupportedChain(chain_id))
	}

	/// Turns `calls` into the transaction this wallet sends.
	fn build_request(&self, calls: Vec<Call>) -> Result<TransactionRequest, WalletError> {
		match (self.smart_account, calls.len()) {
			(_, 0) => Err(WalletError::Rejected("Nothing to submit".to_string())),
			(Some(account), _) => Ok(batch_request(self.owner, account, calls)),
			(None, 1) => {
				let call = &calls[0];
				Ok(TransactionRequest::default()
					.from(self.owner)
					.to(call.to)
					.value(call.value)
					.input(call.data.clone().into()))
			},
			(None, n) => Err(WalletError::Rejected(format!(
				"{} calls need a smart account to execute atomically",
				n
			))),
		}
	}
}

/// One `executeBatch` transaction from `owner` to the smart account.
fn batch_request(owner: Address, account: Address, calls: Vec<Call>) -> TransactionRequest {
	let value = calls.iter().fold(U256::ZERO, |acc, c| acc.saturating_add(c.value));
	let batch = ISmartAccount::executeBatchCall {
		calls: calls
			.into_iter()
			.map(|c| SmartAccountCall {
				target: c.to,
				value: c.value,
				data: c.data,
			})
			.collect(),
	};

	TransactionRequest::default()
		.from(owner)
		.to(account)
		.value(value)
		.input(Bytes::from(batch.abi_encode()).into())
}

pub struct AlloyWalletSchema {
	require_smart_account: bool,
}

impl AlloyWalletSchema {
	pub fn validate_config(
		config: &toml::Value,
		require_smart_account: bool,
	) -> Result<(), ValidationError> {
		Self {
			require_smart_account,
		}
		.validate(config)
	}
}

impl ConfigSchema for AlloyWalletSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let mut required = vec![
			Field::new(
				"network_ids",
				FieldType::Array(Box::new(FieldType::Integer {
					min: Some(1),
					max: None,
				})),
			)
			.with_validator(|value| match value.as_array() {
				Some(ids) if !ids.is_empty() => Ok(()),
				_ => Err("network_ids cannot be empty".to_string()),
			}),
			Field::new("owner_private_key", FieldType::String),
		];
		let mut optional = vec![];

		let account = Field::new("smart_account_address", FieldType::Address);
		if self.require_smart_account {
			required.push(account);
		} else {
			optional.push(account);
		}

		Schema::new(required, optional).validate(config)
	}
}

#[async_trait]
impl WalletInterface for AlloyWallet {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(AlloyWalletSchema {
			require_smart_account: self.smart_account.is_some(),
		})
	}

	fn address(&self) -> Address {
		self.smart_account.unwrap_or(self.owner)
	}

	async fn active_chain(&self) -> Option<u64> {
		*self.active_chain.read().await
	}

	async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError> {
		if self.active_chain().await == Some(chain_id) {
			return Ok(());
		}

		let provider = self.provider(chain_id)?;
		let reported = provider
			.get_chain_id()
			.await
			.map_err(|e| WalletError::ChainSwitch(short_reason(e)))?;
		if reported != chain_id {
			return Err(WalletError::ChainSwitch(format!(
				"RPC endpoint reports chain {}, expected {}",
				reported, chain_id
			)));
		}

		*self.active_chain.write().await = Some(chain_id);
		tracing::info!(chain_id, wallet = %self.address(), "Switched chain");
		Ok(())
	}

	async fn submit(&self, calls: Vec<Call>) -> Result<SubmissionReceipt, WalletError> {
		let chain_id = self
			.active_chain()
			.await
			.ok_or_else(|| WalletError::ChainSwitch("No active chain".to_string()))?;
		let provider = self.provider(chain_id)?;
		let call_count = calls.len();
		let request = self.build_request(calls)?;

		// Simulate first so reverts surface before anything is signed.
		provider
			.call(&request)
			.await
			.map_err(|e| WalletError::Reverted(short_reason(e)))?;

		let pending = provider
			.send_transaction(request)
			.await
			.map_err(|e| WalletError::Rejected(short_reason(e)))?;
		let tx_hash = *pending.tx_hash();

		tracing::info!(
			tx_hash = %truncate_id(&tx_hash.to_string()),
			chain_id,
			calls = call_count,
			"Submitted transaction"
		);

		Ok(SubmissionReceipt { tx_hash, chain_id })
	}
}

fn build_wallet(
	config: &toml::Value,
	networks: &NetworksConfig,
	require_smart_account: bool,
) -> Result<Box<dyn WalletInterface>, WalletError> {
	AlloyWalletSchema::validate_config(config, require_smart_account)
		.map_err(|e| WalletError::Configuration(format!("Invalid configuration: {}", e)))?;

	let network_ids = config
		.get("network_ids")
		.and_then(|v| v.as_array())
		.map(|ids| {
			ids.iter()
				.filter_map(|v| v.as_integer().map(|i| i as u64))
				.collect::<Vec<_>>()
		})
		.ok_or_else(|| WalletError::Configuration("network_ids is required".to_string()))?;

	let private_key = config
		.get("owner_private_key")
		.and_then(|v| v.as_str())
		.map(SecretString::from)
		.ok_or_else(|| WalletError::Configuration("owner_private_key is required".to_string()))?;
	let signer: PrivateKeySigner = private_key.with_exposed(|key| {
		key.parse()
			.map_err(|_| WalletError::Configuration("Invalid owner private key format".to_string()))
	})?;

	let smart_account = match config.get("smart_account_address").and_then(|v| v.as_str()) {
		Some(s) => Some(s.parse::<Address>().map_err(|e| {
			WalletError::Configuration(format!("Invalid smart_account_address: {}", e))
		})?),
		None => None,
	};

	let wallet = AlloyWallet::new(&network_ids, networks, signer, smart_account)?;
	Ok(Box::new(wallet))
}

/// Smart wallet: owner key plus a required `smart_account_address`.
pub fn create_smart_account_wallet(
	config: &toml::Value,
	networks: &NetworksConfig,
) -> Result<Box<dyn WalletInterface>, WalletError> {
	build_wallet(config, networks, true)
}

/// External wallet: a plain key-backed account.
pub fn create_external_wallet(
	config: &toml::Value,
	networks: &NetworksConfig,
) -> Result<Box<dyn WalletInterface>, WalletError> {
	build_wallet(config, networks, false)
}

pub struct SmartAccountRegistry;

impl offramp_types::ImplementationRegistry for SmartAccountRegistry {
	const NAME: &'static str = "smart_account";
	type Factory = crate::WalletFactory;

	fn factory() -> Self::Factory {
		create_smart_account_wallet
	}
}

impl crate::WalletRegistry for SmartAccountRegistry {}

pub struct ExternalRegistry;

impl offramp_types::ImplementationRegistry for ExternalRegistry {
	const NAME: &'static str = "external";
	type Factory = crate::WalletFactory;

	fn factory() -> Self::Factory {
		create_external_wallet
	}
}

impl crate::WalletRegistry for ExternalRegistry {}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::address;
	use offramp_types::{NetworkConfig, TokenConfig};

	const ANVIL_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
	const ANVIL_ADDRESS: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
	const SMART_ACCOUNT: Address = address!("1111111111111111111111111111111111111111");

	fn networks() -> NetworksConfig {
		NetworksConfig::from([(
			31337,
			NetworkConfig {
				name: "Local".to_string(),
				rpc_url: "http://127.0.0.1:8545".to_string(),
				gateway_address: Address::repeat_byte(0x22),
				tokens: vec![TokenConfig {
					symbol: "USDC".to_string(),
					address: Address::repeat_byte(0x33),
					decimals: 6,
				}],
			},
		)])
	}

	fn config(smart_account: bool) -> toml::Value {
		let mut text = format!("network_ids = [31337]\nowner_private_key = \"{}\"\n", ANVIL_KEY);
		if smart_account {
			text.push_str(&format!("smart_account_address = \"{}\"\n", SMART_ACCOUNT));
		}
		toml::from_str(&text).unwrap()
	}

	#[tokio::test]
	async fn test_addresses() {
		let smart = create_smart_account_wallet(&config(true), &networks()).unwrap();
		assert_eq!(smart.address(), SMART_ACCOUNT);

		let external = create_external_wallet(&config(false), &networks()).unwrap();
		assert_eq!(external.address(), ANVIL_ADDRESS);
		assert_eq!(external.active_chain().await, None);
	}

	#[test]
	fn test_smart_account_address_required() {
		let result = create_smart_account_wallet(&config(false), &networks());
		assert!(matches!(result, Err(WalletError::Configuration(_))));
	}

	#[test]
	fn test_unknown_network_rejected() {
		let config: toml::Value = toml::from_str(&format!(
			"network_ids = [1]\nowner_private_key = \"{}\"",
			ANVIL_KEY
		))
		.unwrap();
		assert!(matches!(
			create_external_wallet(&config, &networks()),
			Err(WalletError::Configuration(msg)) if msg.contains("Network 1")
		));
	}

	#[tokio::test]
	async fn test_switch_to_unsupported_chain() {
		let wallet = create_external_wallet(&config(false), &networks()).unwrap();
		assert!(matches!(
			wallet.switch_chain(8453).await,
			Err(WalletError::UnsupportedChain(8453))
		));
	}

	#[tokio::test]
	async fn test_submit_requires_active_chain() {
		let wallet = create_external_wallet(&config(false), &networks()).unwrap();
		let call = Call::new(Address::repeat_byte(0x33), vec![0u8; 4]);
		assert!(matches!(
			wallet.submit(vec![call]).await,
			Err(WalletError::ChainSwitch(_))
		));
	}

	#[test]
	fn test_batch_request_encodes_every_call() {
		let calls = vec![
			Call::new(Address::repeat_byte(0x33), vec![1u8, 2, 3]),
			Call::new(Address::repeat_byte(0x22), vec![4u8]),
		];
		let request = batch_request(ANVIL_ADDRESS, SMART_ACCOUNT, calls.clone());

		assert_eq!(request.from, Some(ANVIL_ADDRESS));
		assert_eq!(request.to, Some(SMART_ACCOUNT.into()));
		let input = request.input.input().cloned().unwrap();
		let decoded = ISmartAccount::executeBatchCall::abi_decode(&input, true).unwrap();
		assert_eq!(decoded.calls.len(), 2);
		assert_eq!(decoded.calls[0].target, calls[0].to);
		assert_eq!(decoded.calls[1].data, calls[1].data);
	}

	#[test]
	fn test_eoa_cannot_batch() {
		let networks = networks();
		let signer: PrivateKeySigner = ANVIL_KEY.parse().unwrap();
		let wallet = AlloyWallet::new(&[31337], &networks, signer, None).unwrap();
		let calls = vec![
			Call::new(Address::repeat_byte(0x33), vec![1u8]),
			Call::new(Address::repeat_byte(0x22), vec![2u8]),
		];
		assert!(matches!(
			wallet.build_request(calls),
			Err(WalletError::Rejected(_))
		));
		assert!(matches!(
			wallet.build_request(vec![]),
			Err(WalletError::Rejected(_))
		));
	}

	#[test]
	fn test_short_reason_keeps_first_line() {
		assert_eq!(short_reason("user rejected\nstack..."), "user rejected");
		let long = "x".repeat(500);
		assert_eq!(short_reason(&long).len(), MAX_REASON_LEN + 3);
	}
}
