//! Alloy JSON-RPC chain reader.

use crate::{ChainError, ChainReaderInterface, OrderCreatedFilter, RawLog};
use alloy_primitives::{Address, U256};
use alloy_provider::{Provider, RootProvider};
use alloy_rpc_types::{Filter, Log, TransactionRequest};
use alloy_sol_types::{SolCall, SolEvent};
use alloy_transport_http::Http;
use async_trait::async_trait;
use offramp_types::contracts::{IGateway, IERC20};
use offramp_types::{ConfigSchema, Field, FieldType, NetworksConfig, Schema, ValidationError};
use std::collections::HashMap;

/// Reads chain state over HTTP, one provider per configured network.
pub struct AlloyChainReader {
	providers: HashMap<u64, RootProvider<Http<reqwest::Client>>>,
}

impl AlloyChainReader {
	pub fn new(network_ids: &[u64], networks: &NetworksConfig) -> Result<Self, ChainError> {
		let mut providers = HashMap::new();
		for network_id in network_ids {
			let network = networks.get(network_id).ok_or_else(|| {
				ChainError::Configuration(format!(
					"Network {} not found in configuration",
					network_id
				))
			})?;
			let url = network.rpc_url.parse().map_err(|e| {
				ChainError::Configuration(format!(
					"Invalid RPC URL for network {}: {}",
					network_id, e
				))
			})?;
			providers.insert(*network_id, RootProvider::new_http(url));
		}
		tracing::info!(networks = ?network_ids, "Initialized chain reader");
		Ok(Self { providers })
	}

	fn provider(&self, chain_id: u64) -> Result<&RootProvider<Http<reqwest::Client>>, ChainError> {
		self.providers
			.get(&chain_id)
			.ok_or(ChainError::UnsupportedChain(chain_id))
	}
}

fn to_raw_log(log: &Log) -> RawLog {
	RawLog {
		address: log.address(),
		topics: log.topics().to_vec(),
		data: log.data().data.clone(),
		block_number: log.block_number,
		transaction_hash: log.transaction_hash,
	}
}

/// `eth_getLogs` filter: gateway address, event signature, indexed sender
/// (topic 1) and token (topic 2).
fn build_filter(filter: &OrderCreatedFilter) -> Filter {
	Filter::new()
		.address(filter.gateway)
		.event_signature(IGateway::OrderCreated::SIGNATURE_HASH)
		.topic1(filter.sender.into_word())
		.topic2(filter.token.into_word())
		.from_block(filter.from_block)
		.to_block(filter.to_block)
}

pub struct AlloyChainReaderSchema;

impl ConfigSchema for AlloyChainReaderSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(
			vec![Field::new(
				"network_ids",
				FieldType::Array(Box::new(FieldType::Integer {
					min: Some(1),
					max: None,
				})),
			)
			.with_validator(|value| match value.as_array() {
				Some(ids) if !ids.is_empty() => Ok(()),
				_ => Err("network_ids cannot be empty".to_string()),
			})],
			vec![],
		)
		.validate(config)
	}
}

#[async_trait]
impl ChainReaderInterface for AlloyChainReader {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(AlloyChainReaderSchema)
	}

	async fn block_number(&self, chain_id: u64) -> Result<u64, ChainError> {
		let head = self
			.provider(chain_id)?
			.get_block_number()
			.await
			.map_err(|e| {
				tracing::warn!(chain_id, error = %e, "eth_blockNumber failed");
				ChainError::Network(format!("Failed to get block number: {}", e))
			})?;
		tracing::trace!(chain_id, head, "Read block number");
		Ok(head)
	}

	async fn order_created_logs(
		&self,
		chain_id: u64,
		filter: &OrderCreatedFilter,
	) -> Result<Vec<RawLog>, ChainError> {
		let logs = self
			.provider(chain_id)?
			.get_logs(&build_filter(filter))
			.await
			.map_err(|e| {
				tracing::warn!(chain_id, error = %e, "eth_getLogs failed");
				ChainError::Network(format!("Failed to get logs: {}", e))
			})?;

		tracing::debug!(
			chain_id,
			from_block = filter.from_block,
			to_block = filter.to_block,
			found = logs.len(),
			"Queried OrderCreated logs"
		);
		Ok(logs.iter().map(to_raw_log).collect())
	}

	async fn token_balance(
		&self,
		chain_id: u64,
		token: Address,
		owner: Address,
	) -> Result<U256, ChainError> {
		let call_data = IERC20::balanceOfCall { account: owner }.abi_encode();
		let result = self
			.provider(chain_id)?
			.call(
				&TransactionRequest::default()
					.to(token)
					.input(call_data.into()),
			)
			.await
			.map_err(|e| {
				tracing::warn!(chain_id, %token, error = %e, "balanceOf call failed");
				ChainError::Network(format!("Failed to call balanceOf: {}", e))
			})?;

		if result.len() < 32 {
			return Err(ChainError::Decode("Invalid balanceOf response".to_string()));
		}
		Ok(U256::from_be_slice(&result[..32]))
	}
}

/// Builds an [`AlloyChainReader`] for `network_ids`.
pub fn create_alloy_reader(
	config: &toml::Value,
	networks: &NetworksConfig,
) -> Result<Box<dyn ChainReaderInterface>, ChainError> {
	AlloyChainReaderSchema
		.validate(config)
		.map_err(|e| ChainError::Configuration(format!("Invalid configuration: {}", e)))?;

	let network_ids: Vec<u64> = config
		.get("network_ids")
		.and_then(|v| v.as_array())
		.map(|ids| ids.iter().filter_map(|v| v.as_integer().map(|i| i as u64)).collect())
		.unwrap_or_default();

	Ok(Box::new(AlloyChainReader::new(&network_ids, networks)?))
}

pub struct Registry;

impl offramp_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "evm_alloy";
	type Factory = crate::ChainReaderFactory;

	fn factory() -> Self::Factory {
		create_alloy_reader
	}
}

impl crate::ChainReaderRegistry for Registry {}
