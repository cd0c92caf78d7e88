//! Chain read client.
//!
//! Read-only access the pipeline needs: current block height, gateway
//! `OrderCreated` logs for a sender/token pair, decoding of those logs, and
//! ERC-20 balances.

use alloy_primitives::{Address, Bytes, Log as PrimLog, LogData, B256, U256};
use alloy_sol_types::SolEvent;
use async_trait::async_trait;
use offramp_types::contracts::IGateway;
use offramp_types::{ConfigSchema, ImplementationRegistry, NetworksConfig};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
}

#[derive(Debug, Error)]
pub enum ChainError {
	#[error("Chain {0} is not configured")]
	UnsupportedChain(u64),
	#[error("Network error: {0}")]
	Network(String),
	#[error("Decode error: {0}")]
	Decode(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// A log as returned by the node, before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
	pub address: Address,
	pub topics: Vec<B256>,
	pub data: Bytes,
	pub block_number: Option<u64>,
	pub transaction_hash: Option<B256>,
}

/// Query for `OrderCreated` events of one sender and token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderCreatedFilter {
	pub gateway: Address,
	pub sender: Address,
	pub token: Address,
	pub from_block: u64,
	pub to_block: u64,
}

/// Decoded `OrderCreated` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
	pub sender: Address,
	pub token: Address,
	pub amount: U256,
	pub protocol_fee: U256,
	pub order_id: B256,
	pub rate: U256,
	pub message_hash: String,
	pub block_number: Option<u64>,
}

/// Decodes a gateway log into an [`OrderCreatedEvent`].
pub fn decode_order_created(log: &RawLog) -> Result<OrderCreatedEvent, ChainError> {
	let prim_log = PrimLog {
		address: log.address,
		data: LogData::new_unchecked(log.topics.clone(), log.data.clone()),
	};

	let event = IGateway::OrderCreated::decode_log(&prim_log, true)
		.map_err(|e| ChainError::Decode(format!("Failed to decode OrderCreated: {}", e)))?;

	Ok(OrderCreatedEvent {
		sender: event.sender,
		token: event.token,
		amount: event.amount,
		protocol_fee: event.protocolFee,
		order_id: event.orderId,
		rate: event.rate,
		message_hash: event.messageHash.clone(),
		block_number: log.block_number,
	})
}

/// Read access to the chains the service is configured for.
#[async_trait]
pub trait ChainReaderInterface: Send + Sync {
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	async fn block_number(&self, chain_id: u64) -> Result<u64, ChainError>;

	/// Raw `OrderCreated` logs matching `filter`, oldest first.
	async fn order_created_logs(
		&self,
		chain_id: u64,
		filter: &OrderCreatedFilter,
	) -> Result<Vec<RawLog>, ChainError>;

	/// ERC-20 balance of `owner` in the token's smallest unit.
	async fn token_balance(
		&self,
		chain_id: u64,
		token: Address,
		owner: Address,
	) -> Result<U256, ChainError>;
}

pub type ChainReaderFactory =
	fn(&toml::Value, &NetworksConfig) -> Result<Box<dyn ChainReaderInterface>, ChainError>;

pub trait ChainReaderRegistry: ImplementationRegistry<Factory = ChainReaderFactory> {}

pub fn get_all_implementations() -> Vec<(&'static str, ChainReaderFactory)> {
	use implementations::evm::alloy;

	vec![(alloy::Registry::NAME, alloy::Registry::factory())]
}

/// Chain reads through the configured implementation.
#[derive(Clone)]
pub struct ChainService {
	reader: Arc<dyn ChainReaderInterface>,
}

impl ChainService {
	pub fn new(reader: Arc<dyn ChainReaderInterface>) -> Self {
		Self { reader }
	}

	pub async fn block_number(&self, chain_id: u64) -> Result<u64, ChainError> {
		self.reader.block_number(chain_id).await
	}

	pub async fn order_created_logs(
		&self,
		chain_id: u64,
		filter: &OrderCreatedFilter,
	) -> Result<Vec<RawLog>, ChainError> {
		self.reader.order_created_logs(chain_id, filter).await
	}

	pub async fn token_balance(
		&self,
		chain_id: u64,
		token: Address,
		owner: Address,
	) -> Result<U256, ChainError> {
		self.reader.token_balance(chain_id, token, owner).await
	}
}
