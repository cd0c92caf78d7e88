//! In-memory collaborators and fixtures.
//!
//! `MockWallet` and `MockChainReader` stand in for the alloy implementations
//! so the whole pipeline can run without a node. `TestEngine` wires them into
//! a [`PaymentEngine`] on a two-network configuration (Base and Optimism).

use crate::engine::event_bus::EventBus;
use crate::PaymentEngine;
use alloy_primitives::{Address, B256, U256};
use alloy_sol_types::SolEvent;
use async_trait::async_trait;
use offramp_aggregator::implementations::static_key::StaticAggregator;
use offramp_aggregator::AggregatorService;
use offramp_chain::{ChainError, ChainReaderInterface, ChainService, OrderCreatedFilter, RawLog};
use offramp_config::{Config, ConfigBuilder, PollingConfig};
use offramp_encryption::implementations::ecies::EciesEncryption;
use offramp_encryption::EncryptionService;
use offramp_types::contracts::IGateway;
use offramp_types::{
	Call, ConfigSchema, PaymentRequest, PublicKey, RecipientInfo, Schema, SubmissionReceipt,
	ValidationError,
};
use offramp_wallet::{WalletError, WalletInterface, WalletService};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, Notify};

pub const BASE_CHAIN_ID: u64 = 8453;
pub const OPTIMISM_CHAIN_ID: u64 = 10;

/// The secp256k1 generator point, a valid compressed public key.
pub const TEST_PUBLIC_KEY: &str =
	"0x0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";

pub fn gateway() -> Address {
	Address::repeat_byte(0x6a)
}

pub fn usdc() -> Address {
	Address::repeat_byte(0xc1)
}

pub fn usdt() -> Address {
	Address::repeat_byte(0xc2)
}

/// Address of the mock smart wallet.
pub fn sender() -> Address {
	Address::repeat_byte(0x5a)
}

/// Base (USDC, USDT) and Optimism (USDC only), with Base active.
pub fn test_config() -> Config {
	test_config_with(PollingConfig::default())
}

pub fn test_config_with(polling: PollingConfig) -> Config {
	ConfigBuilder::new()
		.network(
			BASE_CHAIN_ID,
			"Base",
			gateway(),
			&[("USDC", usdc(), 6), ("USDT", usdt(), 6)],
		)
		.network(
			OPTIMISM_CHAIN_ID,
			"Optimism",
			Address::repeat_byte(0x6b),
			&[("USDC", Address::repeat_byte(0xd1), 6)],
		)
		.default_network("Base")
		.polling(polling)
		.build()
}

pub fn recipient() -> RecipientInfo {
	RecipientInfo::new("0123456789", "Ada Obi", "GTBINGLA", None)
}

/// A request for `amount` of `symbol` at a rate of 1500.
pub fn payment_request(amount: &str, symbol: &str) -> PaymentRequest {
	PaymentRequest {
		amount: Decimal::from_str(amount).expect("fixture amount must be a decimal"),
		token_symbol: symbol.to_string(),
		rate: Decimal::from(1500),
		recipient: recipient(),
	}
}

pub fn aggregator_service() -> Arc<AggregatorService> {
	Arc::new(AggregatorService::single(
		"static",
		Arc::new(StaticAggregator::new(PublicKey::new(TEST_PUBLIC_KEY))),
	))
}

pub fn encryption_service() -> Arc<EncryptionService> {
	Arc::new(EncryptionService::single("ecies", Arc::new(EciesEncryption)))
}

/// An `OrderCreated` log emitted by [`gateway`] in `block`.
pub fn order_created_log(sender: Address, token: Address, order_id: B256, block: u64) -> RawLog {
	let event = IGateway::OrderCreated {
		sender,
		token,
		amount: U256::from(100_000_000u64),
		protocolFee: U256::ZERO,
		orderId: order_id,
		rate: U256::from(1500u64),
		messageHash: "AQID".to_string(),
	};
	let data = event.encode_log_data();

	RawLog {
		address: gateway(),
		topics: data.topics().to_vec(),
		data: data.data.clone(),
		block_number: Some(block),
		transaction_hash: Some(B256::repeat_byte(0xee)),
	}
}

struct NoSettings;

impl ConfigSchema for NoSettings {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

/// Wallet that records submissions instead of sending them.
pub struct MockWallet {
	address: Address,
	chains: HashSet<u64>,
	active: Mutex<Option<u64>>,
	rejection: Mutex<Option<String>>,
	hold: Mutex<Option<Arc<Notify>>>,
	submissions: Mutex<Vec<Vec<Call>>>,
}

impl MockWallet {
	pub fn new(address: Address, chains: &[u64]) -> Self {
		Self {
			address,
			chains: chains.iter().copied().collect(),
			active: Mutex::new(None),
			rejection: Mutex::new(None),
			hold: Mutex::new(None),
			submissions: Mutex::new(Vec::new()),
		}
	}

	/// Makes every following submission fail with `reason`.
	pub async fn reject_with(&self, reason: impl Into<String>) {
		*self.rejection.lock().await = Some(reason.into());
	}

	pub async fn accept(&self) {
		*self.rejection.lock().await = None;
	}

	/// The next submission waits for the returned handle before the wallet
	/// answers. Later ones are not held.
	pub async fn hold_next_submission(&self) -> Arc<Notify> {
		let notify = Arc::new(Notify::new());
		*self.hold.lock().await = Some(notify.clone());
		notify
	}

	pub async fn submissions(&self) -> Vec<Vec<Call>> {
		self.submissions.lock().await.clone()
	}

	pub async fn active_chain_id(&self) -> Option<u64> {
		*self.active.lock().await
	}
}

#[async_trait]
impl WalletInterface for MockWallet {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(NoSettings)
	}

	fn address(&self) -> Address {
		self.address
	}

	async fn active_chain(&self) -> Option<u64> {
		*self.active.lock().await
	}

	async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError> {
		if !self.chains.contains(&chain_id) {
			return Err(WalletError::UnsupportedChain(chain_id));
		}
		*self.active.lock().await = Some(chain_id);
		Ok(())
	}

	async fn submit(&self, calls: Vec<Call>) -> Result<SubmissionReceipt, WalletError> {
		let chain_id = (*self.active.lock().await)
			.ok_or_else(|| WalletError::Rejected("no active chain".to_string()))?;
		let hold = self.hold.lock().await.take();
		if let Some(hold) = hold {
			hold.notified().await;
		}
		if let Some(reason) = self.rejection.lock().await.clone() {
			return Err(WalletError::Rejected(reason));
		}

		let mut submissions = self.submissions.lock().await;
		submissions.push(calls);
		Ok(SubmissionReceipt {
			tx_hash: B256::with_last_byte(submissions.len() as u8),
			chain_id,
		})
	}
}

/// Chain reader over an in-memory head, log list and balance table.
pub struct MockChainReader {
	head: Mutex<u64>,
	logs: Mutex<Vec<RawLog>>,
	balances: Mutex<HashMap<(Address, Address), U256>>,
	failures: Mutex<u32>,
	hold: Mutex<Option<Arc<Notify>>>,
	balance_hold: Mutex<Option<Arc<Notify>>>,
	last_filter: Mutex<Option<OrderCreatedFilter>>,
	block_queries: AtomicUsize,
	log_queries: AtomicUsize,
	balance_queries: AtomicUsize,
}

impl MockChainReader {
	pub fn new(head: u64) -> Self {
		Self {
			head: Mutex::new(head),
			logs: Mutex::new(Vec::new()),
			balances: Mutex::new(HashMap::new()),
			failures: Mutex::new(0),
			hold: Mutex::new(None),
			balance_hold: Mutex::new(None),
			last_filter: Mutex::new(None),
			block_queries: AtomicUsize::new(0),
			log_queries: AtomicUsize::new(0),
			balance_queries: AtomicUsize::new(0),
		}
	}

	pub async fn set_head(&self, head: u64) {
		*self.head.lock().await = head;
	}

	pub async fn push_log(&self, log: RawLog) {
		self.logs.lock().await.push(log);
	}

	pub async fn set_balance(&self, token: Address, owner: Address, amount: U256) {
		self.balances.lock().await.insert((token, owner), amount);
	}

	/// The next `count` block-height reads fail with a network error.
	pub async fn fail_next_queries(&self, count: u32) {
		*self.failures.lock().await = count;
	}

	/// Log queries block until the returned handle is notified, once per query.
	pub async fn hold_log_queries(&self) -> Arc<Notify> {
		let notify = Arc::new(Notify::new());
		*self.hold.lock().await = Some(notify.clone());
		notify
	}

	/// The next balance read blocks until the returned handle is notified.
	pub async fn hold_next_balance_query(&self) -> Arc<Notify> {
		let notify = Arc::new(Notify::new());
		*self.balance_hold.lock().await = Some(notify.clone());
		notify
	}

	pub async fn last_filter(&self) -> Option<OrderCreatedFilter> {
		*self.last_filter.lock().await
	}

	pub fn block_queries(&self) -> usize {
		self.block_queries.load(Ordering::SeqCst)
	}

	pub fn log_queries(&self) -> usize {
		self.log_queries.load(Ordering::SeqCst)
	}

	pub fn balance_queries(&self) -> usize {
		self.balance_queries.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl ChainReaderInterface for MockChainReader {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(NoSettings)
	}

	async fn block_number(&self, _chain_id: u64) -> Result<u64, ChainError> {
		self.block_queries.fetch_add(1, Ordering::SeqCst);
		let mut failures = self.failures.lock().await;
		if *failures > 0 {
			*failures -= 1;
			return Err(ChainError::Network("connection reset".to_string()));
		}
		Ok(*self.head.lock().await)
	}

	async fn order_created_logs(
		&self,
		_chain_id: u64,
		filter: &OrderCreatedFilter,
	) -> Result<Vec<RawLog>, ChainError> {
		self.log_queries.fetch_add(1, Ordering::SeqCst);
		*self.last_filter.lock().await = Some(*filter);

		let hold = self.hold.lock().await.clone();
		if let Some(hold) = hold {
			hold.notified().await;
		}

		let sender = filter.sender.into_word();
		let token = filter.token.into_word();
		Ok(self
			.logs
			.lock()
			.await
			.iter()
			.filter(|log| {
				log.address == filter.gateway
					&& log.topics.get(1) == Some(&sender)
					&& log.topics.get(2) == Some(&token)
					&& log
						.block_number
						.is_some_and(|b| b >= filter.from_block && b <= filter.to_block)
			})
			.cloned()
			.collect())
	}

	async fn token_balance(
		&self,
		_chain_id: u64,
		token: Address,
		owner: Address,
	) -> Result<U256, ChainError> {
		let hold = self.balance_hold.lock().await.take();
		self.balance_queries.fetch_add(1, Ordering::SeqCst);
		if let Some(hold) = hold {
			hold.notified().await;
		}
		Ok(self
			.balances
			.lock()
			.await
			.get(&(token, owner))
			.copied()
			.unwrap_or(U256::ZERO))
	}
}

/// A [`PaymentEngine`] wired to mocks.
pub struct TestEngine {
	pub engine: Arc<PaymentEngine>,
	pub wallet: Arc<MockWallet>,
	pub chain: Arc<MockChainReader>,
}

impl TestEngine {
	pub async fn new() -> Self {
		Self::build(PollingConfig::default(), true)
	}

	pub async fn with_polling(polling: PollingConfig) -> Self {
		Self::build(polling, true)
	}

	/// Engine with no wallet connected.
	pub async fn without_wallet() -> Self {
		Self::build(PollingConfig::default(), false)
	}

	fn build(polling: PollingConfig, connect_wallet: bool) -> Self {
		let wallet = Arc::new(MockWallet::new(
			sender(),
			&[BASE_CHAIN_ID, OPTIMISM_CHAIN_ID],
		));
		let chain = Arc::new(MockChainReader::new(0));

		let wallet_service =
			connect_wallet.then(|| Arc::new(WalletService::new(wallet.clone(), None)));
		let engine = PaymentEngine::new(
			test_config_with(polling),
			aggregator_service(),
			encryption_service(),
			wallet_service,
			ChainService::new(chain.clone()),
			EventBus::new(256),
		)
		.expect("test configuration is valid");

		Self {
			engine: Arc::new(engine),
			wallet,
			chain,
		}
	}

	/// Gives the mock wallet `whole` tokens of a 6-decimal `token`.
	pub async fn fund(&self, token: Address, whole: u64) {
		self.chain
			.set_balance(token, sender(), U256::from(whole) * U256::from(1_000_000u64))
			.await;
	}
}
