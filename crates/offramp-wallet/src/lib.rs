//! Wallet clients.
//!
//! A wallet switches to a chain and submits a list of calls as one request.
//! The pipeline works with a primary smart wallet that signs and pays, plus an
//! optional linked external wallet that must follow the primary across chain
//! switches.

use async_trait::async_trait;
use offramp_types::{
	Address, Call, ConfigSchema, ImplementationRegistry, NetworksConfig, SubmissionReceipt,
};
use std::sync::Arc;
use thiserror::Error;

pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
}

/// Errors that can occur in wallet operations.
#[derive(Debug, Error)]
pub enum WalletError {
	#[error("Chain {0} is not supported by this wallet")]
	UnsupportedChain(u64),
	#[error("Chain switch failed: {0}")]
	ChainSwitch(String),
	/// The wallet refused to sign or send.
	#[error("Rejected: {0}")]
	Rejected(String),
	/// Simulation or execution reverted.
	#[error("Reverted: {0}")]
	Reverted(String),
	#[error("Network error: {0}")]
	Network(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// A wallet able to follow chain switches and submit calls.
#[async_trait]
pub trait WalletInterface: Send + Sync {
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Address that appears as `msg.sender` of submitted calls.
	fn address(&self) -> Address;

	/// Chain the wallet currently submits to, if any.
	async fn active_chain(&self) -> Option<u64>;

	/// Makes `chain_id` the active chain. Succeeds immediately when it already is.
	async fn switch_chain(&self, chain_id: u64) -> Result<(), WalletError>;

	/// Submits all `calls` as a single request on the active chain.
	async fn submit(&self, calls: Vec<Call>) -> Result<SubmissionReceipt, WalletError>;
}

/// Factory building a wallet from its configuration table.
pub type WalletFactory =
	fn(&toml::Value, &NetworksConfig) -> Result<Box<dyn WalletInterface>, WalletError>;

pub trait WalletRegistry: ImplementationRegistry<Factory = WalletFactory> {}

pub fn get_all_implementations() -> Vec<(&'static str, WalletFactory)> {
	use implementations::evm::alloy;

	vec![
		(alloy::SmartAccountRegistry::NAME, alloy::SmartAccountRegistry::factory()),
		(alloy::ExternalRegistry::NAME, alloy::ExternalRegistry::factory()),
	]
}

/// The connected wallets: the primary smart wallet and an optional linked
/// external wallet.
pub struct WalletService {
	primary: Arc<dyn WalletInterface>,
	linked: Option<Arc<dyn WalletInterface>>,
}

impl WalletService {
	pub fn new(primary: Arc<dyn WalletInterface>, linked: Option<Arc<dyn WalletInterface>>) -> Self {
		Self { primary, linked }
	}

	/// Address of the primary wallet.
	pub fn address(&self) -> Address {
		self.primary.address()
	}

	pub fn linked_address(&self) -> Option<Address> {
		self.linked.as_ref().map(|w| w.address())
	}

	/// Switches the primary and then the linked wallet to `chain_id`.
	///
	/// Returns only once both report the chain as active.
	pub async fn switch_all(&self, chain_id: u64) -> Result<(), WalletError> {
		self.primary.switch_chain(chain_id).await?;
		if let Some(linked) = &self.linked {
			linked.switch_chain(chain_id).await?;
		}
		tracing::debug!(chain_id, "Wallets on target chain");
		Ok(())
	}

	/// Submits through the primary wallet.
	pub async fn submit(&self, calls: Vec<Call>) -> Result<SubmissionReceipt, WalletError> {
		self.primary.submit(calls).await
	}
}
