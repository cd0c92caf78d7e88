//! Session context for the payment engine.
//!
//! Holds what the pipeline would otherwise read from ambient state: the
//! network registry and the selected network, the connected wallet, and a
//! cache of token balances keyed by chain and token.

use super::EngineError;
use crate::order::OrderParamsBuilder;
use crate::PaymentError;
use alloy_primitives::{Address, U256};
use offramp_chain::ChainService;
use offramp_types::{format_token_amount, truncate_id, NetworkRef, NetworkRegistry, TokenConfig};
use offramp_wallet::WalletService;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// The network new payments are made on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveNetwork {
	pub name: String,
	pub chain_id: u64,
	pub gateway: Address,
}

impl From<NetworkRef<'_>> for ActiveNetwork {
	fn from(network: NetworkRef<'_>) -> Self {
		Self {
			name: network.config.name.clone(),
			chain_id: network.chain_id,
			gateway: network.config.gateway_address,
		}
	}
}

/// Balance of the connected wallet in one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenBalance {
	pub symbol: String,
	pub chain_id: u64,
	pub token: Address,
	pub decimals: u8,
	/// In the token's smallest unit.
	pub amount: U256,
}

impl TokenBalance {
	/// Amount in whole tokens, e.g. "150.25".
	pub fn formatted(&self) -> String {
		format_token_amount(self.amount, self.decimals)
	}
}

pub struct SessionContext {
	networks: NetworkRegistry,
	active: RwLock<ActiveNetwork>,
	wallet: Option<Arc<WalletService>>,
	chain: ChainService,
	balances: RwLock<HashMap<(u64, Address), U256>>,
}

impl SessionContext {
	pub fn new(
		networks: NetworkRegistry,
		initial_network: &str,
		wallet: Option<Arc<WalletService>>,
		chain: ChainService,
	) -> Result<Self, EngineError> {
		let active = networks
			.network_by_name(initial_network)
			.map(ActiveNetwork::from)
			.ok_or_else(|| EngineError::UnknownNetwork(initial_network.to_string()))?;

		Ok(Self {
			networks,
			active: RwLock::new(active),
			wallet,
			chain,
			balances: RwLock::new(HashMap::new()),
		})
	}

	pub fn networks(&self) -> &NetworkRegistry {
		&self.networks
	}

	pub async fn active_network(&self) -> ActiveNetwork {
		self.active.read().await.clone()
	}

	/// Makes the network called `name` active. Matching ignores case.
	pub async fn select_network(&self, name: &str) -> Result<ActiveNetwork, EngineError> {
		let network = self
			.networks
			.network_by_name(name)
			.map(ActiveNetwork::from)
			.ok_or_else(|| EngineError::UnknownNetwork(name.to_string()))?;

		let mut active = self.active.write().await;
		if *active != network {
			tracing::info!(
				from = %active.name,
				to = %network.name,
				chain_id = network.chain_id,
				"Network selected"
			);
			*active = network.clone();
		}
		Ok(network)
	}

	pub fn wallet(&self) -> Option<&Arc<WalletService>> {
		self.wallet.as_ref()
	}

	pub fn wallet_address(&self) -> Option<Address> {
		self.wallet.as_ref().map(|w| w.address())
	}

	/// Resolves `symbol` on the active network.
	pub async fn resolve_token(&self, symbol: &str) -> Result<TokenConfig, PaymentError> {
		let active = self.active.read().await;
		OrderParamsBuilder::new(&self.networks, &active.name)
			.resolve_token(symbol)
			.cloned()
	}

	/// Last balance read for `token`, if any.
	pub async fn cached_balance(&self, chain_id: u64, token: Address) -> Option<U256> {
		self.balances.read().await.get(&(chain_id, token)).copied()
	}

	/// Reads the balance from the chain and updates the cache.
	pub async fn refresh_balance(&self, chain_id: u64, token: Address) -> Result<U256, EngineError> {
		let owner = self.wallet_address().ok_or(PaymentError::NoWallet)?;
		let amount = self
			.chain
			.token_balance(chain_id, token, owner)
			.await
			.map_err(|e| EngineError::Chain(e.to_string()))?;

		self.balances.write().await.insert((chain_id, token), amount);
		tracing::debug!(
			chain_id,
			token = %truncate_id(&token.to_string()),
			%amount,
			"Balance refreshed"
		);
		Ok(amount)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{sender, test_config, usdc, MockChainReader, MockWallet, BASE_CHAIN_ID};

	fn context(chain: &Arc<MockChainReader>, with_wallet: bool) -> SessionContext {
		let wallet = with_wallet.then(|| {
			Arc::new(WalletService::new(
				Arc::new(MockWallet::new(sender(), &[BASE_CHAIN_ID])),
				None,
			))
		});
		SessionContext::new(
			test_config().network_registry(),
			"Base",
			wallet,
			ChainService::new(chain.clone()),
		)
		.unwrap()
	}

	#[tokio::test]
	async fn test_select_network() {
		let chain = Arc::new(MockChainReader::new(0));
		let context = context(&chain, true);
		assert_eq!(context.active_network().await.chain_id, BASE_CHAIN_ID);

		let selected = context.select_network("optimism").await.unwrap();
		assert_eq!(selected.name, "Optimism");
		assert_eq!(selected.chain_id, 10);
		assert_eq!(context.active_network().await, selected);

		assert!(matches!(
			context.select_network("Solana").await,
			Err(EngineError::UnknownNetwork(_))
		));
		assert_eq!(context.active_network().await.chain_id, 10);
	}

	#[tokio::test]
	async fn test_token_resolution_follows_active_network() {
		let chain = Arc::new(MockChainReader::new(0));
		let context = context(&chain, true);
		assert_eq!(context.resolve_token("USDT").await.unwrap().decimals, 6);

		context.select_network("Optimism").await.unwrap();
		assert!(matches!(
			context.resolve_token("USDT").await,
			Err(PaymentError::UnsupportedToken { .. })
		));
	}

	#[tokio::test]
	async fn test_balance_cache() {
		let chain = Arc::new(MockChainReader::new(0));
		chain
			.set_balance(usdc(), sender(), U256::from(150_000_000u64))
			.await;
		let context = context(&chain, true);

		assert_eq!(context.cached_balance(BASE_CHAIN_ID, usdc()).await, None);
		assert_eq!(
			context.refresh_balance(BASE_CHAIN_ID, usdc()).await.unwrap(),
			U256::from(150_000_000u64)
		);

		// Cached value stays put until the next refresh.
		chain.set_balance(usdc(), sender(), U256::from(50_000_000u64)).await;
		assert_eq!(
			context.cached_balance(BASE_CHAIN_ID, usdc()).await,
			Some(U256::from(150_000_000u64))
		);
		assert_eq!(
			context.refresh_balance(BASE_CHAIN_ID, usdc()).await.unwrap(),
			U256::from(50_000_000u64)
		);
		assert_eq!(
			context.cached_balance(BASE_CHAIN_ID, usdc()).await,
			Some(U256::from(50_000_000u64))
		);
	}

	#[tokio::test]
	async fn test_balance_without_wallet() {
		let chain = Arc::new(MockChainReader::new(0));
		let context = context(&chain, false);
		assert!(matches!(
			context.refresh_balance(BASE_CHAIN_ID, usdc()).await,
			Err(EngineError::Payment(PaymentError::NoWallet))
		));
	}

	#[test]
	fn test_formatted_balance() {
		let balance = TokenBalance {
			symbol: "USDC".to_string(),
			chain_id: BASE_CHAIN_ID,
			token: usdc(),
			decimals: 6,
			amount: U256::from(150_250_000u64),
		};
		assert_eq!(balance.formatted(), "150.25");
	}
}
