//! Aggregator key service.
//!
//! The aggregator is the off-chain party that decrypts the recipient payload
//! and executes the fiat payout. Before every order the pipeline asks it for
//! the public key the payload must be encrypted under.

use async_trait::async_trait;
use offramp_types::{ConfigSchema, ImplementationRegistry, PublicKey};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

pub mod implementations {
	pub mod http;
	pub mod static_key;
}

/// Errors that can occur while fetching the aggregator key.
#[derive(Debug, Error)]
pub enum AggregatorError {
	#[error("Network error: {0}")]
	Network(String),
	#[error("Invalid response: {0}")]
	InvalidResponse(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Source of the aggregator's public key.
#[async_trait]
pub trait AggregatorInterface: Send + Sync {
	/// Schema of this implementation's configuration table.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Fetches the key recipient payloads are encrypted under.
	async fn fetch_public_key(&self) -> Result<PublicKey, AggregatorError>;
}

/// Factory building an aggregator client from its configuration table.
pub type AggregatorFactory =
	fn(&toml::Value) -> Result<Box<dyn AggregatorInterface>, AggregatorError>;

pub trait AggregatorRegistry: ImplementationRegistry<Factory = AggregatorFactory> {}

/// Every built-in aggregator implementation as `(name, factory)`.
pub fn get_all_implementations() -> Vec<(&'static str, AggregatorFactory)> {
	use implementations::{http, static_key};

	vec![
		(http::Registry::NAME, http::Registry::factory()),
		(static_key::Registry::NAME, static_key::Registry::factory()),
	]
}

/// Routes key requests to the configured primary implementation.
pub struct AggregatorService {
	implementations: HashMap<String, Arc<dyn AggregatorInterface>>,
	primary: String,
}

impl AggregatorService {
	pub fn new(
		implementations: HashMap<String, Arc<dyn AggregatorInterface>>,
		primary: String,
	) -> Result<Self, AggregatorError> {
		if !implementations.contains_key(&primary) {
			return Err(AggregatorError::Configuration(format!(
				"Primary implementation '{}' not found in available implementations",
				primary
			)));
		}

		Ok(Self {
			implementations,
			primary,
		})
	}

	/// Service backed by a single implementation.
	pub fn single(name: impl Into<String>, implementation: Arc<dyn AggregatorInterface>) -> Self {
		let primary = name.into();
		Self {
			implementations: HashMap::from([(primary.clone(), implementation)]),
			primary,
		}
	}

	pub async fn fetch_public_key(&self) -> Result<PublicKey, AggregatorError> {
		let implementation = self.implementations.get(&self.primary).ok_or_else(|| {
			AggregatorError::Configuration(format!(
				"Primary implementation '{}' not available",
				self.primary
			))
		})?;

		implementation.fetch_public_key().await
	}
}
