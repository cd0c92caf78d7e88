//! Public-key encryption of recipient payloads.
//!
//! The scheme is pluggable. Callers only rely on the contract that the
//! aggregator holding the matching private key can decrypt the output; whether
//! two encryptions of the same input are equal is up to the implementation.

use offramp_types::{ConfigSchema, ImplementationRegistry, PublicKey};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

pub mod implementations {
	pub mod ecies;
	pub mod rsa;
}

#[derive(Debug, Error)]
pub enum EncryptionError {
	#[error("Invalid public key: {0}")]
	InvalidKey(String),
	#[error("Encryption failed: {0}")]
	Cipher(String),
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// An encryption primitive.
pub trait EncryptionInterface: Send + Sync {
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Encrypts `plaintext` under `key`. Fails with
	/// [`EncryptionError::InvalidKey`] when the key cannot be parsed.
	fn encrypt(&self, plaintext: &[u8], key: &PublicKey) -> Result<Vec<u8>, EncryptionError>;
}

pub type EncryptionFactory =
	fn(&toml::Value) -> Result<Box<dyn EncryptionInterface>, EncryptionError>;

pub trait EncryptionRegistry: ImplementationRegistry<Factory = EncryptionFactory> {}

pub fn get_all_implementations() -> Vec<(&'static str, EncryptionFactory)> {
	use implementations::{ecies, rsa};

	vec![
		(ecies::Registry::NAME, ecies::Registry::factory()),
		(rsa::Registry::NAME, rsa::Registry::factory()),
	]
}

/// Encrypts through the configured primary implementation.
pub struct EncryptionService {
	implementations: HashMap<String, Arc<dyn EncryptionInterface>>,
	primary: String,
}

impl EncryptionService {
	pub fn new(
		implementations: HashMap<String, Arc<dyn EncryptionInterface>>,
		primary: String,
	) -> Result<Self, EncryptionError> {
		if !implementations.contains_key(&primary) {
			return Err(EncryptionError::Configuration(format!(
				"Primary implementation '{}' not found in available implementations",
				primary
			)));
		}
		Ok(Self {
			implementations,
			primary,
		})
	}

	pub fn single(name: impl Into<String>, implementation: Arc<dyn EncryptionInterface>) -> Self {
		let primary = name.into();
		Self {
			implementations: HashMap::from([(primary.clone(), implementation)]),
			primary,
		}
	}

	pub fn encrypt(&self, plaintext: &[u8], key: &PublicKey) -> Result<Vec<u8>, EncryptionError> {
		let implementation = self.implementations.get(&self.primary).ok_or_else(|| {
			EncryptionError::Configuration(format!(
				"Primary implementation '{}' not available",
				self.primary
			))
		})?;
		implementation.encrypt(plaintext, key)
	}
}
