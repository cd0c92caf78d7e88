//! Recipient encoder.
//!
//! Serializes the recipient to JSON and encrypts it under the aggregator's
//! current public key. The plaintext never leaves this module.

use crate::PaymentError;
use offramp_aggregator::AggregatorService;
use offramp_encryption::EncryptionService;
use offramp_types::{EncryptedPayload, PublicKey, RecipientInfo};
use std::sync::Arc;

pub struct RecipientEncoder {
	aggregator: Arc<AggregatorService>,
	encryption: Arc<EncryptionService>,
}

impl RecipientEncoder {
	pub fn new(aggregator: Arc<AggregatorService>, encryption: Arc<EncryptionService>) -> Self {
		Self {
			aggregator,
			encryption,
		}
	}

	/// Fetches the aggregator key and encrypts `recipient` under it.
	pub async fn encode(&self, recipient: &RecipientInfo) -> Result<EncryptedPayload, PaymentError> {
		let key = self
			.aggregator
			.fetch_public_key()
			.await
			.map_err(|e| PaymentError::KeyFetch(e.to_string()))?;

		self.encode_with_key(recipient, &key)
	}

	/// Encrypts `recipient` under an already known key.
	pub fn encode_with_key(
		&self,
		recipient: &RecipientInfo,
		key: &PublicKey,
	) -> Result<EncryptedPayload, PaymentError> {
		let plaintext =
			serde_json::to_vec(recipient).map_err(|e| PaymentError::Encryption(e.to_string()))?;

		let ciphertext = self
			.encryption
			.encrypt(&plaintext, key)
			.map_err(|e| PaymentError::Encryption(e.to_string()))?;

		tracing::debug!(bytes = ciphertext.len(), "Encrypted recipient");
		Ok(EncryptedPayload::new(ciphertext))
	}
}
