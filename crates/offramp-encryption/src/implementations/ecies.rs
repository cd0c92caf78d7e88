//! ECIES over secp256k1.
//!
//! A fresh ephemeral key is agreed with the recipient key via ECDH, the shared
//! secret is hashed with SHA-256 into an AES-256-GCM key and the plaintext is
//! sealed under a random 12-byte nonce. Output layout:
//!
//! ```text
//! ephemeral public key (33, compressed SEC1) || nonce (12) || ciphertext + tag
//! ```
//!
//! Every call draws a new ephemeral key and nonce, so outputs never repeat.

use crate::{EncryptionError, EncryptionInterface};
use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Key};
use k256::ecdh::EphemeralSecret;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use offramp_types::{without_0x_prefix, ConfigSchema, PublicKey, Schema, ValidationError};
use sha2::{Digest, Sha256};

pub const EPHEMERAL_KEY_LEN: usize = 33;
pub const NONCE_LEN: usize = 12;

pub struct EciesEncryption;

/// Parses a hex SEC1 point, compressed or uncompressed, with or without `0x`.
fn parse_public_key(key: &PublicKey) -> Result<k256::PublicKey, EncryptionError> {
	let raw = without_0x_prefix(key.as_str().trim());
	let bytes = alloy_primitives::hex::decode(raw)
		.map_err(|e| EncryptionError::InvalidKey(format!("not hex: {}", e)))?;
	k256::PublicKey::from_sec1_bytes(&bytes)
		.map_err(|_| EncryptionError::InvalidKey("not a secp256k1 point".to_string()))
}

fn derive_key(shared_secret: &[u8]) -> Key<Aes256Gcm> {
	let hash = Sha256::digest(shared_secret);
	*Key::<Aes256Gcm>::from_slice(&hash)
}

pub struct EciesEncryptionSchema;

impl ConfigSchema for EciesEncryptionSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		// No settings.
		Schema::new(vec![], vec![]).validate(config)
	}
}

impl EncryptionInterface for EciesEncryption {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(EciesEncryptionSchema)
	}

	fn encrypt(&self, plaintext: &[u8], key: &PublicKey) -> Result<Vec<u8>, EncryptionError> {
		let recipient = parse_public_key(key)?;

		let ephemeral = EphemeralSecret::random(&mut OsRng);
		let shared = ephemeral.diffie_hellman(&recipient);
		let cipher = Aes256Gcm::new(&derive_key(shared.raw_secret_bytes()));
		let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

		let ciphertext = cipher
			.encrypt(&nonce, plaintext)
			.map_err(|e| EncryptionError::Cipher(e.to_string()))?;

		let ephemeral_public = ephemeral.public_key().to_encoded_point(true);
		let mut out = Vec::with_capacity(EPHEMERAL_KEY_LEN + NONCE_LEN + ciphertext.len());
		out.extend_from_slice(ephemeral_public.as_bytes());
		out.extend_from_slice(&nonce);
		out.extend_from_slice(&ciphertext);

		tracing::trace!(bytes = out.len(), "Encrypted payload");
		Ok(out)
	}
}

pub fn create_ecies_encryption(
	config: &toml::Value,
) -> Result<Box<dyn EncryptionInterface>, EncryptionError> {
	EciesEncryptionSchema
		.validate(config)
		.map_err(|e| EncryptionError::Configuration(format!("Invalid configuration: {}", e)))?;
	Ok(Box::new(EciesEncryption))
}

pub struct Registry;

impl offramp_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "ecies";
	type Factory = crate::EncryptionFactory;

	fn factory() -> Self::Factory {
		create_ecies_encryption
	}
}

impl crate::EncryptionRegistry for Registry {}
