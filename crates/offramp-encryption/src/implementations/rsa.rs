//! RSA with PKCS#1 v1.5 padding.
//!
//! This is what the aggregator's published PEM key is used with. The key may
//! be an SPKI (`BEGIN PUBLIC KEY`) or PKCS#1 (`BEGIN RSA PUBLIC KEY`)
//! document. Output is a single block the size of the modulus, so the
//! plaintext must fit in `modulus - 11` bytes.

use crate::{EncryptionError, EncryptionInterface};
use aes_gcm::aead::OsRng;
use offramp_types::{ConfigSchema, PublicKey, Schema, ValidationError};
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Encrypt, RsaPublicKey};

pub struct RsaEncryption;

fn parse_public_key(key: &PublicKey) -> Result<RsaPublicKey, EncryptionError> {
	// Keys relayed through JSON sometimes arrive with escaped newlines.
	let pem = key.as_str().trim().replace("\\n", "\n");
	if pem.contains("BEGIN RSA PUBLIC KEY") {
		return RsaPublicKey::from_pkcs1_pem(&pem)
			.map_err(|e| EncryptionError::InvalidKey(format!("not a PKCS#1 RSA key: {}", e)));
	}
	RsaPublicKey::from_public_key_pem(&pem)
		.map_err(|e| EncryptionError::InvalidKey(format!("not a PEM RSA key: {}", e)))
}

pub struct RsaEncryptionSchema;

impl ConfigSchema for RsaEncryptionSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

impl EncryptionInterface for RsaEncryption {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(RsaEncryptionSchema)
	}

	fn encrypt(&self, plaintext: &[u8], key: &PublicKey) -> Result<Vec<u8>, EncryptionError> {
		let recipient = parse_public_key(key)?;
		let out = recipient
			.encrypt(&mut OsRng, Pkcs1v15Encrypt, plaintext)
			.map_err(|e| EncryptionError::Cipher(e.to_string()))?;

		tracing::trace!(bytes = out.len(), "Encrypted payload");
		Ok(out)
	}
}

pub fn create_rsa_encryption(
	config: &toml::Value,
) -> Result<Box<dyn EncryptionInterface>, EncryptionError> {
	RsaEncryptionSchema
		.validate(config)
		.map_err(|e| EncryptionError::Configuration(format!("Invalid configuration: {}", e)))?;
	Ok(Box::new(RsaEncryption))
}

pub struct Registry;

impl offramp_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "rsa";
	type Factory = crate::EncryptionFactory;

	fn factory() -> Self::Factory {
		create_rsa_encryption
	}
}

impl crate::EncryptionRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use rsa::pkcs1::EncodeRsaPublicKey;
	use rsa::pkcs8::{EncodePublicKey, LineEnding};
	use rsa::RsaPrivateKey;

	fn keypair() -> (RsaPrivateKey, PublicKey) {
		let secret = RsaPrivateKey::new(&mut OsRng, 1024).unwrap();
		let pem = secret
			.to_public_key()
			.to_public_key_pem(LineEnding::LF)
			.unwrap();
		(secret, PublicKey::new(pem))
	}

	#[test]
	fn test_aggregator_can_decrypt() {
		let (secret, public) = keypair();
		let plaintext = br#"{"accountIdentifier":"0123456789","accountName":"Ada","institution":"GTBINGLA"}"#;

		let payload = RsaEncryption.encrypt(plaintext, &public).unwrap();
		assert_eq!(payload.len(), 128);
		assert_eq!(
			secret.decrypt(Pkcs1v15Encrypt, &payload).unwrap(),
			plaintext.to_vec()
		);
	}

	#[test]
	fn test_pkcs1_key_and_escaped_newlines() {
		let secret = RsaPrivateKey::new(&mut OsRng, 1024).unwrap();
		let pem = secret
			.to_public_key()
			.to_pkcs1_pem(LineEnding::LF)
			.unwrap()
			.replace('\n', "\\n");

		let payload = RsaEncryption.encrypt(b"hello", &PublicKey::new(pem)).unwrap();
		assert_eq!(secret.decrypt(Pkcs1v15Encrypt, &payload).unwrap(), b"hello");
	}

	#[test]
	fn test_outputs_differ_per_call() {
		let (_, public) = keypair();
		let a = RsaEncryption.encrypt(b"same", &public).unwrap();
		let b = RsaEncryption.encrypt(b"same", &public).unwrap();
		assert_ne!(a, b);
	}

	#[test]
	fn test_malformed_keys_rejected() {
		let secp = "0x0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798";
		let truncated = "-----BEGIN PUBLIC KEY-----\nMIIBIjANBgkqhkiG9w0BAQEFAAOCAQ8A\n-----END PUBLIC KEY-----";
		for bad in ["", "not a key", secp, truncated] {
			let result = RsaEncryption.encrypt(b"x", &PublicKey::new(bad));
			assert!(
				matches!(result, Err(EncryptionError::InvalidKey(_))),
				"key {:?} should be rejected",
				bad
			);
		}
	}

	#[test]
	fn test_oversized_plaintext_is_a_cipher_error() {
		let (_, public) = keypair();
		let result = RsaEncryption.encrypt(&[0u8; 200], &public);
		assert!(matches!(result, Err(EncryptionError::Cipher(_))));
	}
}
