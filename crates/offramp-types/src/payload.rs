//! Recipient payload types.
//!
//! The recipient of a fiat payout is described by [`RecipientInfo`]. It is
//! serialized to JSON, encrypted under the aggregator's public key and only the
//! resulting [`EncryptedPayload`] ever leaves the process.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Institution account that receives the fiat payout.
///
/// Constructed once from user-entered form data and never mutated afterwards.
/// The JSON field names are the ones the aggregator expects when it decrypts
/// the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RecipientFields")]
pub struct RecipientInfo {
	account_identifier: String,
	account_name: String,
	#[serde(rename = "institution")]
	institution_code: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	memo: Option<String>,
}

/// Wire form of [`RecipientInfo`]; deserialized values go through
/// [`RecipientInfo::new`].
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecipientFields {
	account_identifier: String,
	account_name: String,
	#[serde(rename = "institution")]
	institution_code: String,
	#[serde(default)]
	memo: Option<String>,
}

impl From<RecipientFields> for RecipientInfo {
	fn from(fields: RecipientFields) -> Self {
		Self::new(
			fields.account_identifier,
			fields.account_name,
			fields.institution_code,
			fields.memo,
		)
	}
}

impl RecipientInfo {
	pub fn new(
		account_identifier: impl Into<String>,
		account_name: impl Into<String>,
		institution_code: impl Into<String>,
		memo: Option<String>,
	) -> Self {
		Self {
			account_identifier: account_identifier.into(),
			account_name: account_name.into(),
			institution_code: institution_code.into(),
			memo: memo.filter(|m| !m.trim().is_empty()),
		}
	}

	pub fn account_identifier(&self) -> &str {
		&self.account_identifier
	}

	pub fn account_name(&self) -> &str {
		&self.account_name
	}

	pub fn institution_code(&self) -> &str {
		&self.institution_code
	}

	pub fn memo(&self) -> Option<&str> {
		self.memo.as_deref()
	}
}

/// Public key published by the aggregator.
///
/// The encoding is owned by the encryption implementation; this type only
/// carries the text form returned by the key service.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey(String);

impl PublicKey {
	pub fn new(key: impl Into<String>) -> Self {
		Self(key.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Debug for PublicKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "PublicKey({})", crate::truncate_id(&self.0))
	}
}

/// Opaque ciphertext of a serialized [`RecipientInfo`].
///
/// Never decrypted locally. On-chain it travels as the base64 text of the
/// bytes (the gateway's `messageHash` argument).
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptedPayload(Vec<u8>);

impl EncryptedPayload {
	pub fn new(bytes: Vec<u8>) -> Self {
		Self(bytes)
	}

	pub fn as_bytes(&self) -> &[u8] {
		&self.0
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn into_bytes(self) -> Vec<u8> {
		self.0
	}
}

impl fmt::Debug for EncryptedPayload {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "EncryptedPayload({} bytes)", self.0.len())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_recipient_serializes_with_aggregator_field_names() {
		let recipient = RecipientInfo::new("0123456789", "Ada Obi", "GTBINGLA", None);
		let json = serde_json::to_value(&recipient).unwrap();

		assert_eq!(json["accountIdentifier"], "0123456789");
		assert_eq!(json["accountName"], "Ada Obi");
		assert_eq!(json["institution"], "GTBINGLA");
		assert!(json.get("memo").is_none());
	}

	#[test]
	fn test_blank_memo_is_dropped() {
		let recipient = RecipientInfo::new("1", "A", "B", Some("   ".to_string()));
		assert_eq!(recipient.memo(), None);

		let recipient = RecipientInfo::new("1", "A", "B", Some("rent".to_string()));
		assert_eq!(recipient.memo(), Some("rent"));
	}

	#[test]
	fn test_deserialized_blank_memo_is_dropped() {
		let recipient: RecipientInfo = serde_json::from_str(
			r#"{"accountIdentifier":"1","accountName":"A","institution":"B","memo":"  "}"#,
		)
		.unwrap();
		assert_eq!(recipient.memo(), None);
		assert!(serde_json::to_value(&recipient).unwrap().get("memo").is_none());

		let recipient: RecipientInfo = serde_json::from_str(
			r#"{"accountIdentifier":"1","accountName":"A","institution":"B","memo":"rent"}"#,
		)
		.unwrap();
		assert_eq!(recipient.memo(), Some("rent"));
	}

	#[test]
	fn test_payload_debug_hides_contents() {
		let payload = EncryptedPayload::new(vec![1, 2, 3]);
		assert_eq!(format!("{:?}", payload), "EncryptedPayload(3 bytes)");
	}
}
