//! Order lifecycle types.
//!
//! This module defines the user request that starts a payment, the on-chain
//! call parameters derived from it, and the records that track an order from
//! submission to confirmation.

use alloy_primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{EncryptedPayload, RecipientInfo};

/// Payment requested by the user from the confirmation form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
	/// Token amount in whole units (e.g. `100.5` USDC).
	pub amount: Decimal,
	/// Token symbol, resolved against the active network.
	pub token_symbol: String,
	/// Exchange rate. Integer-valued; fractional input is rounded.
	pub rate: Decimal,
	/// Institution account receiving the payout.
	pub recipient: RecipientInfo,
}

/// Parameters of a single gateway `createOrder` call.
///
/// Built once per attempt and discarded after submission. `amount` is scaled
/// to the token's smallest unit and `rate` to zero decimals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderParams {
	pub token: Address,
	pub amount: U256,
	pub rate: U256,
	/// Always the zero address; fee-bearing orders are not produced.
	pub sender_fee_recipient: Address,
	/// Always zero.
	pub sender_fee: U256,
	/// Active smart-wallet address.
	pub refund_address: Address,
	pub encrypted_payload: EncryptedPayload,
}

/// An order believed submitted but not yet seen on-chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOrder {
	pub sender: Address,
	pub token: Address,
	pub submitted_at: DateTime<Utc>,
	pub chain_id: u64,
}

/// An order whose `OrderCreated` event was decoded from the gateway logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedOrder {
	pub order_id: B256,
	pub created_at: DateTime<Utc>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub block_number: Option<u64>,
}

/// Phase of the payment pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderPhase {
	/// No attempt in progress.
	Idle,
	/// Encrypting the recipient and assembling call parameters.
	BuildingParams,
	/// Calls handed to the wallet, waiting for it to sign and send.
	AwaitingWalletSignature,
	/// Wallet accepted the submission.
	Submitted,
	/// Scanning gateway logs for the order.
	Polling,
	/// Order found on-chain.
	Confirmed,
	/// Attempt aborted; see the current error message.
	Failed,
}

impl OrderPhase {
	/// Whether an attempt is running in this phase.
	pub fn is_in_flight(&self) -> bool {
		matches!(
			self,
			OrderPhase::BuildingParams
				| OrderPhase::AwaitingWalletSignature
				| OrderPhase::Submitted
				| OrderPhase::Polling
		)
	}

	pub fn is_terminal(&self) -> bool {
		matches!(self, OrderPhase::Confirmed | OrderPhase::Failed)
	}
}

impl fmt::Display for OrderPhase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			OrderPhase::Idle => write!(f, "Idle"),
			OrderPhase::BuildingParams => write!(f, "BuildingParams"),
			OrderPhase::AwaitingWalletSignature => write!(f, "AwaitingWalletSignature"),
			OrderPhase::Submitted => write!(f, "Submitted"),
			OrderPhase::Polling => write!(f, "Polling"),
			OrderPhase::Confirmed => write!(f, "Confirmed"),
			OrderPhase::Failed => write!(f, "Failed"),
		}
	}
}

/// Identifier of one payment attempt.
///
/// Issued from a monotonically increasing counter so that work belonging to
/// an earlier attempt can be told apart from the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttemptId(u64);

impl AttemptId {
	pub const fn new(value: u64) -> Self {
		Self(value)
	}

	pub fn value(&self) -> u64 {
		self.0
	}

	/// The attempt following this one.
	pub fn next(&self) -> Self {
		Self(self.0.saturating_add(1))
	}
}

impl fmt::Display for AttemptId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// Point-in-time view of the pipeline exposed to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSnapshot {
	pub phase: OrderPhase,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub attempt: Option<AttemptId>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub pending: Option<PendingOrder>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub confirmed: Option<ConfirmedOrder>,
}

impl OrderSnapshot {
	pub fn idle() -> Self {
		Self {
			phase: OrderPhase::Idle,
			attempt: None,
			error: None,
			pending: None,
			confirmed: None,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_in_flight_phases() {
		assert!(!OrderPhase::Idle.is_in_flight());
		assert!(OrderPhase::BuildingParams.is_in_flight());
		assert!(OrderPhase::AwaitingWalletSignature.is_in_flight());
		assert!(OrderPhase::Submitted.is_in_flight());
		assert!(OrderPhase::Polling.is_in_flight());
		assert!(!OrderPhase::Confirmed.is_in_flight());
		assert!(!OrderPhase::Failed.is_in_flight());

		assert!(OrderPhase::Confirmed.is_terminal());
		assert!(OrderPhase::Failed.is_terminal());
		assert!(!OrderPhase::Polling.is_terminal());
	}

	#[test]
	fn test_attempt_ids_increase() {
		let first = AttemptId::new(1);
		let second = first.next();
		assert!(second > first);
		assert_eq!(second.value(), 2);
		assert_eq!(second.to_string(), "#2");
		assert_eq!(serde_json::to_value(second).unwrap(), serde_json::json!(2));
	}

	#[test]
	fn test_idle_snapshot_serializes_compactly() {
		let json = serde_json::to_value(OrderSnapshot::idle()).unwrap();
		assert_eq!(json, serde_json::json!({ "phase": "Idle" }));
	}

	#[test]
	fn test_payment_request_from_json() {
		let request: PaymentRequest = serde_json::from_value(serde_json::json!({
			"amount": "100.5",
			"token_symbol": "USDC",
			"rate": "1500",
			"recipient": {
				"accountIdentifier": "0123456789",
				"accountName": "Ada Obi",
				"institution": "GTBINGLA"
			}
		}))
		.unwrap();

		assert_eq!(request.amount, Decimal::new(1005, 1));
		assert_eq!(request.rate, Decimal::from(1500));
		assert_eq!(request.recipient.institution_code(), "GTBINGLA");
		assert_eq!(request.recipient.memo(), None);
	}
}
