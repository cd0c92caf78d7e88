//! Wallet submission types.
//!
//! The transaction submitter hands the wallet a list of [`Call`]s that must be
//! submitted as one request; the wallet answers with a [`SubmissionReceipt`].

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

/// A single contract call inside a wallet submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
	pub to: Address,
	pub value: U256,
	pub data: Bytes,
}

impl Call {
	/// A call that carries no native value.
	pub fn new(to: Address, data: impl Into<Bytes>) -> Self {
		Self {
			to,
			value: U256::ZERO,
			data: data.into(),
		}
	}
}

/// Handle returned once the wallet accepted a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
	/// Hash of the transaction that carries the calls.
	pub tx_hash: B256,
	pub chain_id: u64,
}
