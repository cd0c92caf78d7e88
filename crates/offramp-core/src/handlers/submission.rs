//! Transaction submitter.
//!
//! Moves the wallets to the target chain, then submits the ERC-20 approval
//! and the gateway `createOrder` call as one wallet request.

use crate::PaymentError;
use alloy_primitives::Address;
use alloy_sol_types::SolCall;
use base64::Engine;
use offramp_types::contracts::{IGateway, IERC20};
use offramp_types::{to_uint96, truncate_id, Call, OrderParams, SubmissionReceipt};
use offramp_wallet::{WalletError, WalletService};
use tracing::instrument;

#[derive(Debug, Clone, Copy)]
pub struct TransactionSubmitter;

impl TransactionSubmitter {
	/// The two calls of an order, in execution order: approval, then order
	/// creation.
	pub fn encode_calls(params: &OrderParams, gateway: Address) -> Result<Vec<Call>, PaymentError> {
		if params.token == Address::ZERO {
			return Err(PaymentError::Submission("missing token address".to_string()));
		}
		if gateway == Address::ZERO {
			return Err(PaymentError::Submission(
				"missing gateway address".to_string(),
			));
		}

		let approve = IERC20::approveCall {
			spender: gateway,
			amount: params.amount,
		};

		let rate = to_uint96(params.rate).map_err(|e| PaymentError::InvalidAmount(e.to_string()))?;
		let create_order = IGateway::createOrderCall {
			_token: params.token,
			_amount: params.amount,
			_rate: rate,
			_senderFeeRecipient: params.sender_fee_recipient,
			_senderFee: params.sender_fee,
			_refundAddress: params.refund_address,
			messageHash: base64::engine::general_purpose::STANDARD
				.encode(params.encrypted_payload.as_bytes()),
		};

		Ok(vec![
			Call::new(params.token, approve.abi_encode()),
			Call::new(gateway, create_order.abi_encode()),
		])
	}

	/// Switches every connected wallet to `chain_id` and submits the order.
	#[instrument(skip_all, fields(chain_id = %chain_id, token = %truncate_id(&params.token.to_string())))]
	pub async fn submit(
		&self,
		wallet: &WalletService,
		chain_id: u64,
		gateway: Address,
		params: &OrderParams,
	) -> Result<SubmissionReceipt, PaymentError> {
		// A wallet on the wrong chain reverts or rejects, so this must settle
		// before anything is encoded.
		wallet
			.switch_all(chain_id)
			.await
			.map_err(|e| PaymentError::ChainSwitch {
				chain_id,
				reason: e.to_string(),
			})?;

		let calls = Self::encode_calls(params, gateway)?;

		let receipt = wallet.submit(calls).await.map_err(|e| {
			tracing::warn!(error = %e, "Wallet refused order submission");
			PaymentError::Submission(short_message(e))
		})?;

		tracing::info!(
			tx_hash = %truncate_id(&receipt.tx_hash.to_string()),
			"Order submitted"
		);
		Ok(receipt)
	}
}

fn short_message(error: WalletError) -> String {
	match error {
		WalletError::Rejected(reason)
		| WalletError::Reverted(reason)
		| WalletError::Network(reason) => reason,
		other => other.to_string(),
	}
}
