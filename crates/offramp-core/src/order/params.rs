//! Gateway `createOrder` parameters.

use crate::PaymentError;
use alloy_primitives::{Address, U256};
use offramp_types::{
	parse_units, to_uint96, EncryptedPayload, NetworkRegistry, OrderParams, PaymentRequest,
	TokenConfig,
};

/// Assembles [`OrderParams`] for the selected network.
pub struct OrderParamsBuilder<'a> {
	networks: &'a NetworkRegistry,
	network: &'a str,
}

impl<'a> OrderParamsBuilder<'a> {
	pub fn new(networks: &'a NetworkRegistry, network: &'a str) -> Self {
		Self { networks, network }
	}

	/// Looks `symbol` up on the selected network.
	pub fn resolve_token(&self, symbol: &str) -> Result<&'a TokenConfig, PaymentError> {
		self.networks
			.resolve_token(self.network, symbol)
			.filter(|token| token.address != Address::ZERO)
			.ok_or_else(|| PaymentError::UnsupportedToken {
				symbol: symbol.to_string(),
				network: self.network.to_string(),
			})
	}

	/// Builds the call parameters.
	///
	/// `wallet` is the active smart-wallet address; it becomes the refund
	/// address. The sender fee path is always zero.
	pub fn build(
		&self,
		request: &PaymentRequest,
		wallet: Option<Address>,
		encrypted_payload: EncryptedPayload,
	) -> Result<OrderParams, PaymentError> {
		let token = self.resolve_token(&request.token_symbol)?;
		let refund_address = wallet.ok_or(PaymentError::NoWallet)?;

		let amount = parse_units(request.amount, token.decimals)
			.map_err(|e| PaymentError::InvalidAmount(e.to_string()))?;
		if amount.is_zero() {
			return Err(PaymentError::InvalidAmount(
				"amount must be greater than zero".to_string(),
			));
		}

		let rate =
			parse_units(request.rate, 0).map_err(|e| PaymentError::InvalidAmount(e.to_string()))?;
		to_uint96(rate).map_err(|e| PaymentError::InvalidAmount(e.to_string()))?;

		Ok(OrderParams {
			token: token.address,
			amount,
			rate,
			sender_fee_recipient: Address::ZERO,
			sender_fee: U256::ZERO,
			refund_address,
			encrypted_payload,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{payment_request, sender, test_config, usdc};
	use rust_decimal::Decimal;
	use std::str::FromStr;

	fn payload() -> EncryptedPayload {
		EncryptedPayload::new(vec![0xab; 64])
	}

	#[test]
	fn test_builds_scaled_params() {
		let registry = test_config().network_registry();
		let builder = OrderParamsBuilder::new(&registry, "Base");

		let params = builder
			.build(&payment_request("100.5", "USDC"), Some(sender()), payload())
			.unwrap();

		assert_eq!(params.token, usdc());
		assert_eq!(params.amount, U256::from(100_500_000u64));
		assert_eq!(params.rate, U256::from(1500u64));
		assert_eq!(params.sender_fee_recipient, Address::ZERO);
		assert_eq!(params.sender_fee, U256::ZERO);
		assert_eq!(params.refund_address, sender());
		assert_eq!(params.encrypted_payload, payload());
	}

	#[test]
	fn test_symbol_lookup_ignores_case() {
		let registry = test_config().network_registry();
		let builder = OrderParamsBuilder::new(&registry, "Base");
		assert_eq!(builder.resolve_token("usdc").unwrap().address, usdc());
	}

	#[test]
	fn test_unsupported_token() {
		let registry = test_config().network_registry();
		let builder = OrderParamsBuilder::new(&registry, "Base");

		let err = builder
			.build(&payment_request("10", "DAI"), Some(sender()), payload())
			.unwrap_err();
		assert_eq!(
			err,
			PaymentError::UnsupportedToken {
				symbol: "DAI".to_string(),
				network: "Base".to_string()
			}
		);

		// Known token, unknown network
		let builder = OrderParamsBuilder::new(&registry, "Polygon");
		assert!(matches!(
			builder.resolve_token("USDC"),
			Err(PaymentError::UnsupportedToken { .. })
		));
	}

	#[test]
	fn test_no_wallet() {
		let registry = test_config().network_registry();
		let builder = OrderParamsBuilder::new(&registry, "Base");
		assert_eq!(
			builder
				.build(&payment_request("10", "USDC"), None, payload())
				.unwrap_err(),
			PaymentError::NoWallet
		);
	}

	#[test]
	fn test_rate_rounds_to_integer() {
		let registry = test_config().network_registry();
		let builder = OrderParamsBuilder::new(&registry, "Base");
		let mut request = payment_request("1", "USDC");
		request.rate = Decimal::from_str("1499.5").unwrap();

		let params = builder.build(&request, Some(sender()), payload()).unwrap();
		assert_eq!(params.rate, U256::from(1500u64));
	}

	#[test]
	fn test_invalid_amounts() {
		let registry = test_config().network_registry();
		let builder = OrderParamsBuilder::new(&registry, "Base");

		for amount in ["0", "-5", "0.0000001"] {
			let result = builder.build(&payment_request(amount, "USDC"), Some(sender()), payload());
			assert!(
				matches!(result, Err(PaymentError::InvalidAmount(_))),
				"amount {}",
				amount
			);
		}

		let mut request = payment_request("1", "USDC");
		request.rate = Decimal::from_str("-1500").unwrap();
		assert!(matches!(
			builder.build(&request, Some(sender()), payload()),
			Err(PaymentError::InvalidAmount(_))
		));
	}
}
