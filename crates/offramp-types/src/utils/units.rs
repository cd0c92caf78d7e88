//! Decimal to on-chain integer scaling.
//!
//! User input arrives as decimals ("100.5 USDC"); contracts take integers in
//! the token's smallest unit. Scaling goes through the decimal's mantissa and
//! scale so no binary floating point is involved.

use alloy_primitives::aliases::U96;
use alloy_primitives::U256;
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnitsError {
	#[error("Amount must not be negative: {0}")]
	Negative(Decimal),
	#[error("Amount {value} does not fit in {bits} bits")]
	Overflow { value: String, bits: usize },
}

/// Scales `amount` by `10^decimals`, rounding half away from zero at the last
/// representable unit.
///
/// Exact for every amount with at most `decimals` fractional digits.
pub fn parse_units(amount: Decimal, decimals: u8) -> Result<U256, UnitsError> {
	if amount.is_sign_negative() && !amount.is_zero() {
		return Err(UnitsError::Negative(amount));
	}

	let rounded =
		amount.round_dp_with_strategy(decimals as u32, RoundingStrategy::MidpointAwayFromZero);
	let mantissa = U256::from(rounded.mantissa().unsigned_abs());
	// After rounding the scale never exceeds `decimals`.
	let exponent = (decimals as u32).saturating_sub(rounded.scale());

	let overflow = || UnitsError::Overflow {
		value: amount.to_string(),
		bits: 256,
	};
	let factor = U256::from(10u8)
		.checked_pow(U256::from(exponent))
		.ok_or_else(overflow)?;
	mantissa.checked_mul(factor).ok_or_else(overflow)
}

/// Narrows a value to the gateway's `uint96` rate field.
pub fn to_uint96(value: U256) -> Result<U96, UnitsError> {
	if value.bit_len() > 96 {
		return Err(UnitsError::Overflow {
			value: value.to_string(),
			bits: 96,
		});
	}
	let narrow = u128::try_from(value).map_err(|_| UnitsError::Overflow {
		value: value.to_string(),
		bits: 96,
	})?;
	Ok(U96::from(narrow))
}
