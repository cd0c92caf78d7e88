//! String formatting for logs and API output.

use alloy_primitives::U256;

/// Shortens an identifier for log output: the first 10 characters then "..".
///
/// Ten characters keep the `0x` prefix plus four bytes of a hash visible.
pub fn truncate_id(id: &str) -> String {
	if id.chars().count() <= 10 {
		id.to_string()
	} else {
		let head: String = id.chars().take(10).collect();
		format!("{}..", head)
	}
}

/// Strips a leading "0x" or "0X".
pub fn without_0x_prefix(hex_str: &str) -> &str {
	hex_str
		.strip_prefix("0x")
		.or_else(|| hex_str.strip_prefix("0X"))
		.unwrap_or(hex_str)
}

/// Renders a raw on-chain amount in whole token units, e.g. `1500000` with 6
/// decimals as `"1.5"`. Trailing fractional zeros are dropped.
pub fn format_token_amount(amount: U256, decimals: u8) -> String {
	let digits = amount.to_string();
	if decimals == 0 {
		return digits;
	}

	let places = decimals as usize;
	let (integer, fraction) = if digits.len() <= places {
		("0".to_string(), format!("{:0>width$}", digits, width = places))
	} else {
		let split = digits.len() - places;
		(digits[..split].to_string(), digits[split..].to_string())
	};

	let fraction = fraction.trim_end_matches('0');
	if fraction.is_empty() {
		integer
	} else {
		format!("{}.{}", integer, fraction)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_truncate_id() {
		assert_eq!(truncate_id("0x12345678"), "0x12345678");
		assert_eq!(
			truncate_id("0x1234567890abcdef1234567890abcdef"),
			"0x12345678.."
		);
	}

	#[test]
	fn test_without_0x_prefix() {
		assert_eq!(without_0x_prefix("0x02ab"), "02ab");
		assert_eq!(without_0x_prefix("0X02ab"), "02ab");
		assert_eq!(without_0x_prefix("02ab"), "02ab");
	}

	#[test]
	fn test_format_token_amount() {
		assert_eq!(format_token_amount(U256::from(1_500_000u64), 6), "1.5");
		assert_eq!(format_token_amount(U256::from(100_000u64), 6), "0.1");
		assert_eq!(format_token_amount(U256::from(150_000_000u64), 6), "150");
		assert_eq!(
			format_token_amount(U256::from(10u64).pow(U256::from(18u64)), 18),
			"1"
		);
		assert_eq!(format_token_amount(U256::ZERO, 6), "0");
		assert_eq!(format_token_amount(U256::from(1000u64), 0), "1000");
	}
}
