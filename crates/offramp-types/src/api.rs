//! API types for the off-ramp HTTP API.
//!
//! Request and response bodies plus the structured [`APIError`] that maps
//! pipeline failures to HTTP status codes.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{AttemptId, OrderPhase};

/// Response to an accepted payment confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentAcceptedResponse {
	pub attempt: AttemptId,
	pub phase: OrderPhase,
}

/// Token entry in a network listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSummary {
	pub symbol: String,
	pub address: Address,
	pub decimals: u8,
}

/// Network entry in a network listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSummary {
	#[serde(rename = "chainId")]
	pub chain_id: u64,
	pub name: String,
	#[serde(rename = "gatewayAddress")]
	pub gateway_address: Address,
	pub tokens: Vec<TokenSummary>,
}

/// Response for `GET /networks`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworksResponse {
	/// Name of the active network.
	pub active: String,
	pub networks: Vec<NetworkSummary>,
}

/// Request for `PUT /networks/active`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectNetworkRequest {
	pub name: String,
}

/// Response for `GET /balances/{symbol}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
	pub symbol: String,
	#[serde(rename = "chainId")]
	pub chain_id: u64,
	pub token: Address,
	/// Balance in whole token units.
	pub balance: String,
	/// Balance in the token's smallest unit.
	#[serde(with = "u256_serde")]
	pub raw: U256,
}

/// Error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Error type/code
	pub error: String,
	/// Human-readable description
	pub message: String,
	/// Additional error context
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
}

/// Structured API error type with HTTP status mapping.
#[derive(Debug)]
pub enum APIError {
	/// Malformed request (400)
	BadRequest { error_type: String, message: String },
	/// Amount exceeds the available balance (402)
	PaymentRequired {
		message: String,
		details: Option<serde_json::Value>,
	},
	/// Unknown resource (404)
	NotFound { error_type: String, message: String },
	/// Operation not allowed in the current phase (409)
	Conflict { error_type: String, message: String },
	/// Attempt aborted with a user-facing message (422)
	UnprocessableEntity {
		error_type: String,
		message: String,
		details: Option<serde_json::Value>,
	},
	/// Upstream dependency unavailable (503)
	ServiceUnavailable { error_type: String, message: String },
	/// Unexpected failure (500)
	InternalServerError { error_type: String, message: String },
}

impl APIError {
	/// Get the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			APIError::BadRequest { .. } => 400,
			APIError::PaymentRequired { .. } => 402,
			APIError::NotFound { .. } => 404,
			APIError::Conflict { .. } => 409,
			APIError::UnprocessableEntity { .. } => 422,
			APIError::ServiceUnavailable { .. } => 503,
			APIError::InternalServerError { .. } => 500,
		}
	}

	/// Convert to ErrorResponse for JSON serialization.
	pub fn to_error_response(&self) -> ErrorResponse {
		match self {
			APIError::PaymentRequired { message, details } => ErrorResponse {
				error: "INSUFFICIENT_FUNDS".to_string(),
				message: message.clone(),
				details: details.clone(),
			},
			APIError::UnprocessableEntity {
				error_type,
				message,
				details,
			} => ErrorResponse {
				error: error_type.clone(),
				message: message.clone(),
				details: details.clone(),
			},
			APIError::BadRequest {
				error_type,
				message,
			}
			| APIError::NotFound {
				error_type,
				message,
			}
			| APIError::Conflict {
				error_type,
				message,
			}
			| APIError::ServiceUnavailable {
				error_type,
				message,
			}
			| APIError::InternalServerError {
				error_type,
				message,
			} => ErrorResponse {
				error: error_type.clone(),
				message: message.clone(),
				details: None,
			},
		}
	}
}

impl fmt::Display for APIError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			APIError::BadRequest { message, .. } => write!(f, "Bad Request: {}", message),
			APIError::PaymentRequired { message, .. } => write!(f, "Payment Required: {}", message),
			APIError::NotFound { message, .. } => write!(f, "Not Found: {}", message),
			APIError::Conflict { message, .. } => write!(f, "Conflict: {}", message),
			APIError::UnprocessableEntity { message, .. } => {
				write!(f, "Unprocessable Entity: {}", message)
			},
			APIError::ServiceUnavailable { message, .. } => {
				write!(f, "Service Unavailable: {}", message)
			},
			APIError::InternalServerError { message, .. } => {
				write!(f, "Internal Server Error: {}", message)
			},
		}
	}
}

impl std::error::Error for APIError {}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for APIError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status = StatusCode::from_u16(self.status_code())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

		let error_response = self.to_error_response();
		(status, Json(error_response)).into_response()
	}
}

/// Serde module for U256 as a decimal string.
pub mod u256_serde {
	use alloy_primitives::U256;
	use serde::{de::Error, Deserialize, Deserializer, Serializer};

	pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&value.to_string())
	}

	pub fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		U256::from_str_radix(&s, 10).map_err(|e| D::Error::custom(format!("Invalid U256: {}", e)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_status_codes() {
		let err = APIError::Conflict {
			error_type: "ATTEMPT_IN_FLIGHT".to_string(),
			message: "busy".to_string(),
		};
		assert_eq!(err.status_code(), 409);
		assert_eq!(err.to_string(), "Conflict: busy");

		let err = APIError::PaymentRequired {
			message: "Insufficient balance".to_string(),
			details: None,
		};
		assert_eq!(err.status_code(), 402);
		assert_eq!(err.to_error_response().error, "INSUFFICIENT_FUNDS");
	}

	#[test]
	fn test_balance_response_raw_as_string() {
		let response = BalanceResponse {
			symbol: "USDC".to_string(),
			chain_id: 8453,
			token: Address::ZERO,
			balance: "1.5".to_string(),
			raw: U256::from(1_500_000u64),
		};
		let json = serde_json::to_value(&response).unwrap();
		assert_eq!(json["raw"], "1500000");
		assert_eq!(json["chainId"], 8453);
	}
}
