//! Request handlers for the off-ramp API.

pub mod balances;
pub mod networks;
pub mod payments;

use axum::extract::rejection::JsonRejection;
use offramp_core::{EngineError, PaymentError};
use offramp_types::APIError;

/// A request body that could not be read as the expected JSON.
pub fn invalid_body(rejection: JsonRejection) -> APIError {
	APIError::BadRequest {
		error_type: "INVALID_REQUEST".to_string(),
		message: rejection.body_text(),
	}
}

/// Stable error code for a pipeline failure.
fn payment_error_code(error: &PaymentError) -> &'static str {
	match error {
		PaymentError::KeyFetch(_) => "KEY_FETCH_FAILED",
		PaymentError::Encryption(_) => "ENCRYPTION_FAILED",
		PaymentError::UnsupportedToken { .. } => "UNSUPPORTED_TOKEN",
		PaymentError::NoWallet => "NO_WALLET",
		PaymentError::ChainSwitch { .. } => "CHAIN_SWITCH_FAILED",
		PaymentError::Submission(_) => "SUBMISSION_FAILED",
		PaymentError::InvalidAmount(_) => "INVALID_AMOUNT",
	}
}

/// Maps engine errors onto HTTP responses.
pub fn engine_error(error: EngineError) -> APIError {
	match error {
		EngineError::AttemptFailed { attempt, error } => APIError::UnprocessableEntity {
			error_type: payment_error_code(&error).to_string(),
			message: error.to_string(),
			details: Some(serde_json::json!({ "attempt": attempt })),
		},
		EngineError::Payment(PaymentError::UnsupportedToken { symbol, network }) => {
			APIError::NotFound {
				error_type: "UNSUPPORTED_TOKEN".to_string(),
				message: format!("{} is not supported on {}", symbol, network),
			}
		},
		EngineError::Payment(error) => APIError::UnprocessableEntity {
			error_type: payment_error_code(&error).to_string(),
			message: error.to_string(),
			details: None,
		},
		EngineError::AttemptInProgress(_) => APIError::Conflict {
			error_type: "ATTEMPT_IN_PROGRESS".to_string(),
			message: error.to_string(),
		},
		EngineError::State(e) => APIError::Conflict {
			error_type: "INVALID_STATE".to_string(),
			message: e.to_string(),
		},
		EngineError::UnknownNetwork(_) => APIError::NotFound {
			error_type: "UNKNOWN_NETWORK".to_string(),
			message: error.to_string(),
		},
		EngineError::Chain(_) => APIError::ServiceUnavailable {
			error_type: "CHAIN_UNAVAILABLE".to_string(),
			message: error.to_string(),
		},
		EngineError::Config(_) | EngineError::Interrupted(_) => APIError::InternalServerError {
			error_type: "INTERNAL_ERROR".to_string(),
			message: error.to_string(),
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use offramp_types::AttemptId;

	#[test]
	fn test_failed_attempt_carries_short_message() {
		let err = engine_error(EngineError::AttemptFailed {
			attempt: AttemptId::new(2),
			error: PaymentError::Submission("User rejected".to_string()),
		});

		assert_eq!(err.status_code(), 422);
		let body = err.to_error_response();
		assert_eq!(body.error, "SUBMISSION_FAILED");
		assert_eq!(body.message, "Transaction failed: User rejected");
		assert_eq!(body.details.unwrap()["attempt"], 2);
	}

	#[test]
	fn test_status_mapping() {
		let cases = [
			(EngineError::AttemptInProgress(AttemptId::new(1)), 409),
			(EngineError::UnknownNetwork("Solana".to_string()), 404),
			(EngineError::Chain("timeout".to_string()), 503),
			(EngineError::Payment(PaymentError::NoWallet), 422),
			(
				EngineError::Payment(PaymentError::UnsupportedToken {
					symbol: "DAI".to_string(),
					network: "Base".to_string(),
				}),
				404,
			),
		];
		for (error, status) in cases {
			assert_eq!(engine_error(error).status_code(), status);
		}
	}
}
