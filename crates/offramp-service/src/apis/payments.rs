//! Payment confirmation endpoints.

use super::{engine_error, invalid_body};
use crate::server::AppState;
use axum::{
	extract::{rejection::JsonRejection, State},
	http::StatusCode,
	Json,
};
use offramp_core::PaymentOutcome;
use offramp_types::{APIError, OrderSnapshot, PaymentAcceptedResponse, PaymentRequest};

/// Handles POST /api/payments.
///
/// Answers 202 once the wallet has accepted the submission. Confirmation
/// continues in the background and shows up in `GET /api/payments/current`.
pub async fn confirm_payment(
	State(state): State<AppState>,
	body: Result<Json<PaymentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PaymentAcceptedResponse>), APIError> {
	let Json(request) = body.map_err(invalid_body)?;
	match state.engine.confirm_payment(request).await {
		Ok(PaymentOutcome::Started { attempt }) => {
			let phase = state.engine.snapshot().await.phase;
			Ok((
				StatusCode::ACCEPTED,
				Json(PaymentAcceptedResponse { attempt, phase }),
			))
		},
		Ok(PaymentOutcome::InsufficientFunds {
			requested,
			available,
		}) => Err(APIError::PaymentRequired {
			message: format!(
				"Requested {} but only {} is available",
				requested, available
			),
			details: Some(serde_json::json!({
				"requested": requested,
				"available": available,
			})),
		}),
		Err(e) => {
			tracing::warn!(error = %e, "Payment confirmation failed");
			Err(engine_error(e))
		},
	}
}

/// Handles GET /api/payments/current.
pub async fn current_payment(State(state): State<AppState>) -> Json<OrderSnapshot> {
	Json(state.engine.snapshot().await)
}

/// Handles POST /api/payments/current/cancel.
pub async fn cancel_payment(State(state): State<AppState>) -> Result<Json<OrderSnapshot>, APIError> {
	state
		.engine
		.cancel_confirmation()
		.await
		.map_err(engine_error)?;
	Ok(Json(state.engine.snapshot().await))
}

/// Handles POST /api/payments/current/reset.
pub async fn reset_payment(State(state): State<AppState>) -> Result<Json<OrderSnapshot>, APIError> {
	state.engine.reset().await.map_err(engine_error)?;
	Ok(Json(state.engine.snapshot().await))
}
