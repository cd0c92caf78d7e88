//! HTTP server for the off-ramp API.

use crate::apis;
use axum::{
	routing::{get, post, put},
	Router,
};
use offramp_config::ApiConfig;
use offramp_core::PaymentEngine;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	pub engine: Arc<PaymentEngine>,
}

/// Routes under `/api`.
pub fn router(engine: Arc<PaymentEngine>, timeout: Duration) -> Router {
	Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/payments", post(apis::payments::confirm_payment))
				.route("/payments/current", get(apis::payments::current_payment))
				.route(
					"/payments/current/cancel",
					post(apis::payments::cancel_payment),
				)
				.route("/payments/current/reset", post(apis::payments::reset_payment))
				.route("/networks", get(apis::networks::list_networks))
				.route("/networks/active", put(apis::networks::select_network))
				.route("/balances/{symbol}", get(apis::balances::get_balance)),
		)
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(TimeoutLayer::new(timeout))
				.layer(CorsLayer::permissive()),
		)
		.with_state(AppState { engine })
}

/// Serves the API until `shutdown` resolves.
pub async fn start_server(
	api_config: ApiConfig,
	engine: Arc<PaymentEngine>,
	shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(engine, Duration::from_secs(api_config.timeout_seconds));

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Off-ramp API server starting on {}", bind_address);

	axum::serve(listener, app)
		.with_graceful_shutdown(shutdown)
		.await?;

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::body::{to_bytes, Body};
	use axum::http::{Request, StatusCode};
	use offramp_core::testing::{payment_request, usdc, TestEngine};
	use serde_json::Value;
	use tower::ServiceExt;

	async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
		let request = Request::builder()
			.method(method)
			.uri(uri)
			.header("content-type", "application/json");
		let request = match body {
			Some(json) => request.body(Body::from(json.to_string())),
			None => request.body(Body::empty()),
		}
		.unwrap();

		let response = app.clone().oneshot(request).await.unwrap();
		let status = response.status();
		let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
		let json = if bytes.is_empty() {
			Value::Null
		} else {
			serde_json::from_slice(&bytes).unwrap()
		};
		(status, json)
	}

	fn app(test: &TestEngine) -> Router {
		router(test.engine.clone(), Duration::from_secs(30))
	}

	fn payment_body(amount: &str, symbol: &str) -> Value {
		serde_json::to_value(payment_request(amount, symbol)).unwrap()
	}

	#[tokio::test]
	async fn test_confirm_payment_accepted() {
		let test = TestEngine::new().await;
		test.fund(usdc(), 500).await;
		let app = app(&test);

		let (status, body) = send(&app, "POST", "/api/payments", Some(payment_body("100", "USDC"))).await;
		assert_eq!(status, StatusCode::ACCEPTED);
		assert_eq!(body["attempt"], 1);
		assert_eq!(body["phase"], "Polling");

		let (status, body) = send(&app, "GET", "/api/payments/current", None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["phase"], "Polling");

		test.engine.shutdown().await;
	}

	#[tokio::test]
	async fn test_insufficient_funds() {
		let test = TestEngine::new().await;
		test.fund(usdc(), 50).await;
		let app = app(&test);

		let (status, body) = send(&app, "POST", "/api/payments", Some(payment_body("100", "USDC"))).await;
		assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
		assert_eq!(body["error"], "INSUFFICIENT_FUNDS");
		assert_eq!(body["details"]["requested"], "100");
		assert_eq!(body["details"]["available"], "50");
		assert!(test.wallet.submissions().await.is_empty());
	}

	#[tokio::test]
	async fn test_second_payment_conflicts_while_polling() {
		let test = TestEngine::new().await;
		test.fund(usdc(), 500).await;
		let app = app(&test);

		let (status, _) = send(&app, "POST", "/api/payments", Some(payment_body("100", "USDC"))).await;
		assert_eq!(status, StatusCode::ACCEPTED);

		let (status, body) = send(&app, "POST", "/api/payments", Some(payment_body("100", "USDC"))).await;
		assert_eq!(status, StatusCode::CONFLICT);
		assert_eq!(body["error"], "ATTEMPT_IN_PROGRESS");

		let (status, body) = send(&app, "POST", "/api/payments/current/cancel", None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["phase"], "Idle");
	}

	#[tokio::test(start_paused = true)]
	async fn test_timed_out_request_keeps_attempt_running() {
		let test = TestEngine::new().await;
		test.fund(usdc(), 500).await;
		let release = test.wallet.hold_next_submission().await;
		let app = router(test.engine.clone(), Duration::from_secs(1));

		let (status, _) = send(&app, "POST", "/api/payments", Some(payment_body("100", "USDC"))).await;
		assert_eq!(status, StatusCode::REQUEST_TIMEOUT);

		release.notify_one();
		let mut phase = Value::Null;
		for _ in 0..10 {
			let (_, body) = send(&app, "GET", "/api/payments/current", None).await;
			phase = body["phase"].clone();
			if phase == "Polling" {
				break;
			}
			tokio::time::sleep(Duration::from_millis(100)).await;
		}
		assert_eq!(phase, "Polling");
		assert_eq!(test.wallet.submissions().await.len(), 1);

		test.engine.shutdown().await;
	}

	#[tokio::test]
	async fn test_wallet_rejection_is_unprocessable() {
		let test = TestEngine::new().await;
		test.fund(usdc(), 500).await;
		test.wallet.reject_with("User rejected the request").await;
		let app = app(&test);

		let (status, body) = send(&app, "POST", "/api/payments", Some(payment_body("100", "USDC"))).await;
		assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
		assert_eq!(body["error"], "SUBMISSION_FAILED");
		assert_eq!(body["message"], "Transaction failed: User rejected the request");

		let (_, body) = send(&app, "GET", "/api/payments/current", None).await;
		assert_eq!(body["phase"], "Failed");

		let (status, body) = send(&app, "POST", "/api/payments/current/reset", None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["phase"], "Idle");
	}

	#[tokio::test]
	async fn test_malformed_bodies_are_bad_requests() {
		let test = TestEngine::new().await;
		let app = app(&test);

		let (status, body) = send(&app, "POST", "/api/payments", Some(serde_json::json!({ "amount": "100" }))).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "INVALID_REQUEST");
		assert!(test.wallet.submissions().await.is_empty());

		let (status, body) = send(&app, "PUT", "/api/networks/active", Some(serde_json::json!({}))).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert_eq!(body["error"], "INVALID_REQUEST");
		assert_eq!(test.engine.active_network().await.name, "Base");
	}

	#[tokio::test]
	async fn test_cancel_without_attempt() {
		let test = TestEngine::new().await;
		let app = app(&test);

		let (status, body) = send(&app, "POST", "/api/payments/current/cancel", None).await;
		assert_eq!(status, StatusCode::CONFLICT);
		assert_eq!(body["error"], "INVALID_STATE");
	}

	#[tokio::test]
	async fn test_networks() {
		let test = TestEngine::new().await;
		let app = app(&test);

		let (status, body) = send(&app, "GET", "/api/networks", None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["active"], "Base");
		let names: Vec<_> = body["networks"]
			.as_array()
			.unwrap()
			.iter()
			.map(|n| n["name"].as_str().unwrap().to_string())
			.collect();
		assert_eq!(names, ["Optimism", "Base"]);

		let (status, body) = send(
			&app,
			"PUT",
			"/api/networks/active",
			Some(serde_json::json!({ "name": "optimism" })),
		)
		.await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["chain_id"], 10);

		let (status, body) = send(
			&app,
			"PUT",
			"/api/networks/active",
			Some(serde_json::json!({ "name": "Solana" })),
		)
		.await;
		assert_eq!(status, StatusCode::NOT_FOUND);
		assert_eq!(body["error"], "UNKNOWN_NETWORK");
	}

	#[tokio::test]
	async fn test_balances() {
		let test = TestEngine::new().await;
		test.fund(usdc(), 150).await;
		let app = app(&test);

		let (status, body) = send(&app, "GET", "/api/balances/usdc", None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(body["symbol"], "USDC");
		assert_eq!(body["balance"], "150");
		assert_eq!(body["raw"], "150000000");

		let (status, body) = send(&app, "GET", "/api/balances/DAI", None).await;
		assert_eq!(status, StatusCode::NOT_FOUND);
		assert_eq!(body["error"], "UNSUPPORTED_TOKEN");
	}

	#[tokio::test]
	async fn test_balance_without_wallet() {
		let test = TestEngine::without_wallet().await;
		let app = app(&test);

		let (status, body) = send(&app, "GET", "/api/balances/USDC", None).await;
		assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
		assert_eq!(body["error"], "NO_WALLET");
	}
}
