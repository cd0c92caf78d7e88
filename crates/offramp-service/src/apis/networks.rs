//! Network listing and selection.

use super::{engine_error, invalid_body};
use crate::server::AppState;
use axum::{
	extract::{rejection::JsonRejection, State},
	Json,
};
use offramp_core::ActiveNetwork;
use offramp_types::{APIError, NetworkSummary, NetworksResponse, SelectNetworkRequest, TokenSummary};

/// Handles GET /api/networks.
pub async fn list_networks(State(state): State<AppState>) -> Json<NetworksResponse> {
	let active = state.engine.active_network().await;
	let networks = state
		.engine
		.networks()
		.iter()
		.map(|network| NetworkSummary {
			chain_id: network.chain_id,
			name: network.config.name.clone(),
			gateway_address: network.config.gateway_address,
			tokens: network
				.config
				.tokens
				.iter()
				.map(|t| TokenSummary {
					symbol: t.symbol.clone(),
					address: t.address,
					decimals: t.decimals,
				})
				.collect(),
		})
		.collect();

	Json(NetworksResponse {
		active: active.name,
		networks,
	})
}

/// Handles PUT /api/networks/active.
pub async fn select_network(
	State(state): State<AppState>,
	body: Result<Json<SelectNetworkRequest>, JsonRejection>,
) -> Result<Json<ActiveNetwork>, APIError> {
	let Json(request) = body.map_err(invalid_body)?;
	state
		.engine
		.select_network(&request.name)
		.await
		.map(Json)
		.map_err(engine_error)
}
