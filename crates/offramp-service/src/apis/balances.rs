//! Wallet balance lookup.

use super::engine_error;
use crate::server::AppState;
use axum::{
	extract::{Path, State},
	Json,
};
use offramp_types::{APIError, BalanceResponse};

/// Handles GET /api/balances/{symbol}.
///
/// Reads the balance of the connected wallet on the active network.
pub async fn get_balance(
	Path(symbol): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<BalanceResponse>, APIError> {
	let balance = state.engine.balance(&symbol).await.map_err(engine_error)?;

	Ok(Json(BalanceResponse {
		balance: balance.formatted(),
		symbol: balance.symbol,
		chain_id: balance.chain_id,
		token: balance.token,
		raw: balance.amount,
	}))
}
