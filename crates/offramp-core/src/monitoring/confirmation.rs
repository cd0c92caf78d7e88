//! Confirmation poller.
//!
//! Scans the gateway's `OrderCreated` logs on a fixed interval until an event
//! for the sender and token shows up, the session is stopped, or the optional
//! timeout expires. Read failures are logged and retried on the next tick.

use alloy_primitives::Address;
use chrono::Utc;
use offramp_chain::{decode_order_created, ChainError, ChainService, OrderCreatedFilter};
use offramp_types::{truncate_id, ConfirmedOrder};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::instrument;

/// What a polling session looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTarget {
	pub chain_id: u64,
	pub gateway: Address,
	pub sender: Address,
	pub token: Address,
}

/// How a polling session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
	Confirmed(ConfirmedOrder),
	/// The stop signal fired, or its sender went away.
	Cancelled,
	TimedOut,
}

pub struct ConfirmationPoller {
	chain: ChainService,
	interval: Duration,
	lookback_blocks: u64,
	timeout: Option<Duration>,
}

impl ConfirmationPoller {
	pub fn new(
		chain: ChainService,
		interval: Duration,
		lookback_blocks: u64,
		timeout: Option<Duration>,
	) -> Self {
		Self {
			chain,
			interval,
			lookback_blocks,
			timeout,
		}
	}

	/// Polls until the order is found, `stop` fires, or the timeout expires.
	///
	/// The first tick runs immediately. Returns after the first confirmation,
	/// so one session never confirms twice. A stop that arrives while a query
	/// is in flight wins over whatever that query returns.
	#[instrument(skip_all, fields(
		chain_id = target.chain_id,
		sender = %truncate_id(&target.sender.to_string()),
		token = %truncate_id(&target.token.to_string())
	))]
	pub async fn poll(&self, target: PollTarget, mut stop: watch::Receiver<bool>) -> PollOutcome {
		let mut ticker = tokio::time::interval(self.interval);
		ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

		let deadline = async {
			match self.timeout {
				Some(timeout) => tokio::time::sleep(timeout).await,
				None => std::future::pending::<()>().await,
			}
		};
		tokio::pin!(deadline);

		let mut ticks: u64 = 0;
		loop {
			tokio::select! {
				biased;
				_ = stop.changed() => {
					tracing::debug!(ticks, "Polling stopped");
					return PollOutcome::Cancelled;
				}
				_ = &mut deadline => {
					tracing::warn!(ticks, "Gave up waiting for order confirmation");
					return PollOutcome::TimedOut;
				}
				_ = ticker.tick() => {}
			}
			ticks += 1;

			let result = self.tick(&target).await;

			if *stop.borrow() {
				tracing::debug!(ticks, "Polling stopped during query");
				return PollOutcome::Cancelled;
			}

			match result {
				Ok(Some(order)) => {
					tracing::info!(
						ticks,
						order_id = %truncate_id(&order.order_id.to_string()),
						"Order confirmed on-chain"
					);
					return PollOutcome::Confirmed(order);
				}
				Ok(None) => {
					tracing::debug!(ticks, "Order not found yet");
				}
				Err(e) => {
					tracing::warn!(ticks, error = %e, "Confirmation query failed, retrying");
				}
			}
		}
	}

	/// One query over the lookback window ending at the current head.
	async fn tick(&self, target: &PollTarget) -> Result<Option<ConfirmedOrder>, ChainError> {
		let head = self.chain.block_number(target.chain_id).await?;
		let filter = OrderCreatedFilter {
			gateway: target.gateway,
			sender: target.sender,
			token: target.token,
			from_block: head.saturating_sub(self.lookback_blocks),
			to_block: head,
		};

		let logs = self
			.chain
			.order_created_logs(target.chain_id, &filter)
			.await?;
		let Some(first) = logs.first() else {
			return Ok(None);
		};

		let event = decode_order_created(first)?;
		Ok(Some(ConfirmedOrder {
			order_id: event.order_id,
			created_at: Utc::now(),
			block_number: event.block_number,
		}))
	}
}
