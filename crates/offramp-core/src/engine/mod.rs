//! Payment engine.
//!
//! Runs one payment attempt at a time: balance gate, recipient encryption,
//! parameter building, submission, and a background polling session that
//! confirms the order on-chain. Once an attempt has begun it runs on its own
//! task, so a caller that stops waiting never strands it mid-flight.

pub mod context;
pub mod event_bus;

use crate::handlers::TransactionSubmitter;
use crate::monitoring::{ConfirmationPoller, PollOutcome, PollTarget};
use crate::order::{OrderParamsBuilder, RecipientEncoder};
use crate::state::{OrderStateError, OrderStateMachine};
use crate::PaymentError;
use chrono::Utc;
use context::{ActiveNetwork, SessionContext, TokenBalance};
use event_bus::EventBus;
use offramp_aggregator::AggregatorService;
use offramp_chain::ChainService;
use offramp_config::Config;
use offramp_encryption::EncryptionService;
use offramp_types::{
	format_token_amount, parse_units, AttemptId, NetworkRegistry, OrderPhase, OrderSnapshot,
	PaymentEvent, PaymentRequest, PendingOrder,
};
use offramp_wallet::WalletService;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{instrument, Instrument};

/// Message stored on an attempt whose polling session ran out of time.
pub const POLLING_TIMEOUT_MESSAGE: &str = "Timed out waiting for order confirmation";

/// Message stored on an attempt whose task died before finishing.
pub const INTERRUPTED_MESSAGE: &str = "Payment attempt was interrupted";

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
	#[error("Configuration error: {0}")]
	Config(String),
	#[error("Unknown network: {0}")]
	UnknownNetwork(String),
	#[error("Attempt {0} is still in progress")]
	AttemptInProgress(AttemptId),
	/// The attempt was started and then aborted; it is now `Failed`.
	#[error("{error}")]
	AttemptFailed {
		attempt: AttemptId,
		error: PaymentError,
	},
	#[error("Attempt {0} was interrupted")]
	Interrupted(AttemptId),
	#[error(transparent)]
	Payment(#[from] PaymentError),
	#[error(transparent)]
	State(#[from] OrderStateError),
	#[error("Chain read failed: {0}")]
	Chain(String),
}

/// Result of confirming a payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PaymentOutcome {
	/// Submitted; confirmation polling runs in the background.
	Started { attempt: AttemptId },
	/// Requested amount exceeds the balance. Nothing was built or submitted.
	InsufficientFunds { requested: String, available: String },
}

/// Why an attempt stopped before reaching the poller.
enum Abort {
	Payment(PaymentError),
	/// Cancelled or superseded while a step was awaiting.
	State(OrderStateError),
}

impl From<PaymentError> for Abort {
	fn from(error: PaymentError) -> Self {
		Abort::Payment(error)
	}
}

impl From<OrderStateError> for Abort {
	fn from(error: OrderStateError) -> Self {
		Abort::State(error)
	}
}

struct PollingSession {
	attempt: AttemptId,
	stop: watch::Sender<bool>,
	handle: JoinHandle<()>,
}

impl PollingSession {
	fn stop(self) {
		tracing::debug!(attempt = %self.attempt, "Stopping polling session");
		self.stop.send(true).ok();
		self.handle.abort();
	}
}

pub struct PaymentEngine {
	config: Config,
	context: Arc<SessionContext>,
	state: Arc<OrderStateMachine>,
	encoder: Arc<RecipientEncoder>,
	submitter: TransactionSubmitter,
	poller: Arc<ConfirmationPoller>,
	event_bus: EventBus,
	session: Arc<Mutex<Option<PollingSession>>>,
}

impl PaymentEngine {
	pub fn new(
		config: Config,
		aggregator: Arc<AggregatorService>,
		encryption: Arc<EncryptionService>,
		wallet: Option<Arc<WalletService>>,
		chain: ChainService,
		event_bus: EventBus,
	) -> Result<Self, EngineError> {
		let initial_network = config
			.initial_network()
			.ok_or_else(|| EngineError::Config("No networks configured".to_string()))?;
		let context = SessionContext::new(
			config.network_registry(),
			&initial_network,
			wallet,
			chain.clone(),
		)?;

		let poller = Arc::new(ConfirmationPoller::new(
			chain,
			config.polling.interval(),
			config.polling.lookback_blocks,
			config.polling.timeout(),
		));

		Ok(Self {
			config,
			context: Arc::new(context),
			state: Arc::new(OrderStateMachine::new(event_bus.clone())),
			encoder: Arc::new(RecipientEncoder::new(aggregator, encryption)),
			submitter: TransactionSubmitter,
			poller,
			event_bus,
			session: Arc::new(Mutex::new(None)),
		})
	}

	pub fn config(&self) -> &Config {
		&self.config
	}

	pub fn networks(&self) -> &NetworkRegistry {
		self.context.networks()
	}

	pub async fn active_network(&self) -> ActiveNetwork {
		self.context.active_network().await
	}

	pub async fn snapshot(&self) -> OrderSnapshot {
		self.state.snapshot().await
	}

	pub fn subscribe(&self) -> broadcast::Receiver<PaymentEvent> {
		self.event_bus.subscribe()
	}

	/// Runs a payment attempt up to submission and starts confirmation
	/// polling.
	///
	/// Returns once the wallet has accepted the submission. Build and
	/// submission errors fail the attempt and come back as
	/// [`EngineError::AttemptFailed`]; retrying means calling this again.
	///
	/// Dropping the returned future does not stop an attempt that has
	/// already begun: it keeps running and its progress shows up in
	/// [`snapshot`](Self::snapshot).
	#[instrument(skip_all, fields(token = %request.token_symbol, amount = %request.amount))]
	pub async fn confirm_payment(
		&self,
		request: PaymentRequest,
	) -> Result<PaymentOutcome, EngineError> {
		if let Some(current) = self.state.in_flight().await {
			return Err(EngineError::AttemptInProgress(current));
		}
		let network = self.context.active_network().await;

		if let Some(outcome) = self.check_balance(&network, &request).await? {
			return Ok(outcome);
		}

		let attempt = self.state.begin_attempt().await.map_err(|e| match e {
			OrderStateError::InProgress(current) => EngineError::AttemptInProgress(current),
			other => EngineError::State(other),
		})?;
		tracing::info!(attempt = %attempt, network = %network.name, "Payment confirmed");

		let runner = self.runner();
		let handle = tokio::spawn(
			async move { runner.run(attempt, network, request).await }
				.instrument(tracing::Span::current()),
		);
		match handle.await {
			Ok(result) => result,
			Err(e) => {
				tracing::error!(attempt = %attempt, error = %e, "Attempt task failed");
				self.state.fail(attempt, INTERRUPTED_MESSAGE).await.ok();
				Err(EngineError::Interrupted(attempt))
			}
		}
	}

	/// Leaves the confirmation flow. Stops polling and returns to Idle.
	pub async fn cancel_confirmation(&self) -> Result<AttemptId, EngineError> {
		self.stop_polling().await;
		let attempt = self.state.cancel().await?;
		tracing::info!(attempt = %attempt, "Attempt cancelled");
		Ok(attempt)
	}

	/// Clears a confirmed or failed attempt.
	pub async fn reset(&self) -> Result<(), EngineError> {
		if let Some(current) = self.state.in_flight().await {
			return Err(EngineError::AttemptInProgress(current));
		}
		self.stop_polling().await;
		self.state.reset().await?;
		Ok(())
	}

	/// Switches the active network. Refused while an attempt is in flight.
	pub async fn select_network(&self, name: &str) -> Result<ActiveNetwork, EngineError> {
		if let Some(current) = self.state.in_flight().await {
			return Err(EngineError::AttemptInProgress(current));
		}
		self.context.select_network(name).await
	}

	/// Current balance of the connected wallet in `symbol` on the active
	/// network, read from the chain.
	pub async fn balance(&self, symbol: &str) -> Result<TokenBalance, EngineError> {
		let network = self.context.active_network().await;
		let token = self.context.resolve_token(symbol).await?;
		let amount = self
			.context
			.refresh_balance(network.chain_id, token.address)
			.await?;

		Ok(TokenBalance {
			symbol: token.symbol,
			chain_id: network.chain_id,
			token: token.address,
			decimals: token.decimals,
			amount,
		})
	}

	/// Stops any polling session. Called on shutdown.
	pub async fn shutdown(&self) {
		self.stop_polling().await;
	}

	/// `Some` when the payment must not proceed for lack of funds.
	///
	/// Skipped when the token or wallet is unknown or the amount does not
	/// scale; the builder reports those as failures of the attempt. A cached
	/// balance only lets a payment through; a refusal always rests on a
	/// fresh chain read.
	async fn check_balance(
		&self,
		network: &ActiveNetwork,
		request: &PaymentRequest,
	) -> Result<Option<PaymentOutcome>, EngineError> {
		let Ok(token) = OrderParamsBuilder::new(self.context.networks(), &network.name)
			.resolve_token(&request.token_symbol)
		else {
			return Ok(None);
		};
		if self.context.wallet().is_none() {
			return Ok(None);
		}
		let Ok(requested) = parse_units(request.amount, token.decimals) else {
			return Ok(None);
		};

		let cached = self
			.context
			.cached_balance(network.chain_id, token.address)
			.await;
		if cached.is_some_and(|available| requested <= available) {
			return Ok(None);
		}
		let available = self
			.context
			.refresh_balance(network.chain_id, token.address)
			.await?;
		if requested <= available {
			return Ok(None);
		}

		let requested = format_token_amount(requested, token.decimals);
		let available = format_token_amount(available, token.decimals);
		tracing::info!(
			symbol = %token.symbol,
			%requested,
			%available,
			"Insufficient funds"
		);
		self.event_bus
			.publish(PaymentEvent::InsufficientFunds {
				requested: requested.clone(),
				available: available.clone(),
			})
			.ok();

		Ok(Some(PaymentOutcome::InsufficientFunds {
			requested,
			available,
		}))
	}

	fn runner(&self) -> AttemptRunner {
		AttemptRunner {
			context: self.context.clone(),
			state: self.state.clone(),
			encoder: self.encoder.clone(),
			submitter: self.submitter,
			poller: self.poller.clone(),
			session: self.session.clone(),
		}
	}

	async fn stop_polling(&self) {
		if let Some(session) = self.session.lock().await.take() {
			session.stop();
		}
	}
}

/// The parts of the engine an attempt task works with.
struct AttemptRunner {
	context: Arc<SessionContext>,
	state: Arc<OrderStateMachine>,
	encoder: Arc<RecipientEncoder>,
	submitter: TransactionSubmitter,
	poller: Arc<ConfirmationPoller>,
	session: Arc<Mutex<Option<PollingSession>>>,
}

impl AttemptRunner {
	async fn run(
		self,
		attempt: AttemptId,
		network: ActiveNetwork,
		request: PaymentRequest,
	) -> Result<PaymentOutcome, EngineError> {
		match self.submit(attempt, &network, &request).await {
			Ok(pending) => {
				self.start_polling(attempt, &network, &pending).await?;
				if let Err(e) = self
					.context
					.refresh_balance(pending.chain_id, pending.token)
					.await
				{
					tracing::warn!(error = %e, "Failed to refresh balance after submission");
				}
				Ok(PaymentOutcome::Started { attempt })
			}
			Err(Abort::Payment(error)) => {
				if let Err(e) = self.state.fail(attempt, error.to_string()).await {
					tracing::warn!(attempt = %attempt, error = %e, "Could not record failure");
				}
				Err(EngineError::AttemptFailed { attempt, error })
			}
			Err(Abort::State(e)) => {
				tracing::info!(attempt = %attempt, reason = %e, "Attempt abandoned");
				Err(EngineError::State(e))
			}
		}
	}

	async fn submit(
		&self,
		attempt: AttemptId,
		network: &ActiveNetwork,
		request: &PaymentRequest,
	) -> Result<PendingOrder, Abort> {
		let builder = OrderParamsBuilder::new(self.context.networks(), &network.name);
		// Cheap lookups first so a bad request never costs a key fetch.
		builder.resolve_token(&request.token_symbol)?;
		let wallet = self.context.wallet().ok_or(PaymentError::NoWallet)?;

		let payload = self.encoder.encode(&request.recipient).await?;
		let params = builder.build(request, Some(wallet.address()), payload)?;

		self.state
			.transition(attempt, OrderPhase::AwaitingWalletSignature)
			.await?;
		let receipt = self
			.submitter
			.submit(wallet, network.chain_id, network.gateway, &params)
			.await?;

		let pending = PendingOrder {
			sender: wallet.address(),
			token: params.token,
			submitted_at: Utc::now(),
			chain_id: receipt.chain_id,
		};
		self.state.mark_submitted(attempt, pending.clone()).await?;
		Ok(pending)
	}

	async fn start_polling(
		&self,
		attempt: AttemptId,
		network: &ActiveNetwork,
		pending: &PendingOrder,
	) -> Result<(), OrderStateError> {
		let mut session = self.session.lock().await;
		// Guarded by attempt, so a superseded attempt never gets this far.
		self.state.transition(attempt, OrderPhase::Polling).await?;
		if let Some(previous) = session.take() {
			previous.stop();
		}

		let (stop, stop_rx) = watch::channel(false);
		let target = PollTarget {
			chain_id: pending.chain_id,
			gateway: network.gateway,
			sender: pending.sender,
			token: pending.token,
		};
		let poller = self.poller.clone();
		let state = self.state.clone();

		let handle = tokio::spawn(
			async move {
				let result = match poller.poll(target, stop_rx).await {
					PollOutcome::Confirmed(order) => state.confirm(attempt, order).await,
					PollOutcome::TimedOut => state.fail(attempt, POLLING_TIMEOUT_MESSAGE).await,
					PollOutcome::Cancelled => Ok(()),
				};
				if let Err(e) = result {
					tracing::warn!(error = %e, "Discarded polling outcome");
				}
			}
			.instrument(tracing::info_span!("polling", attempt = %attempt)),
		);

		*session = Some(PollingSession {
			attempt,
			stop,
			handle,
		});
		Ok(())
	}
}
