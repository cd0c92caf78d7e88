//! Order state machine.
//!
//! Sequences an attempt through
//! Idle -> BuildingParams -> AwaitingWalletSignature -> Submitted -> Polling -> Confirmed,
//! with Failed reachable from every step that can fail, and Idle reachable
//! again through cancellation or reset. Each accepted change is published on
//! the event bus.

use crate::engine::event_bus::EventBus;
use once_cell::sync::Lazy;
use offramp_types::{
	AttemptId, ConfirmedOrder, OrderPhase, OrderSnapshot, PaymentEvent, PendingOrder,
};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors that can occur when mutating the order state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OrderStateError {
	#[error("Invalid state transition from {from} to {to}")]
	InvalidTransition { from: OrderPhase, to: OrderPhase },
	#[error("Attempt {0} is no longer current")]
	StaleAttempt(AttemptId),
	#[error("Attempt {0} is still in progress")]
	InProgress(AttemptId),
}

static TRANSITIONS: Lazy<HashMap<OrderPhase, HashSet<OrderPhase>>> = Lazy::new(|| {
	use OrderPhase::*;

	let mut m = HashMap::new();
	m.insert(Idle, HashSet::from([BuildingParams]));
	m.insert(
		BuildingParams,
		HashSet::from([AwaitingWalletSignature, Failed, Idle]),
	);
	m.insert(
		AwaitingWalletSignature,
		HashSet::from([Submitted, Failed, Idle]),
	);
	m.insert(Submitted, HashSet::from([Polling, Idle]));
	m.insert(Polling, HashSet::from([Confirmed, Failed, Idle]));
	m.insert(Confirmed, HashSet::from([Idle]));
	m.insert(Failed, HashSet::from([Idle]));
	m
});

fn is_valid_transition(from: OrderPhase, to: OrderPhase) -> bool {
	TRANSITIONS
		.get(&from)
		.map(|allowed| allowed.contains(&to))
		.unwrap_or(false)
}

struct OrderState {
	phase: OrderPhase,
	attempt: Option<AttemptId>,
	/// Last attempt id handed out; ids are never reused.
	last_attempt: AttemptId,
	error: Option<String>,
	pending: Option<PendingOrder>,
	confirmed: Option<ConfirmedOrder>,
}

impl OrderState {
	fn guard(&self, attempt: AttemptId) -> Result<(), OrderStateError> {
		if self.attempt != Some(attempt) {
			return Err(OrderStateError::StaleAttempt(attempt));
		}
		Ok(())
	}

	fn in_flight(&self) -> Option<AttemptId> {
		if self.phase.is_in_flight() {
			self.attempt
		} else {
			None
		}
	}
}

/// Owner of the current phase, attempt and their records.
pub struct OrderStateMachine {
	state: RwLock<OrderState>,
	events: EventBus,
}

impl OrderStateMachine {
	pub fn new(events: EventBus) -> Self {
		Self {
			state: RwLock::new(OrderState {
				phase: OrderPhase::Idle,
				attempt: None,
				last_attempt: AttemptId::new(0),
				error: None,
				pending: None,
				confirmed: None,
			}),
			events,
		}
	}

	pub async fn snapshot(&self) -> OrderSnapshot {
		let state = self.state.read().await;
		OrderSnapshot {
			phase: state.phase,
			attempt: state.attempt,
			error: state.error.clone(),
			pending: state.pending.clone(),
			confirmed: state.confirmed.clone(),
		}
	}

	pub async fn phase(&self) -> OrderPhase {
		self.state.read().await.phase
	}

	/// The running attempt, if one is in flight.
	pub async fn in_flight(&self) -> Option<AttemptId> {
		self.state.read().await.in_flight()
	}

	/// Starts a new attempt in `BuildingParams`.
	///
	/// A finished attempt (Confirmed or Failed) is reset to Idle first.
	/// Refused while another attempt is in flight.
	pub async fn begin_attempt(&self) -> Result<AttemptId, OrderStateError> {
		let mut state = self.state.write().await;
		if let Some(current) = state.in_flight() {
			return Err(OrderStateError::InProgress(current));
		}
		if let (true, Some(previous)) = (state.phase.is_terminal(), state.attempt) {
			self.apply(&mut state, previous, OrderPhase::Idle)?;
		}

		let attempt = state.last_attempt.next();
		state.last_attempt = attempt;
		state.attempt = Some(attempt);
		state.error = None;
		state.pending = None;
		state.confirmed = None;
		self.apply(&mut state, attempt, OrderPhase::BuildingParams)?;

		Ok(attempt)
	}

	/// Moves `attempt` to `to` if that is a legal step from its phase.
	pub async fn transition(
		&self,
		attempt: AttemptId,
		to: OrderPhase,
	) -> Result<(), OrderStateError> {
		let mut state = self.state.write().await;
		state.guard(attempt)?;
		self.apply(&mut state, attempt, to)
	}

	/// Records the pending order and moves to `Submitted`.
	pub async fn mark_submitted(
		&self,
		attempt: AttemptId,
		pending: PendingOrder,
	) -> Result<(), OrderStateError> {
		let mut state = self.state.write().await;
		state.guard(attempt)?;
		self.apply(&mut state, attempt, OrderPhase::Submitted)?;
		state.pending = Some(pending.clone());

		self.events
			.publish(PaymentEvent::Submitted { attempt, pending })
			.ok();
		Ok(())
	}

	/// Records the confirmed order. Accepted once, and only from `Polling`.
	pub async fn confirm(
		&self,
		attempt: AttemptId,
		order: ConfirmedOrder,
	) -> Result<(), OrderStateError> {
		let mut state = self.state.write().await;
		state.guard(attempt)?;
		self.apply(&mut state, attempt, OrderPhase::Confirmed)?;
		state.pending = None;
		state.confirmed = Some(order.clone());

		self.events
			.publish(PaymentEvent::Confirmed { attempt, order })
			.ok();
		Ok(())
	}

	/// Fails `attempt` with a short user-facing message.
	pub async fn fail(
		&self,
		attempt: AttemptId,
		message: impl Into<String>,
	) -> Result<(), OrderStateError> {
		let message = message.into();
		let mut state = self.state.write().await;
		state.guard(attempt)?;
		self.apply(&mut state, attempt, OrderPhase::Failed)?;
		state.error = Some(message.clone());

		tracing::warn!(attempt = %attempt, error = %message, "Attempt failed");
		self.events
			.publish(PaymentEvent::Failed { attempt, message })
			.ok();
		Ok(())
	}

	/// Abandons the in-flight attempt and returns to Idle.
	pub async fn cancel(&self) -> Result<AttemptId, OrderStateError> {
		let mut state = self.state.write().await;
		let attempt = state
			.in_flight()
			.ok_or(OrderStateError::InvalidTransition {
				from: state.phase,
				to: OrderPhase::Idle,
			})?;

		self.apply(&mut state, attempt, OrderPhase::Idle)?;
		state.pending = None;
		Ok(attempt)
	}

	/// Clears a finished attempt. A no-op when already Idle.
	pub async fn reset(&self) -> Result<(), OrderStateError> {
		let mut state = self.state.write().await;
		if let Some(current) = state.in_flight() {
			return Err(OrderStateError::InProgress(current));
		}
		if let (OrderPhase::Confirmed | OrderPhase::Failed, Some(attempt)) =
			(state.phase, state.attempt)
		{
			self.apply(&mut state, attempt, OrderPhase::Idle)?;
		}
		state.error = None;
		state.pending = None;
		state.confirmed = None;
		Ok(())
	}

	fn apply(
		&self,
		state: &mut OrderState,
		attempt: AttemptId,
		to: OrderPhase,
	) -> Result<(), OrderStateError> {
		let from = state.phase;
		if !is_valid_transition(from, to) {
			return Err(OrderStateError::InvalidTransition { from, to });
		}
		state.phase = to;

		tracing::info!(attempt = %attempt, from = %from, to = %to, "Phase changed");
		self.events
			.publish(PaymentEvent::PhaseChanged { attempt, from, to })
			.ok();
		Ok(())
	}
}
