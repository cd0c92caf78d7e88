//! Events published as a payment attempt progresses.
//!
//! The engine broadcasts these so callers (the HTTP layer, tests) can follow
//! phase changes without polling the snapshot.

use serde::{Deserialize, Serialize};

use crate::{AttemptId, ConfirmedOrder, OrderPhase, PendingOrder};

/// Main event type of the payment pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PaymentEvent {
	/// The attempt moved to a new phase.
	PhaseChanged {
		attempt: AttemptId,
		from: OrderPhase,
		to: OrderPhase,
	},
	/// The wallet accepted the submission; confirmation polling follows.
	Submitted {
		attempt: AttemptId,
		pending: PendingOrder,
	},
	/// The gateway recorded the order.
	Confirmed {
		attempt: AttemptId,
		order: ConfirmedOrder,
	},
	/// The attempt failed with a short user-facing message.
	Failed { attempt: AttemptId, message: String },
	/// The requested amount exceeds the available balance. No attempt was started.
	InsufficientFunds { requested: String, available: String },
}

impl PaymentEvent {
	/// Attempt this event belongs to, if any.
	pub fn attempt(&self) -> Option<AttemptId> {
		match self {
			PaymentEvent::PhaseChanged { attempt, .. }
			| PaymentEvent::Submitted { attempt, .. }
			| PaymentEvent::Confirmed { attempt, .. }
			| PaymentEvent::Failed { attempt, .. } => Some(*attempt),
			PaymentEvent::InsufficientFunds { .. } => None,
		}
	}
}
