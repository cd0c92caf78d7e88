//! Core payment pipeline of the off-ramp service.
//!
//! A payment moves through five steps: the recipient is encrypted for the
//! aggregator, the gateway call parameters are assembled, an approval and the
//! order-creation call are submitted together through the wallet, the gateway
//! logs are polled until the order shows up, and a state machine sequences
//! all of it while exposing the current phase to callers.

pub mod builder;
pub mod engine;
pub mod handlers;
pub mod monitoring;
pub mod order;
pub mod state;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use builder::{BuilderError, EngineBuilder, EngineFactories};
pub use engine::{
	context::{ActiveNetwork, SessionContext, TokenBalance},
	event_bus::EventBus,
	EngineError, PaymentEngine, PaymentOutcome,
};
pub use state::{OrderStateError, OrderStateMachine};

use thiserror::Error;

/// Why a payment attempt was aborted.
///
/// The `Display` output is the short message shown to the user and stored as
/// the error of the failed attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PaymentError {
	#[error("Could not fetch the aggregator key: {0}")]
	KeyFetch(String),
	#[error("Could not encrypt recipient details: {0}")]
	Encryption(String),
	#[error("{symbol} is not supported on {network}")]
	UnsupportedToken { symbol: String, network: String },
	#[error("No wallet connected")]
	NoWallet,
	#[error("Could not switch to chain {chain_id}: {reason}")]
	ChainSwitch { chain_id: u64, reason: String },
	#[error("Transaction failed: {0}")]
	Submission(String),
	#[error("Invalid amount: {0}")]
	InvalidAmount(String),
}
