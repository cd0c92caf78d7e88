//! Phase tracking for payment attempts.
//!
//! One attempt is current at a time. Every mutation names the attempt it
//! belongs to, so work left over from an earlier attempt cannot touch the
//! current one.

pub mod order;

pub use order::{OrderStateError, OrderStateMachine};
