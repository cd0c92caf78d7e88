//! Confirmation polling for submitted orders.

pub mod confirmation;

pub use confirmation::{ConfirmationPoller, PollOutcome, PollTarget};
