//! Handlers for the steps that talk to the wallet.

pub mod submission;

pub use submission::TransactionSubmitter;
