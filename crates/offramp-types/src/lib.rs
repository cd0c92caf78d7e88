//! Common types for the off-ramp order pipeline.
//!
//! This crate defines the data model shared by every component of the
//! pipeline: recipient data and its encrypted form, order parameters, pending
//! and confirmed orders, the order phase enumeration, network and token
//! registries, contract bindings, and configuration validation helpers.

/// Request/response payloads for the HTTP API.
pub mod api;
/// Solidity bindings for the gateway, ERC-20 and smart-account contracts.
pub mod contracts;
/// Wallet call and submission receipt types.
pub mod delivery;
/// Events published while an order moves through its phases.
pub mod events;
/// Network, token and gateway configuration plus the lookup registry.
pub mod networks;
/// Order parameters, attempts, phases and confirmation records.
pub mod order;
/// Recipient information, aggregator public keys and encrypted payloads.
pub mod payload;
/// Registry trait for pluggable implementations.
pub mod registry;
/// Redacting, zeroising string wrapper for key material.
pub mod secret_string;
/// Formatting and unit-scaling helpers.
pub mod utils;
/// Configuration schema validation.
pub mod validation;

pub use api::*;
pub use delivery::*;
pub use events::*;
pub use networks::{
	deserialize_networks, NetworkConfig, NetworkRef, NetworkRegistry, NetworksConfig, TokenConfig,
};
pub use order::*;
pub use payload::*;
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use utils::{
	format_token_amount, parse_units, to_uint96, truncate_id, without_0x_prefix, UnitsError,
};
pub use validation::*;

/// Re-exported so downstream crates agree on a single primitives version.
pub use alloy_primitives::{Address, Bytes, B256, U256};
