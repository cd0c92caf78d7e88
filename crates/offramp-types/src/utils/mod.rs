//! Formatting and unit-scaling helpers.

pub mod formatting;
pub mod units;

pub use formatting::{format_token_amount, truncate_id, without_0x_prefix};
pub use units::{parse_units, to_uint96, UnitsError};
