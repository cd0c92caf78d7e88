//! Building an order: recipient encryption and gateway call parameters.

pub mod encoder;
pub mod params;

pub use encoder::RecipientEncoder;
pub use params::OrderParamsBuilder;
