//! Aggregator key taken from configuration.
//!
//! Useful offline and in tests, where no key service is reachable.

use crate::{AggregatorError, AggregatorInterface};
use async_trait::async_trait;
use offramp_types::{ConfigSchema, Field, FieldType, PublicKey, Schema, ValidationError};

pub struct StaticAggregator {
	key: PublicKey,
}

impl StaticAggregator {
	pub fn new(key: PublicKey) -> Self {
		Self { key }
	}
}

pub struct StaticAggregatorSchema;

impl ConfigSchema for StaticAggregatorSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(
			vec![Field::new("public_key", FieldType::String).with_validator(|v| {
				match v.as_str() {
					Some(s) if !s.trim().is_empty() => Ok(()),
					_ => Err("public_key cannot be empty".to_string()),
				}
			})],
			vec![],
		)
		.validate(config)
	}
}

#[async_trait]
impl AggregatorInterface for StaticAggregator {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(StaticAggregatorSchema)
	}

	async fn fetch_public_key(&self) -> Result<PublicKey, AggregatorError> {
		Ok(self.key.clone())
	}
}

/// Builds a [`StaticAggregator`] from `public_key`.
pub fn create_static_aggregator(
	config: &toml::Value,
) -> Result<Box<dyn AggregatorInterface>, AggregatorError> {
	StaticAggregatorSchema
		.validate(config)
		.map_err(|e| AggregatorError::Configuration(format!("Invalid configuration: {}", e)))?;

	let key = config
		.get("public_key")
		.and_then(|v| v.as_str())
		.ok_or_else(|| AggregatorError::Configuration("public_key is required".to_string()))?;

	Ok(Box::new(StaticAggregator::new(PublicKey::new(key.trim()))))
}

pub struct Registry;

impl offramp_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "static";
	type Factory = crate::AggregatorFactory;

	fn factory() -> Self::Factory {
		create_static_aggregator
	}
}

impl crate::AggregatorRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_returns_configured_key() {
		let config: toml::Value = toml::from_str("public_key = \" 02ab \"").unwrap();
		let aggregator = create_static_aggregator(&config).unwrap();
		assert_eq!(aggregator.fetch_public_key().await.unwrap().as_str(), "02ab");
	}

	#[test]
	fn test_missing_key_rejected() {
		let config: toml::Value = toml::from_str("").unwrap();
		assert!(matches!(
			create_static_aggregator(&config),
			Err(AggregatorError::Configuration(_))
		));
	}
}
