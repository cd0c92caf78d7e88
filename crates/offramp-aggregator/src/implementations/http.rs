//! HTTP aggregator key service.
//!
//! Fetches the key from `GET {base_url}/pubkey`. The service answers with an
//! envelope of the form `{ "status": "success", "message": ..., "data": "<key>" }`.

use crate::{AggregatorError, AggregatorInterface};
use async_trait::async_trait;
use offramp_types::{ConfigSchema, Field, FieldType, PublicKey, Schema, ValidationError};
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

/// Response envelope of the aggregator API.
#[derive(Debug, Deserialize)]
struct PubkeyResponse {
	status: String,
	#[serde(default)]
	message: Option<String>,
	#[serde(default)]
	data: Option<String>,
}

/// Aggregator client talking to the key endpoint over HTTP.
pub struct HttpAggregator {
	client: reqwest::Client,
	pubkey_url: String,
}

impl HttpAggregator {
	pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AggregatorError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| AggregatorError::Configuration(format!("HTTP client: {}", e)))?;

		Ok(Self {
			client,
			pubkey_url: pubkey_url(base_url),
		})
	}
}

fn pubkey_url(base_url: &str) -> String {
	format!("{}/pubkey", base_url.trim_end_matches('/'))
}

/// Extracts the key from a response body.
fn parse_pubkey_response(body: &str) -> Result<PublicKey, AggregatorError> {
	let response: PubkeyResponse = serde_json::from_str(body)
		.map_err(|e| AggregatorError::InvalidResponse(format!("Malformed body: {}", e)))?;

	if !response.status.eq_ignore_ascii_case("success") {
		return Err(AggregatorError::InvalidResponse(format!(
			"Aggregator returned status '{}': {}",
			response.status,
			response.message.unwrap_or_default()
		)));
	}

	match response.data {
		Some(key) if !key.trim().is_empty() => Ok(PublicKey::new(key.trim())),
		_ => Err(AggregatorError::InvalidResponse(
			"Aggregator returned an empty public key".to_string(),
		)),
	}
}

pub struct HttpAggregatorSchema;

impl HttpAggregatorSchema {
	pub fn validate_config(config: &toml::Value) -> Result<(), ValidationError> {
		Self.validate(config)
	}
}

impl ConfigSchema for HttpAggregatorSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("base_url", FieldType::String).with_validator(|value| {
				match value.as_str() {
					Some(url) if url.starts_with("http://") || url.starts_with("https://") => Ok(()),
					_ => Err("base_url must be an http(s) URL".to_string()),
				}
			})],
			vec![Field::new(
				"timeout_seconds",
				FieldType::Integer {
					min: Some(1),
					max: Some(300),
				},
			)],
		);
		schema.validate(config)
	}
}

#[async_trait]
impl AggregatorInterface for HttpAggregator {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(HttpAggregatorSchema)
	}

	async fn fetch_public_key(&self) -> Result<PublicKey, AggregatorError> {
		let response = self
			.client
			.get(&self.pubkey_url)
			.send()
			.await
			.map_err(|e| AggregatorError::Network(format!("Failed to fetch public key: {}", e)))?;

		let status = response.status();
		let body = response
			.text()
			.await
			.map_err(|e| AggregatorError::Network(format!("Failed to read response: {}", e)))?;

		if !status.is_success() {
			return Err(AggregatorError::Network(format!(
				"Aggregator responded with HTTP {}",
				status
			)));
		}

		let key = parse_pubkey_response(&body)?;
		tracing::debug!(url = %self.pubkey_url, "Fetched aggregator public key");
		Ok(key)
	}
}

/// Builds an [`HttpAggregator`] from its configuration table.
///
/// - `base_url` (required): aggregator API root
/// - `timeout_seconds` (optional, default 10)
pub fn create_http_aggregator(
	config: &toml::Value,
) -> Result<Box<dyn AggregatorInterface>, AggregatorError> {
	HttpAggregatorSchema::validate_config(config)
		.map_err(|e| AggregatorError::Configuration(format!("Invalid configuration: {}", e)))?;

	let base_url = config
		.get("base_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| AggregatorError::Configuration("base_url is required".to_string()))?;
	let timeout = config
		.get("timeout_seconds")
		.and_then(|v| v.as_integer())
		.map(|s| s as u64)
		.unwrap_or(DEFAULT_TIMEOUT_SECONDS);

	Ok(Box::new(HttpAggregator::new(
		base_url,
		Duration::from_secs(timeout),
	)?))
}

pub struct Registry;

impl offramp_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "http";
	type Factory = crate::AggregatorFactory;

	fn factory() -> Self::Factory {
		create_http_aggregator
	}
}

impl crate::AggregatorRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_pubkey_url_joins_cleanly() {
		assert_eq!(
			pubkey_url("https://api.example.com/v1/"),
			"https://api.example.com/v1/pubkey"
		);
		assert_eq!(pubkey_url("http://localhost:8000"), "http://localhost:8000/pubkey");
	}

	#[test]
	fn test_parse_success() {
		let key = parse_pubkey_response(
			r#"{"status":"success","message":"OK","data":"0x02abcdef"}"#,
		)
		.unwrap();
		assert_eq!(key.as_str(), "0x02abcdef");
	}

	#[test]
	fn test_parse_failures() {
		assert!(matches!(
			parse_pubkey_response(r#"{"status":"error","message":"down"}"#),
			Err(AggregatorError::InvalidResponse(msg)) if msg.contains("down")
		));
		assert!(matches!(
			parse_pubkey_response(r#"{"status":"success","data":""}"#),
			Err(AggregatorError::InvalidResponse(_))
		));
		assert!(matches!(
			parse_pubkey_response("<html>"),
			Err(AggregatorError::InvalidResponse(_))
		));
	}

	#[test]
	fn test_factory_validates_config() {
		let config: toml::Value = toml::from_str("base_url = \"ftp://nope\"").unwrap();
		assert!(create_http_aggregator(&config).is_err());

		let config: toml::Value =
			toml::from_str("base_url = \"https://api.example.com/v1\"\ntimeout_seconds = 5").unwrap();
		assert!(create_http_aggregator(&config).is_ok());
	}
}
