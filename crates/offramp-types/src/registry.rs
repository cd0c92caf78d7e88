//! Registry trait for pluggable implementations.

/// Ties an implementation's configuration name to its factory.
///
/// Each implementation module exposes a `Registry` type implementing this
/// trait, e.g. `evm_alloy` under `[chain.implementations.evm_alloy]`. The
/// service binary collects them into name to factory maps.
pub trait ImplementationRegistry {
	/// Key of the implementation's table in the configuration file.
	const NAME: &'static str;

	/// Factory function type of the owning component.
	type Factory;

	fn factory() -> Self::Factory;
}
