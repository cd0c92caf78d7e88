//! Programmatic construction of configurations for tests and tooling.

pub mod config;
