//! Common library for the Bandroom client
//!
//! This crate provides shared functionality used by the client crates,
//! including the error taxonomy, layered configuration and logging setup.

pub mod config;
pub mod error;
pub mod telemetry;

pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};

/// Example usage of the configuration module
///
/// ```rust,no_run
/// use common::{ClientConfig, telemetry::init_tracing};
///
/// fn main() -> anyhow::Result<()> {
///     let config = ClientConfig::load(None)?;
///     init_tracing(&config.log_level)?;
///     println!("Backend: {}", config.base_url()?);
///     Ok(())
/// }
/// ```
pub fn example_usage() {}
