//! Core types and utilities for the Naturalize admin tooling
//!
//! Holds everything the API client and its front ends share: the response
//! envelope, the backend DTOs, configuration, and the small amount of
//! arithmetic the dashboard tables need (filtering, pagination, percentages).

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

pub mod config;
pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::{Config, LoggingConfig};
pub use error::{Error, Result};
pub use types::{ApiResponse, ResourceId, ResponseMeta};

/// Initialize the logging system
///
/// `RUST_LOG` wins over the configured level when it is set. The format is
/// JSON unless the configuration asks for `pretty`. Events go to stderr so
/// command output on stdout stays machine-readable.
///
/// # Errors
///
/// Returns an error if a global subscriber has already been installed.
pub fn init_logging(logging: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));
    let json = logging.format.eq_ignore_ascii_case("json");

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| {
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_writer(std::io::stderr)
        }))
        .try_init()
        .map_err(|e| Error::Configuration {
            message: format!("failed to install tracing subscriber: {e}"),
        })
}
