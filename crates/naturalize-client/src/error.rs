//! Error types for the API client
//!
//! HTTP-level failures never surface here: they are folded into
//! [`naturalize_core::ApiResponse`] envelopes. These errors cover misuse of the
//! client and local failures around it.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors the caller is expected to handle
#[derive(Error, Debug)]
pub enum ClientError {
    /// A request named a method the client does not issue
    #[error("Unsupported method: {method}")]
    UnsupportedMethod {
        /// The method name as given
        method: String,
    },

    /// The configured base URL is unusable
    #[error("Invalid base URL '{url}': {reason}")]
    InvalidUrl {
        /// The URL as given
        url: String,
        /// Why it was rejected
        reason: String,
    },

    /// A file to upload could not be read
    #[error("Failed to read upload source {path}: {source}")]
    UploadSource {
        /// File that was being read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A failure envelope was decoded as if it carried data
    #[error("API request failed: {message}")]
    Api {
        /// HTTP status, when a response arrived
        status: Option<u16>,
        /// Envelope message
        message: String,
    },

    /// Building the HTTP transport failed
    #[error("HTTP client setup failed: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Error from the core crate (decoding, validation)
    #[error(transparent)]
    Core(#[from] naturalize_core::Error),
}

impl ClientError {
    /// Create an unsupported method error
    #[must_use]
    pub fn unsupported_method(method: impl Into<String>) -> Self {
        Self::UnsupportedMethod {
            method: method.into(),
        }
    }

    /// Create an API failure error from a failure envelope
    #[must_use]
    pub fn api(response: &naturalize_core::ApiResponse) -> Self {
        Self::Api {
            status: response.status(),
            message: response.message.clone(),
        }
    }

    /// Create an invalid URL error
    #[must_use]
    pub fn invalid_url(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.into(),
        }
    }
}
