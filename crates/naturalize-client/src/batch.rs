//! Concurrent batches of requests

use crate::options::{HttpMethod, RequestOptions};
use crate::service::ApiService;
use futures::future::join_all;
use naturalize_core::ApiResponse;
use serde_json::Value;
use tracing::debug;

/// One request of a batch
#[derive(Debug, Clone)]
pub struct BatchRequest {
    /// Method name, case-insensitive
    pub method: String,
    /// Path relative to the base URL
    pub path: String,
    /// JSON body
    pub body: Option<Value>,
    /// Per-request options
    pub options: RequestOptions,
}

impl BatchRequest {
    /// Request with default options and no body
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            body: None,
            options: RequestOptions::default(),
        }
    }

    /// GET `path`
    pub fn get(path: impl Into<String>) -> Self {
        Self::new("get", path)
    }

    /// Attach a JSON body
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Replace the options
    #[must_use]
    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }
}

/// Result of a batch, in request order
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// True only when every slot succeeded
    pub success: bool,
    /// One envelope per request
    pub results: Vec<ApiResponse>,
}

impl BatchOutcome {
    /// Number of failed slots
    #[must_use]
    pub fn failures(&self) -> usize {
        self.results.iter().filter(|r| !r.success).count()
    }
}

impl ApiService {
    /// Run every request concurrently
    ///
    /// An unsupported method fails only its own slot.
    pub async fn batch(&self, requests: Vec<BatchRequest>) -> BatchOutcome {
        let total = requests.len();
        let calls = requests.into_iter().map(|request| async move {
            match request.method.parse::<HttpMethod>() {
                Ok(method) => {
                    self.request(method, &request.path, request.body, request.options)
                        .await
                }
                Err(e) => ApiResponse::failure(e.to_string(), None),
            }
        });

        let results = join_all(calls).await;
        let success = results.iter().all(|r| r.success);
        debug!(total, success, "batch finished");
        BatchOutcome { success, results }
    }
}
