//! Retry with linear backoff

use crate::cancel::RequestToken;
use crate::error::ClientResult;
use crate::options::{HttpMethod, RequestOptions};
use crate::policy;
use crate::service::{ApiService, Payload};
use naturalize_core::ApiResponse;
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Backoff before the attempt following attempt number `attempt` (1-based)
#[must_use]
pub const fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(attempt)
}

impl ApiService {
    /// Issue `method` with up to `options.retries` extra attempts
    ///
    /// Only transient failures (no response, 408, 429, 5xx) are retried. The
    /// attempts before the last one are silent: no notices, no session
    /// handling. Cancelling `options.cancel` during a backoff ends the loop.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ClientError::UnsupportedMethod`] when `method` is not
    /// one of GET, POST, PUT, PATCH or DELETE. HTTP failures are never errors.
    pub async fn request_with_retry(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> ClientResult<ApiResponse> {
        let method: HttpMethod = method.parse()?;
        Ok(self.retrying(method, path, body, options).await)
    }

    pub(crate) async fn retrying(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
        options: RequestOptions,
    ) -> ApiResponse {
        let _release = self.release_on_finish(&options);
        let cache_key = Self::cache_key(method, path, &options);
        if let Some(hit) = self.cached(cache_key.as_deref()) {
            return hit;
        }

        let body = body.or_else(|| options.body.clone());
        let mut attempt_number: u32 = 1;
        loop {
            let attempt = self
                .execute(method, path, Payload::from(body.clone()), &options)
                .await;

            if attempt_number > options.retries || !attempt.is_transient() {
                return self.settle(method, attempt, &options, cache_key).await;
            }

            let delay = backoff_delay(options.retry_delay, attempt_number);
            debug!(%method, path, attempt = attempt_number, ?delay, "transient failure, retrying");
            if !wait(delay, options.cancel.as_ref().map(RequestToken::token)).await {
                return policy::cancelled();
            }
            attempt_number += 1;
        }
    }
}

// Sleep for `delay`; false when the token fired first.
async fn wait(delay: Duration, cancel: Option<&CancellationToken>) -> bool {
    match cancel {
        Some(token) => tokio::select! {
            biased;
            () = token.cancelled() => false,
            () = tokio::time::sleep(delay) => true,
        },
        None => {
            tokio::time::sleep(delay).await;
            true
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_backoff_is_linear() {
        let base = Duration::from_millis(1000);
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(1000));
        assert_eq!(backoff_delay(base, 2), Duration::from_millis(2000));
        assert_eq!(backoff_delay(base, 3), Duration::from_millis(3000));
    }

    #[tokio::test]
    async fn test_unsupported_method_is_an_error() {
        let api = ApiService::builder("http://localhost:9").build().unwrap();
        let err = api
            .request_with_retry("OPTIONS", "/users", None, RequestOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::UnsupportedMethod { .. }));
    }

    #[tokio::test]
    async fn test_cancel_during_backoff_stops_waiting() {
        let token = CancellationToken::new();
        let waiter = tokio::spawn({
            let token = token.clone();
            async move { wait(Duration::from_secs(30), Some(&token)).await }
        });
        token.cancel();
        assert!(!waiter.await.unwrap());
    }

    #[tokio::test]
    async fn test_wait_without_token_completes() {
        assert!(wait(Duration::from_millis(1), None).await);
    }
}
