//! Per-call options and HTTP methods

use crate::cancel::RequestToken;
use crate::error::ClientError;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Retries used when the caller does not override them
pub const DEFAULT_RETRIES: u32 = 3;

/// Base delay between retries when the caller does not override it
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Methods the client issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl HttpMethod {
    /// Whether a successful call changes server state
    #[must_use]
    pub const fn is_mutating(self) -> bool {
        !matches!(self, Self::Get)
    }

    /// Upper-case method name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "get" => Ok(Self::Get),
            "post" => Ok(Self::Post),
            "put" => Ok(Self::Put),
            "patch" => Ok(Self::Patch),
            "delete" => Ok(Self::Delete),
            _ => Err(ClientError::unsupported_method(s)),
        }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Self::GET,
            HttpMethod::Post => Self::POST,
            HttpMethod::Put => Self::PUT,
            HttpMethod::Patch => Self::PATCH,
            HttpMethod::Delete => Self::DELETE,
        }
    }
}

/// Options bag accepted by every request method
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Query parameters, in order
    pub params: Vec<(String, String)>,
    /// Serve GETs from the read-through cache
    pub cache: bool,
    /// Announce successful mutations to the notifier
    pub show_toast: bool,
    /// Clear the cache after a successful mutation
    pub clear_cache: bool,
    /// Extra attempts allowed by `request_with_retry`
    pub retries: u32,
    /// Base delay between attempts, multiplied by the attempt number
    pub retry_delay: Duration,
    /// Token that aborts the call when cancelled
    pub cancel: Option<RequestToken>,
    /// Deadline for a single attempt
    pub timeout: Option<Duration>,
    /// Polling or widget call not bound to the interactive session
    pub background: bool,
    /// Body sent with DELETE
    pub body: Option<Value>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            params: Vec::new(),
            cache: false,
            show_toast: true,
            clear_cache: true,
            retries: DEFAULT_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            cancel: None,
            timeout: None,
            background: false,
            body: None,
        }
    }
}

impl RequestOptions {
    /// Default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a query parameter
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    /// Opt into the GET cache
    #[must_use]
    pub const fn cached(mut self) -> Self {
        self.cache = true;
        self
    }

    /// Do not announce success
    #[must_use]
    pub const fn quiet(mut self) -> Self {
        self.show_toast = false;
        self
    }

    /// Keep the cache after a successful mutation
    #[must_use]
    pub const fn keep_cache(mut self) -> Self {
        self.clear_cache = false;
        self
    }

    /// Set the retry budget and base delay
    #[must_use]
    pub const fn retry(mut self, retries: u32, retry_delay: Duration) -> Self {
        self.retries = retries;
        self.retry_delay = retry_delay;
        self
    }

    /// Abort the call when `token` is cancelled
    ///
    /// A token from [`crate::ApiService::cancel_token`] also releases its name
    /// when the call finishes.
    #[must_use]
    pub fn cancel_with(mut self, token: impl Into<RequestToken>) -> Self {
        self.cancel = Some(token.into());
        self
    }

    /// Deadline for a single attempt
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Mark as a background call
    #[must_use]
    pub const fn background(mut self) -> Self {
        self.background = true;
        self
    }

    /// Body sent with a DELETE
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("get", HttpMethod::Get)]
    #[case("POST", HttpMethod::Post)]
    #[case(" Put ", HttpMethod::Put)]
    #[case("patch", HttpMethod::Patch)]
    #[case("Delete", HttpMethod::Delete)]
    fn test_method_parsing(#[case] input: &str, #[case] expected: HttpMethod) {
        assert_eq!(input.parse::<HttpMethod>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_method_is_programmer_error() {
        let err = "head".parse::<HttpMethod>().unwrap_err();
        assert!(matches!(err, ClientError::UnsupportedMethod { ref method } if method == "head"));
    }

    #[test]
    fn test_only_get_is_read_only() {
        assert!(!HttpMethod::Get.is_mutating());
        assert!(HttpMethod::Post.is_mutating());
        assert!(HttpMethod::Delete.is_mutating());
        assert_eq!(reqwest::Method::from(HttpMethod::Patch), reqwest::Method::PATCH);
    }

    #[test]
    fn test_default_options() {
        let options = RequestOptions::default();
        assert!(!options.cache);
        assert!(options.show_toast);
        assert!(options.clear_cache);
        assert_eq!(options.retries, DEFAULT_RETRIES);
        assert_eq!(options.retry_delay, DEFAULT_RETRY_DELAY);
        assert!(!options.background);
    }

    #[test]
    fn test_builder_helpers() {
        let options = RequestOptions::new()
            .param("skip", 0)
            .param("limit", 10)
            .cached()
            .quiet()
            .retry(2, Duration::from_millis(5));

        assert_eq!(
            options.params,
            vec![
                ("skip".to_string(), "0".to_string()),
                ("limit".to_string(), "10".to_string())
            ]
        );
        assert!(options.cache);
        assert!(!options.show_toast);
        assert_eq!(options.retries, 2);
    }
}
