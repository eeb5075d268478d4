//! The API service: one calling convention over every backend endpoint
//!
//! Every call resolves to an [`ApiResponse`]. Transport failures, error
//! statuses and cancellation are folded into the envelope; side effects
//! (notices, cache maintenance, session expiry) happen here and nowhere else.

use crate::cache::ResponseCache;
use crate::cancel::{CancellationRegistry, ReleaseOnDrop, RequestToken};
use crate::credentials::{CredentialProvider, FileCredentials, StaticCredentials};
use crate::error::{ClientError, ClientResult};
use crate::notify::{Notice, Notifier, TracingNotifier};
use crate::options::{DEFAULT_RETRIES, DEFAULT_RETRY_DELAY, HttpMethod, RequestOptions};
use crate::policy::{self, NETWORK_ERROR_NOTICE};
use crate::session::{LoginRedirect, SessionHandler};
use bytes::Bytes;
use naturalize_core::{ApiResponse, Config};
use reqwest::header::ACCEPT;
use reqwest::multipart::Form;
use reqwest::{Client, Url};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Success notice of a DELETE whose response carries no message
pub const DELETE_SUCCESS_MESSAGE: &str = "Successfully deleted.";

/// Body sent with a request
#[derive(Debug)]
pub(crate) enum Payload {
    Empty,
    Json(Value),
    Multipart(Form),
}

impl From<Option<Value>> for Payload {
    fn from(body: Option<Value>) -> Self {
        body.map_or(Self::Empty, Self::Json)
    }
}

/// Raw outcome of one transport attempt
#[derive(Debug)]
pub(crate) enum Attempt {
    Response { status: u16, body: Bytes },
    Network(String),
    Cancelled,
}

impl Attempt {
    /// Whether another attempt could succeed
    pub(crate) const fn is_transient(&self) -> bool {
        match self {
            Self::Response { status, .. } => policy::is_transient(*status),
            Self::Network(_) => true,
            Self::Cancelled => false,
        }
    }
}

#[derive(Debug)]
struct Inner {
    client: Client,
    base_url: Url,
    credentials: Arc<dyn CredentialProvider>,
    notifier: Arc<dyn Notifier>,
    session: Arc<dyn SessionHandler>,
    cache: ResponseCache,
    cancellations: CancellationRegistry,
    default_timeout: Option<Duration>,
    retries: u32,
    retry_delay: Duration,
}

/// Instance-scoped API client
///
/// Cloning is cheap and clones share the cache, the cancellation registry
/// and the collaborators.
#[derive(Debug, Clone)]
pub struct ApiService {
    inner: Arc<Inner>,
}

impl ApiService {
    /// Start building a service for `base_url`
    #[must_use]
    pub fn builder(base_url: impl Into<String>) -> ApiServiceBuilder {
        ApiServiceBuilder::new(base_url)
    }

    /// Base URL every path is resolved against
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.inner.base_url.as_str()
    }

    /// Options carrying this service's configured retry policy
    #[must_use]
    pub fn options(&self) -> RequestOptions {
        RequestOptions::new().retry(self.inner.retries, self.inner.retry_delay)
    }

    /// Issue a GET
    pub async fn get(&self, path: &str, options: RequestOptions) -> ApiResponse {
        self.request(HttpMethod::Get, path, None, options).await
    }

    /// Issue a POST with an optional JSON body
    pub async fn post(&self, path: &str, body: Option<Value>, options: RequestOptions) -> ApiResponse {
        self.request(HttpMethod::Post, path, body, options).await
    }

    /// Issue a PUT with an optional JSON body
    pub async fn put(&self, path: &str, body: Option<Value>, options: RequestOptions) -> ApiResponse {
        self.request(HttpMethod::Put, path, body, options).await
    }

    /// Issue a PATCH with an optional JSON body
    pub async fn patch(&self, path: &str, body: Option<Value>, options: RequestOptions) -> ApiResponse {
        self.request(HttpMethod::Patch, path, body, options).await
    }

    /// Issue a DELETE; a body, if any, travels in [`RequestOptions::body`]
    pub async fn delete(&self, path: &str, options: RequestOptions) -> ApiResponse {
        self.request(HttpMethod::Delete, path, None, options).await
    }

    /// Issue a single attempt of `method`
    ///
    /// A cached GET is served from the cache while fresh. When `body` is
    /// `None`, [`RequestOptions::body`] is sent instead.
    pub async fn request(
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

        let payload = Payload::from(body.or_else(|| options.body.clone()));
        let attempt = self.execute(method, path, payload, &options).await;
        self.settle(method, attempt, &options, cache_key).await
    }

    /// Register a cancellation token under `name`
    ///
    /// Pass it with [`RequestOptions::cancel_with`]. A token already registered
    /// under the same name is cancelled. The name is released when the call
    /// carrying the token finishes.
    pub fn cancel_token(&self, name: impl Into<String>) -> RequestToken {
        self.inner.cancellations.register(name)
    }

    /// Cancel the request registered under `name`
    pub fn cancel_request(&self, name: &str) -> bool {
        self.inner.cancellations.cancel(name)
    }

    /// Cancel every registered request, returning how many were cancelled
    pub fn cancel_all_requests(&self) -> usize {
        self.inner.cancellations.cancel_all()
    }

    /// Forget a name whose request finished, without cancelling it
    pub fn release_token(&self, name: &str) {
        self.inner.cancellations.release(name);
    }

    pub(crate) fn release_on_finish<'a>(&'a self, options: &'a RequestOptions) -> ReleaseOnDrop<'a> {
        ReleaseOnDrop::new(&self.inner.cancellations, options.cancel.as_ref())
    }

    /// Sign out: forget the stored token and user record
    ///
    /// Cached envelopes belong to the session and are dropped too.
    pub async fn logout(&self) {
        self.inner.credentials.clear().await;
        let dropped = self.inner.cache.clear();
        info!(dropped, "signed out");
    }

    /// Drop every cached envelope
    pub fn clear_cache(&self) -> usize {
        let dropped = self.inner.cache.clear();
        info!(dropped, "cache cleared");
        dropped
    }

    /// Number of cached envelopes
    #[must_use]
    pub fn cached_entries(&self) -> usize {
        self.inner.cache.len()
    }

    /// Resolve `path` against the base URL with exactly one separating slash
    ///
    /// Absolute `http(s)` URLs are used as given.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.inner.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub(crate) fn cache_key(method: HttpMethod, path: &str, options: &RequestOptions) -> Option<String> {
        (method == HttpMethod::Get && options.cache)
            .then(|| ResponseCache::key(path, &options.params))
    }

    pub(crate) fn cached(&self, key: Option<&str>) -> Option<ApiResponse> {
        let key = key?;
        let hit = self.inner.cache.get(key);
        if hit.is_some() {
            debug!(key, "cache hit");
        }
        hit
    }

    pub(crate) fn notify(&self, notice: &Notice) {
        self.inner.notifier.notify(notice);
    }

    /// Send one attempt and collect the raw outcome
    pub(crate) async fn execute(
        &self,
        method: HttpMethod,
        path: &str,
        payload: Payload,
        options: &RequestOptions,
    ) -> Attempt {
        if options.cancel.as_ref().is_some_and(RequestToken::is_cancelled) {
            return Attempt::Cancelled;
        }

        let url = self.url(path);
        let mut request = self
            .inner
            .client
            .request(method.into(), &url)
            .header(ACCEPT, "application/json");

        if !options.params.is_empty() {
            request = request.query(&options.params);
        }
        if let Some(token) = self.inner.credentials.token().await {
            request = request.bearer_auth(token);
        }
        if let Some(timeout) = options.timeout.or(self.inner.default_timeout) {
            request = request.timeout(timeout);
        }
        request = match payload {
            Payload::Empty => request,
            Payload::Json(body) => request.json(&body),
            Payload::Multipart(form) => request.multipart(form),
        };

        debug!(%method, %url, "sending request");
        let exchange = async move {
            let response = request.send().await?;
            let status = response.status().as_u16();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        let outcome = match &options.cancel {
            Some(token) => tokio::select! {
                biased;
                () = token.token().cancelled() => {
                    debug!(%method, %url, "request cancelled");
                    return Attempt::Cancelled;
                }
                outcome = exchange => outcome,
            },
            None => exchange.await,
        };

        match outcome {
            Ok((status, body)) => {
                debug!(%method, %url, status, bytes = body.len(), "response received");
                Attempt::Response { status, body }
            }
            Err(e) => {
                warn!(%method, %url, error = %e, "no response");
                Attempt::Network(e.to_string())
            }
        }
    }

    /// Turn an attempt into the envelope the caller sees, applying side effects
    pub(crate) async fn settle(
        &self,
        method: HttpMethod,
        attempt: Attempt,
        options: &RequestOptions,
        cache_key: Option<String>,
    ) -> ApiResponse {
        match attempt {
            Attempt::Cancelled => policy::cancelled(),
            Attempt::Network(_) => {
                self.notify(&Notice::error(NETWORK_ERROR_NOTICE));
                policy::network_failure()
            }
            Attempt::Response { status, body } if (200..300).contains(&status) => {
                let envelope = policy::normalize_success(status, &body);
                if envelope.success {
                    if let Some(key) = cache_key {
                        self.inner.cache.insert(key, envelope.clone());
                    }
                    self.after_mutation(method, options, &envelope.message);
                }
                envelope
            }
            Attempt::Response { status, body } => self.failed(status, &body, options).await,
        }
    }

    /// Cache invalidation and success notice of a successful call
    pub(crate) fn after_mutation(&self, method: HttpMethod, options: &RequestOptions, message: &str) {
        if !method.is_mutating() {
            return;
        }
        if options.clear_cache {
            let dropped = self.inner.cache.clear();
            if dropped > 0 {
                info!(%method, dropped, "cache invalidated");
            }
        }
        if options.show_toast {
            let shown = match (method, message.trim().is_empty()) {
                (HttpMethod::Delete, true) => Some(DELETE_SUCCESS_MESSAGE),
                (_, true) => None,
                (_, false) => Some(message),
            };
            if let Some(shown) = shown {
                self.notify(&Notice::success(shown));
            }
        }
    }

    async fn failed(&self, status: u16, body: &[u8], options: &RequestOptions) -> ApiResponse {
        let (envelope, notices) = policy::normalize_failure(status, body);
        warn!(status, message = %envelope.message, "request failed");
        for notice in &notices {
            self.notify(notice);
        }
        if status == 401 {
            self.expire_session(options.background).await;
        }
        envelope
    }

    async fn expire_session(&self, background: bool) {
        self.inner.credentials.clear().await;
        if background {
            info!("credentials cleared after 401 on background request");
        } else {
            self.inner.session.on_session_expired();
        }
    }
}

/// Builder for [`ApiService`]
#[derive(Debug)]
pub struct ApiServiceBuilder {
    base_url: String,
    credentials: Option<Arc<dyn CredentialProvider>>,
    notifier: Option<Arc<dyn Notifier>>,
    session: Option<Arc<dyn SessionHandler>>,
    client: Option<Client>,
    cache_ttl: Duration,
    timeout: Option<Duration>,
    retries: u32,
    retry_delay: Duration,
}

impl ApiServiceBuilder {
    /// Builder for `base_url` with default collaborators
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            credentials: None,
            notifier: None,
            session: None,
            client: None,
            cache_ttl: crate::cache::DEFAULT_CACHE_TTL,
            timeout: None,
            retries: DEFAULT_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Builder seeded from loaded configuration
    ///
    /// Credentials come from the configured token file, else the platform
    /// config directory; the session handler redirects to `auth.login_url`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let mut builder = Self::new(config.api.base_url.clone())
            .cache_ttl(config.api.cache_ttl())
            .retry_policy(config.api.retries, config.api.retry_delay())
            .session_handler(LoginRedirect::new(config.auth.login_url.clone()));

        if let Some(timeout) = config.api.timeout() {
            builder = builder.timeout(timeout);
        }

        if let Some(files) = FileCredentials::from_config(&config.auth) {
            builder = builder.credentials(files);
        }
        builder
    }

    /// Credential provider
    #[must_use]
    pub fn credentials(self, provider: impl CredentialProvider + 'static) -> Self {
        self.shared_credentials(Arc::new(provider))
    }

    /// Credential provider shared with the caller
    #[must_use]
    pub fn shared_credentials(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(provider);
        self
    }

    /// Bearer token held in memory
    #[must_use]
    pub fn token(self, token: impl Into<String>) -> Self {
        self.credentials(StaticCredentials::new(token))
    }

    /// Notice sink
    #[must_use]
    pub fn notifier(self, notifier: impl Notifier + 'static) -> Self {
        self.shared_notifier(Arc::new(notifier))
    }

    /// Notice sink shared with the caller
    #[must_use]
    pub fn shared_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Session-expiry handler
    #[must_use]
    pub fn session_handler(self, handler: impl SessionHandler + 'static) -> Self {
        self.shared_session_handler(Arc::new(handler))
    }

    /// Session-expiry handler shared with the caller
    #[must_use]
    pub fn shared_session_handler(mut self, handler: Arc<dyn SessionHandler>) -> Self {
        self.session = Some(handler);
        self
    }

    /// Use a preconfigured HTTP client
    #[must_use]
    pub fn http_client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Freshness window of cached GETs
    #[must_use]
    pub const fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Deadline applied to attempts that do not set their own
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Retry policy returned by [`ApiService::options`]
    #[must_use]
    pub const fn retry_policy(mut self, retries: u32, retry_delay: Duration) -> Self {
        self.retries = retries;
        self.retry_delay = retry_delay;
        self
    }

    /// Build the service
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] when the base URL is not an absolute
    /// `http(s)` URL and [`ClientError::Http`] when the HTTP client cannot be
    /// created.
    pub fn build(self) -> ClientResult<ApiService> {
        let base_url = Url::parse(self.base_url.trim())
            .map_err(|e| ClientError::invalid_url(&self.base_url, e.to_string()))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ClientError::invalid_url(
                &self.base_url,
                "scheme must be http or https",
            ));
        }

        let client = match self.client {
            Some(client) => client,
            None => Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .pool_idle_timeout(Duration::from_secs(90))
                .build()?,
        };

        Ok(ApiService {
            inner: Arc::new(Inner {
                client,
                base_url,
                credentials: self
                    .credentials
                    .unwrap_or_else(|| Arc::new(StaticCredentials::anonymous())),
                notifier: self.notifier.unwrap_or_else(|| Arc::new(TracingNotifier)),
                session: self
                    .session
                    .unwrap_or_else(|| Arc::new(LoginRedirect::default())),
                cache: ResponseCache::new(self.cache_ttl),
                cancellations: CancellationRegistry::new(),
                default_timeout: self.timeout,
                retries: self.retries,
                retry_delay: self.retry_delay,
            }),
        })
    }
}
