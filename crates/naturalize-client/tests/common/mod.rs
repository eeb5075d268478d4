//! Common test utilities and fixtures for integration tests

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

pub mod fixtures;

use naturalize_client::{
    ApiService, ApiServiceBuilder, NoticeLevel, RecordingNotifier, SessionHandler,
    StaticCredentials,
};
use std::sync::Arc;
use std::sync::Once;
use std::sync::atomic::{AtomicUsize, Ordering};
use wiremock::MockServer;

static INIT_LOGGER: Once = Once::new();

/// Token the harness signs requests with
pub const TEST_TOKEN: &str = "test-token";

/// Path prefix the mock backend serves under
pub const API_PREFIX: &str = "/api/v1";

/// Initialize test logging (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("naturalize_client=debug")
            .with_test_writer()
            .try_init();
    });
}

/// Session handler counting how often it fired
#[derive(Debug, Default)]
pub struct RecordingSession {
    expired: AtomicUsize,
}

impl RecordingSession {
    pub fn count(&self) -> usize {
        self.expired.load(Ordering::SeqCst)
    }
}

impl SessionHandler for RecordingSession {
    fn on_session_expired(&self) {
        self.expired.fetch_add(1, Ordering::SeqCst);
    }
}

/// Mock backend plus a service wired to recording collaborators
pub struct TestHarness {
    pub server: MockServer,
    pub api: ApiService,
    pub notices: Arc<RecordingNotifier>,
    pub session: Arc<RecordingSession>,
    pub credentials: Arc<StaticCredentials>,
}

impl TestHarness {
    /// Harness with default service settings
    pub async fn start() -> Self {
        Self::start_with(|builder| builder).await
    }

    /// Harness whose builder is adjusted by `configure`
    pub async fn start_with(configure: impl FnOnce(ApiServiceBuilder) -> ApiServiceBuilder) -> Self {
        init_test_logging();
        let server = MockServer::start().await;
        let notices = Arc::new(RecordingNotifier::new());
        let session = Arc::new(RecordingSession::default());
        let credentials = Arc::new(StaticCredentials::new(TEST_TOKEN));

        let builder = ApiService::builder(format!("{}{API_PREFIX}", server.uri()))
            .shared_notifier(notices.clone())
            .shared_session_handler(session.clone())
            .shared_credentials(credentials.clone());
        let api = configure(builder).build().expect("service builds");

        Self {
            server,
            api,
            notices,
            session,
            credentials,
        }
    }

    /// Path as the mock server sees it
    pub fn path(suffix: &str) -> String {
        format!("{API_PREFIX}{suffix}")
    }

    /// Requests the mock server received
    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map_or(0, |requests| requests.len())
    }

    pub fn errors(&self) -> Vec<String> {
        self.notices.messages(NoticeLevel::Error)
    }

    pub fn successes(&self) -> Vec<String> {
        self.notices.messages(NoticeLevel::Success)
    }
}
