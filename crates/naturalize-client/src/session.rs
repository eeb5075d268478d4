//! Session-expiry side effect

use std::fmt;
use tracing::warn;

/// Default login entry point
pub const DEFAULT_LOGIN_URL: &str = "/login";

/// Reacts when the server rejects the session with a 401
///
/// Credentials are already cleared by the time this runs.
pub trait SessionHandler: Send + Sync + fmt::Debug {
    /// Called once per 401 response of an interactive request
    fn on_session_expired(&self);
}

/// Sends the user back to the login entry point
#[derive(Debug, Clone)]
pub struct LoginRedirect {
    login_url: String,
}

impl LoginRedirect {
    /// Redirect to `login_url`
    #[must_use]
    pub fn new(login_url: impl Into<String>) -> Self {
        Self {
            login_url: login_url.into(),
        }
    }

    /// Where the user is sent
    #[must_use]
    pub fn login_url(&self) -> &str {
        &self.login_url
    }
}

impl Default for LoginRedirect {
    fn default() -> Self {
        Self::new(DEFAULT_LOGIN_URL)
    }
}

impl SessionHandler for LoginRedirect {
    fn on_session_expired(&self) {
        warn!(login_url = %self.login_url, "session expired, sign in again at {}", self.login_url);
    }
}

/// Ignores session expiry
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSessionHandler;

impl SessionHandler for NoopSessionHandler {
    fn on_session_expired(&self) {}
}
