//! Named cancellation handles
//!
//! A view registers a name before it starts a request and cancels the name
//! when it goes away, so a late response is never applied. The service
//! releases the name once the request that carried the token finishes.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Cancellation token carried in [`crate::RequestOptions::cancel`]
///
/// Tokens handed out by [`CancellationRegistry::register`] remember the name
/// and registration they belong to; plain tokens convert with `From`.
#[derive(Debug, Clone, Default)]
pub struct RequestToken {
    token: CancellationToken,
    registration: Option<(String, u64)>,
}

impl RequestToken {
    /// The underlying token
    #[must_use]
    pub const fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Name the token is registered under, if any
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.registration.as_ref().map(|(name, _)| name.as_str())
    }

    /// Whether the token has been cancelled
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancel the token
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

impl From<CancellationToken> for RequestToken {
    fn from(token: CancellationToken) -> Self {
        Self {
            token,
            registration: None,
        }
    }
}

/// Registry of outstanding cancellation tokens, keyed by name
#[derive(Debug, Default)]
pub struct CancellationRegistry {
    tokens: Mutex<HashMap<String, (u64, CancellationToken)>>,
    next_id: AtomicU64,
}

impl CancellationRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh token under `name`
    ///
    /// A token already registered under the same name is cancelled first: the
    /// newer request supersedes it.
    pub fn register(&self, name: impl Into<String>) -> RequestToken {
        let name = name.into();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        if let Some((_, previous)) = self.tokens.lock().insert(name.clone(), (id, token.clone())) {
            info!(name, "superseding in-flight request");
            previous.cancel();
        }
        RequestToken {
            token,
            registration: Some((name, id)),
        }
    }

    /// Cancel and forget the token registered under `name`
    ///
    /// Returns `false` when nothing was registered under that name.
    pub fn cancel(&self, name: &str) -> bool {
        let removed = self.tokens.lock().remove(name);
        removed.is_some_and(|(_, token)| {
            info!(name, "request {name} cancelled by user");
            token.cancel();
            true
        })
    }

    /// Cancel and forget every token, returning how many there were
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<(String, (u64, CancellationToken))> = self.tokens.lock().drain().collect();
        for (name, (_, token)) in &drained {
            info!(name, "request {name} cancelled");
            token.cancel();
        }
        drained.len()
    }

    /// Forget `name` without cancelling it (the request finished)
    pub fn release(&self, name: &str) {
        self.tokens.lock().remove(name);
    }

    /// Forget the name `token` was registered under, if it still holds `token`
    ///
    /// A newer registration under the same name is left alone. Returns whether
    /// anything was removed.
    pub fn release_token(&self, token: &RequestToken) -> bool {
        let Some((name, id)) = &token.registration else {
            return false;
        };
        let mut tokens = self.tokens.lock();
        if tokens.get(name).is_some_and(|(current, _)| current == id) {
            tokens.remove(name);
            debug!(name, "request finished, name released");
            true
        } else {
            false
        }
    }

    /// Number of registered tokens
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.lock().len()
    }

    /// Whether nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.lock().is_empty()
    }
}

/// Releases a registered name when the call carrying its token ends
///
/// Dropping covers every exit path, including a caller dropping the future.
#[derive(Debug)]
pub(crate) struct ReleaseOnDrop<'a> {
    registry: &'a CancellationRegistry,
    token: Option<&'a RequestToken>,
}

impl<'a> ReleaseOnDrop<'a> {
    pub(crate) const fn new(registry: &'a CancellationRegistry, token: Option<&'a RequestToken>) -> Self {
        Self { registry, token }
    }
}

impl Drop for ReleaseOnDrop<'_> {
    fn drop(&mut self) {
        if let Some(token) = self.token {
            self.registry.release_token(token);
        }
    }
}
