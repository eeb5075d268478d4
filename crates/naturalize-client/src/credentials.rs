//! Credential storage
//!
//! The client only ever asks for the current bearer token and, on a 401,
//! asks the store to forget it. Where the token lives is up to the provider.

use crate::error::ClientResult;
use async_trait::async_trait;
use directories::ProjectDirs;
use naturalize_core::config::AuthConfig;
use parking_lot::RwLock;
use serde_json::Value;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File name of the persisted bearer token
pub const TOKEN_FILE_NAME: &str = "access_token";

/// File name of the persisted user record
pub const USER_FILE_NAME: &str = "user.json";

/// Source of the bearer token attached to outgoing requests
#[async_trait]
pub trait CredentialProvider: Send + Sync + fmt::Debug {
    /// Current token; `None` sends the request without `Authorization`
    async fn token(&self) -> Option<String>;

    /// Forget the token and any cached user record
    async fn clear(&self);
}

/// Token held in memory
#[derive(Debug, Default)]
pub struct StaticCredentials {
    token: RwLock<Option<String>>,
}

impl StaticCredentials {
    /// Store holding `token`
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }

    /// Store with no token
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Replace the token
    pub fn set(&self, token: impl Into<String>) {
        *self.token.write() = Some(token.into());
    }

    /// Whether a token is held
    #[must_use]
    pub fn has_token(&self) -> bool {
        self.token.read().is_some()
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    async fn clear(&self) {
        self.token.write().take();
    }
}

/// Token and user record persisted as files
///
/// Mirrors a browser session: the token file plays the auth cookie, the user
/// file the locally cached profile. Both go away together on logout or 401.
#[derive(Debug, Clone)]
pub struct FileCredentials {
    token_file: PathBuf,
    user_file: PathBuf,
}

impl FileCredentials {
    /// Store backed by explicit paths
    #[must_use]
    pub fn new(token_file: impl Into<PathBuf>, user_file: impl Into<PathBuf>) -> Self {
        Self {
            token_file: token_file.into(),
            user_file: user_file.into(),
        }
    }

    /// Store under the platform config directory
    ///
    /// Returns `None` when no home directory can be determined.
    #[must_use]
    pub fn default_location() -> Option<Self> {
        let dirs = ProjectDirs::from("com", "Naturalize", "naturalize-admin")?;
        let dir = dirs.config_dir();
        Some(Self::new(dir.join(TOKEN_FILE_NAME), dir.join(USER_FILE_NAME)))
    }

    /// Store named by the `auth` settings
    ///
    /// An unset `user_file` sits next to the token file; with no `token_file`
    /// the platform config directory is used.
    #[must_use]
    pub fn from_config(auth: &AuthConfig) -> Option<Self> {
        let Some(token_file) = &auth.token_file else {
            return Self::default_location();
        };
        let user_file = auth
            .user_file
            .clone()
            .unwrap_or_else(|| token_file.with_file_name(USER_FILE_NAME));
        Some(Self::new(token_file.clone(), user_file))
    }

    /// Path of the token file
    #[must_use]
    pub fn token_file(&self) -> &Path {
        &self.token_file
    }

    /// Path of the user record file
    #[must_use]
    pub fn user_file(&self) -> &Path {
        &self.user_file
    }

    /// Persist a token and, optionally, the signed-in user's record
    ///
    /// # Errors
    ///
    /// Returns an error if a parent directory or either file cannot be written.
    pub async fn store(&self, token: &str, user: Option<&Value>) -> ClientResult<()> {
        write_creating_parent(&self.token_file, token.trim().as_bytes()).await?;
        if let Some(user) = user {
            let record = serde_json::to_vec_pretty(user)?;
            write_creating_parent(&self.user_file, &record).await?;
        }
        debug!(path = %self.token_file.display(), "stored credentials");
        Ok(())
    }

    /// Cached user record, if one was stored and still parses
    pub async fn user(&self) -> Option<Value> {
        let raw = tokio::fs::read(&self.user_file).await.ok()?;
        serde_json::from_slice(&raw).ok()
    }
}

#[async_trait]
impl CredentialProvider for FileCredentials {
    async fn token(&self) -> Option<String> {
        match tokio::fs::read_to_string(&self.token_file).await {
            Ok(raw) => {
                let token = raw.trim();
                (!token.is_empty()).then(|| token.to_string())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %self.token_file.display(), error = %e, "cannot read token file");
                None
            }
        }
    }

    async fn clear(&self) {
        for path in [&self.token_file, &self.user_file] {
            match tokio::fs::remove_file(path).await {
                Ok(()) => debug!(path = %path.display(), "removed credential file"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "cannot remove credential file"),
            }
        }
    }
}

async fn write_creating_parent(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, contents).await
}
