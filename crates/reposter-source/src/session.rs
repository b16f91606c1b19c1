//! On-disk session token store.
//!
//! The discovery client persists its session token so a restart reuses the
//! existing login instead of authenticating again. The file is keyed by
//! username; a token saved for a different account is ignored.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::DiscoveryError;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
struct StoredSession {
    username: String,
    session_token: String,
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the token saved for `username`.
    ///
    /// A missing file, a corrupt file, or a token saved for another account
    /// all yield `None`; a corrupt file is logged and otherwise ignored.
    pub async fn load(&self, username: &str) -> Option<String> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "session store: read failed");
                return None;
            }
        };
        match serde_json::from_str::<StoredSession>(&raw) {
            Ok(stored) if stored.username == username => Some(stored.session_token),
            Ok(_) => {
                tracing::info!(path = %self.path.display(), "session store: token belongs to another account");
                None
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "session store: unreadable session file");
                None
            }
        }
    }

    /// Persist `token` for `username`, replacing any previous session.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::SessionStore`] if the file cannot be written.
    pub async fn save(&self, username: &str, token: &str) -> Result<(), DiscoveryError> {
        let body = serde_json::to_string_pretty(&StoredSession {
            username: username.to_owned(),
            session_token: token.to_owned(),
        })
        .map_err(|e| DiscoveryError::Deserialize {
            context: "session store".to_owned(),
            source: e,
        })?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| self.io_error(source))?;
        }
        tokio::fs::write(&self.path, body)
            .await
            .map_err(|source| self.io_error(source))
    }

    /// Remove the stored session. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::SessionStore`] on any other I/O failure.
    pub async fn clear(&self) -> Result<(), DiscoveryError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(self.io_error(source)),
        }
    }

    fn io_error(&self, source: std::io::Error) -> DiscoveryError {
        DiscoveryError::SessionStore {
            path: self.path.clone(),
            source,
        }
    }
}
