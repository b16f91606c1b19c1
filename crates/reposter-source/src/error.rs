use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors returned by the discovery client.
///
/// The orchestrator treats every variant as "no candidates this cycle".
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Network or TLS failure, or a non-2xx status from the platform.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP 429, with the server's `Retry-After` hint when it sent one.
    #[error("rate limited (HTTP 429, retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    /// Login was rejected.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The stored session was refused (401/403) and must be renewed.
    #[error("session expired (HTTP {status})")]
    SessionExpired { status: u16 },

    #[error("session store error at {}: {source}", path.display())]
    SessionStore {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}
