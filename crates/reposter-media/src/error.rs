use std::path::PathBuf;

use thiserror::Error;

/// Errors from acquiring a candidate's media or handing it to the hosting
/// collaborator.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The referenced media is private or has been removed.
    #[error("media unavailable (HTTP {status}) at {url}")]
    Unavailable { status: u16, url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// The source returned an empty body.
    #[error("empty media body from {url}")]
    EmptyBody { url: String },

    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("hosting failed: {0}")]
    Hosting(String),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl AcquisitionError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AcquisitionError::Io {
            path: path.into(),
            source,
        }
    }
}
