use std::path::PathBuf;

use reposter_media::AcquisitionError;
use reposter_publish::PublishError;
use reposter_source::DiscoveryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk download directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("failed to write zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("archive task failed: {0}")]
    Task(String),
}

impl ArchiveError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum CreditError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to deserialize {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure to assemble the stage collaborators at startup.
#[derive(Debug, Error)]
pub enum WiringError {
    #[error("discovery client: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("media: {0}")]
    Media(#[from] AcquisitionError),

    #[error("publisher: {0}")]
    Publish(#[from] PublishError),

    #[error("credit source: {0}")]
    Credit(#[from] CreditError),
}
