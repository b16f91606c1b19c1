use thiserror::Error;

use crate::status::ContainerStatus;

/// Errors from the two-phase publish protocol.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The Graph API answered with an error object or non-2xx status.
    #[error("Graph API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("response for {context} carried no id")]
    MissingId { context: String },

    #[error("container {container_id} failed processing (last status {last_status})")]
    ContainerFailed {
        container_id: String,
        last_status: ContainerStatus,
    },

    #[error("container {container_id} not ready after {waited_secs}s (last status {last_status})")]
    TimedOut {
        container_id: String,
        last_status: ContainerStatus,
        waited_secs: u64,
    },

    #[error("publish cancelled by shutdown")]
    Cancelled,

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}
