use thiserror::Error;

/// Failures of the generative caption path. Never escapes the synthesizer:
/// every variant triggers the template fallback.
#[derive(Debug, Error)]
pub enum CaptionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("caption service timed out")]
    Timeout,

    #[error("caption service returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("caption service returned no text")]
    EmptyResponse,

    /// Generated text violates the caption's structural constraints.
    #[error("caption rejected: {0}")]
    Constraint(String),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}
