use thiserror::Error;

/// Report delivery failures. Logged by the caller, never escalated.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Network failure. The request URL is stripped because it embeds the
    /// bot token.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("channel rejected message (HTTP {status}): {description}")]
    Rejected { status: u16, description: String },

    #[error("delivery failed after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}
