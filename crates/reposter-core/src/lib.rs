pub mod app_config;
pub mod config;
pub mod report;
pub mod shutdown;
pub mod types;
pub mod virality;

use thiserror::Error;

pub use app_config::{
    AppConfig, CaptionSettings, Credentials, CreditSettings, DiscoverySettings, Environment,
    MediaSettings, PublishSettings, ReportSettings, SelectionSettings,
};
pub use config::{load_app_config, load_app_config_from_env};
pub use report::{CycleOutcome, CycleReport, FailureKind, Stage};
pub use shutdown::ShutdownRx;
pub use types::{
    CandidateVideo, Caption, CaptionMethod, CreditStatus, LocalAsset, PublishOutcome,
    PublishResult, VideoBatch,
};
pub use virality::{RankingKey, SelectedCandidate, Selection, Thresholds, ViralityFilter};

/// Startup configuration failures. Always fatal: detected before the
/// scheduler loop begins.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
