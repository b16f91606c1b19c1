use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::virality::{RankingKey, Thresholds};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Credentials for the three upstream services and the notification channel.
#[derive(Clone)]
pub struct Credentials {
    pub graph_access_token: String,
    pub graph_user_id: String,
    pub scraper_username: String,
    pub scraper_password: String,
    pub telegram_bot_token: String,
    pub telegram_chat_id: String,
    pub openai_api_key: Option<String>,
    pub trigger_api_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    pub base_url: String,
    pub batch_size: usize,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub session_file: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SelectionSettings {
    pub thresholds: Thresholds,
    pub top_k: usize,
    pub ranking_key: RankingKey,
}

#[derive(Debug, Clone)]
pub struct CaptionSettings {
    pub ai_enabled: bool,
    pub openai_base_url: String,
    pub openai_model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct MediaSettings {
    pub download_dir: PathBuf,
    pub retention_count: usize,
    pub download_timeout_secs: u64,
    pub hosting_public_base_url: Option<String>,
    pub hosting_upload_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PublishSettings {
    pub graph_base_url: String,
    pub graph_api_version: String,
    pub request_timeout_secs: u64,
    pub poll_interval_secs: u64,
    pub max_wait_secs: u64,
}

#[derive(Debug, Clone)]
pub struct ReportSettings {
    pub telegram_base_url: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
}

#[derive(Debug, Clone)]
pub struct CreditSettings {
    pub limit: f64,
    pub check_interval_secs: u64,
    pub usage_url: Option<String>,
    pub trigger_at_startup: bool,
    pub archive_path: PathBuf,
    pub public_base_url: String,
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub interval_hours: u64,
    pub cycle_timeout_secs: u64,
    pub credentials: Credentials,
    pub discovery: DiscoverySettings,
    pub selection: SelectionSettings,
    pub caption: CaptionSettings,
    pub media: MediaSettings,
    pub publish: PublishSettings,
    pub report: ReportSettings,
    pub credit: CreditSettings,
}

impl AppConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_hours.saturating_mul(3600))
    }

    #[must_use]
    pub fn cycle_timeout(&self) -> Duration {
        Duration::from_secs(self.cycle_timeout_secs)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("graph_access_token", &"[redacted]")
            .field("graph_user_id", &self.graph_user_id)
            .field("scraper_username", &self.scraper_username)
            .field("scraper_password", &"[redacted]")
            .field("telegram_bot_token", &"[redacted]")
            .field("telegram_chat_id", &self.telegram_chat_id)
            .field(
                "openai_api_key",
                &self.openai_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "trigger_api_key",
                &self.trigger_api_key.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("interval_hours", &self.interval_hours)
            .field("cycle_timeout_secs", &self.cycle_timeout_secs)
            .field("credentials", &self.credentials)
            .field("discovery", &self.discovery)
            .field("selection", &self.selection)
            .field("caption", &self.caption)
            .field("media", &self.media)
            .field("publish", &self.publish)
            .field("report", &self.report)
            .field("credit", &self.credit)
            .finish()
    }
}
