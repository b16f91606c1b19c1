use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::app_config::{
    AppConfig, CaptionSettings, Credentials, CreditSettings, DiscoverySettings, Environment,
    MediaSettings, PublishSettings, ReportSettings, SelectionSettings,
};
use crate::virality::{RankingKey, Thresholds};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|v| !v.trim().is_empty())
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let graph_access_token = require("INSTAGRAM_ACCESS_TOKEN")?;
    let graph_user_id = require("INSTAGRAM_USER_ID")?;
    let scraper_username = require("INSTAGRAM_SCRAPER_USERNAME")?;
    let scraper_password = require("INSTAGRAM_SCRAPER_PASSWORD")?;
    let telegram_bot_token = require("TELEGRAM_BOT_TOKEN")?;
    let telegram_chat_id = require("TELEGRAM_CHAT_ID")?;

    let hosting_public_base_url = optional("HOSTING_PUBLIC_BASE_URL");
    let hosting_upload_url = optional("HOSTING_UPLOAD_URL");
    if hosting_public_base_url.is_none() && hosting_upload_url.is_none() {
        return Err(ConfigError::MissingEnvVar(
            "HOSTING_PUBLIC_BASE_URL".to_string(),
        ));
    }

    let env = parse_environment(&or_default("REPOSTER_ENV", "development"))?;
    let bind_addr: SocketAddr = parse_var(&lookup, "REPOSTER_BIND_ADDR", "0.0.0.0:5000")?;
    let log_level = or_default("REPOSTER_LOG_LEVEL", "info");
    let interval_hours: u64 = parse_var(&lookup, "POSTING_INTERVAL_HOURS", "3")?;
    if interval_hours == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "POSTING_INTERVAL_HOURS".to_string(),
            reason: "interval must be at least one hour".to_string(),
        });
    }
    let cycle_timeout_secs: u64 = parse_var(&lookup, "CYCLE_TIMEOUT_SECS", "1800")?;

    let discovery = DiscoverySettings {
        base_url: or_default("DISCOVERY_BASE_URL", "https://i.instagram.com/api/v1"),
        batch_size: parse_var(&lookup, "EXPLORE_FETCH_COUNT", "50")?,
        request_timeout_secs: parse_var(&lookup, "DISCOVERY_TIMEOUT_SECS", "30")?,
        max_retries: parse_var(&lookup, "DISCOVERY_MAX_RETRIES", "2")?,
        retry_backoff_base_ms: parse_var(&lookup, "DISCOVERY_RETRY_BACKOFF_BASE_MS", "1000")?,
        session_file: PathBuf::from(or_default("INSTAGRAM_SESSION_FILE", "instagram_session.json")),
    };

    let min_engagement_rate: f64 = parse_var(&lookup, "MIN_ENGAGEMENT_RATE", "0.05")?;
    if !(0.0..=1.0).contains(&min_engagement_rate) {
        return Err(ConfigError::InvalidEnvVar {
            var: "MIN_ENGAGEMENT_RATE".to_string(),
            reason: format!("{min_engagement_rate} is outside [0, 1]"),
        });
    }
    let top_k: usize = parse_var(&lookup, "VIRAL_TOP_K", "5")?;
    if top_k == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "VIRAL_TOP_K".to_string(),
            reason: "top-k must be at least 1".to_string(),
        });
    }
    let selection = SelectionSettings {
        thresholds: Thresholds {
            min_likes: parse_var(&lookup, "MIN_LIKES", "10000")?,
            min_views: parse_var(&lookup, "MIN_VIEWS", "50000")?,
            min_engagement_rate,
        },
        top_k,
        ranking_key: parse_var::<RankingKey, _>(&lookup, "RANKING_KEY", "likes_plus_views")?,
    };

    let caption = CaptionSettings {
        ai_enabled: parse_bool(&lookup, "USE_AI_CAPTIONS", true)?,
        openai_base_url: or_default("OPENAI_BASE_URL", "https://api.openai.com/v1"),
        openai_model: or_default("OPENAI_MODEL", "gpt-4o-mini"),
        timeout_secs: parse_var(&lookup, "CAPTION_TIMEOUT_SECS", "30")?,
    };

    let media = MediaSettings {
        download_dir: PathBuf::from(or_default("VIDEO_DOWNLOAD_PATH", "downloaded_videos")),
        retention_count: parse_var(&lookup, "VIDEO_RETENTION_COUNT", "5")?,
        download_timeout_secs: parse_var(&lookup, "DOWNLOAD_TIMEOUT_SECS", "120")?,
        hosting_public_base_url,
        hosting_upload_url,
    };

    let publish = PublishSettings {
        graph_base_url: or_default("GRAPH_API_BASE_URL", "https://graph.facebook.com"),
        graph_api_version: or_default("GRAPH_API_VERSION", "v21.0"),
        request_timeout_secs: parse_var(&lookup, "PUBLISH_REQUEST_TIMEOUT_SECS", "30")?,
        poll_interval_secs: parse_var(&lookup, "PUBLISH_POLL_INTERVAL_SECS", "5")?,
        max_wait_secs: parse_var(&lookup, "PUBLISH_MAX_WAIT_SECS", "600")?,
    };

    let report = ReportSettings {
        telegram_base_url: or_default("TELEGRAM_API_BASE_URL", "https://api.telegram.org"),
        timeout_secs: parse_var(&lookup, "REPORT_TIMEOUT_SECS", "15")?,
        max_attempts: parse_var(&lookup, "REPORT_MAX_ATTEMPTS", "3")?,
    };

    let credit = CreditSettings {
        limit: parse_var(&lookup, "CREDIT_LIMIT", "3.0")?,
        check_interval_secs: parse_var(&lookup, "CREDIT_CHECK_INTERVAL", "3600")?,
        usage_url: optional("CREDIT_USAGE_URL"),
        trigger_at_startup: parse_bool(&lookup, "TRIGGER_ZIP_CREATION", false)?,
        archive_path: PathBuf::from(or_default("ARCHIVE_PATH", "reposter_bundle.zip")),
        public_base_url: or_default("PUBLIC_BASE_URL", "http://localhost:5000"),
    };

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        interval_hours,
        cycle_timeout_secs,
        credentials: Credentials {
            graph_access_token,
            graph_user_id,
            scraper_username,
            scraper_password,
            telegram_bot_token,
            telegram_chat_id,
            openai_api_key: optional("OPENAI_API_KEY"),
            trigger_api_key: optional("TRIGGER_API_KEY"),
        },
        discovery,
        selection,
        caption,
        media,
        publish,
        report,
        credit,
    })
}

/// Parse `var` (or `default` when unset) with `FromStr`, mapping failures to
/// [`ConfigError::InvalidEnvVar`].
fn parse_var<T, F>(lookup: &F, var: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let raw = lookup(var).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
}

fn parse_bool<F>(lookup: &F, var: &str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let Ok(raw) = lookup(var) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("expected a boolean, got '{other}'"),
        }),
    }
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for unrecognised values.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "REPOSTER_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
