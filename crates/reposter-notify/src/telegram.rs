//! Telegram bot delivery with bounded attempts.

use std::time::Duration;

use async_trait::async_trait;
use reposter_core::{CycleReport, ReportSettings};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::ReportError;
use crate::format::{format_notice, format_report};
use crate::notice::Notice;
use crate::Reporter;

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Deserialize)]
struct ApiReply {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramReporter {
    client: Client,
    endpoint: String,
    chat_id: String,
    max_attempts: u32,
    retry_delay: Duration,
}

impl TelegramReporter {
    /// # Errors
    ///
    /// Returns [`ReportError::Http`] if the HTTP client cannot be built.
    pub fn new(
        settings: &ReportSettings,
        bot_token: &str,
        chat_id: &str,
    ) -> Result<Self, ReportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("reposter/0.1 (notify)")
            .build()?;
        Ok(Self {
            client,
            endpoint: format!(
                "{}/bot{bot_token}/sendMessage",
                settings.telegram_base_url.trim_end_matches('/')
            ),
            chat_id: chat_id.to_owned(),
            max_attempts: settings.max_attempts.max(1),
            retry_delay: Duration::from_secs(1),
        })
    }

    /// Base delay between attempts; attempt `n` waits `n * delay`.
    #[must_use]
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Send one HTML message, retrying transient failures up to the
    /// configured attempt count.
    ///
    /// # Errors
    ///
    /// [`ReportError::Rejected`] when the API refuses the message outright,
    /// [`ReportError::Exhausted`] when every attempt failed transiently.
    pub async fn send_text(&self, text: &str) -> Result<(), ReportError> {
        let mut last_error = String::new();
        for attempt in 1..=self.max_attempts {
            match self.send_once(text).await {
                Ok(()) => return Ok(()),
                Err(Attempt::Fatal(e)) => return Err(e),
                Err(Attempt::Transient(reason)) => {
                    tracing::warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        reason = %reason,
                        "notify: delivery attempt failed"
                    );
                    last_error = reason;
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.retry_delay * attempt).await;
                    }
                }
            }
        }
        Err(ReportError::Exhausted {
            attempts: self.max_attempts,
            last_error,
        })
    }

    async fn send_once(&self, text: &str) -> Result<(), Attempt> {
        let body = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| Attempt::Transient(e.without_url().to_string()))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| Attempt::Transient(e.without_url().to_string()))?;
        let reply = serde_json::from_str::<ApiReply>(&raw).ok();
        let description = reply
            .as_ref()
            .and_then(|r| r.description.clone())
            .unwrap_or_else(|| raw.chars().take(200).collect());

        if status.is_success() && reply.as_ref().is_some_and(|r| r.ok) {
            return Ok(());
        }
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Attempt::Transient(format!("HTTP {status}: {description}")));
        }
        Err(Attempt::Fatal(ReportError::Rejected {
            status: status.as_u16(),
            description,
        }))
    }
}

enum Attempt {
    Transient(String),
    Fatal(ReportError),
}

#[async_trait]
impl Reporter for TelegramReporter {
    async fn report(&self, report: &CycleReport) -> Result<(), ReportError> {
        self.send_text(&format_report(report)).await?;
        tracing::info!(outcome = report.outcome.label(), "notify: cycle report sent");
        Ok(())
    }

    async fn notify(&self, notice: &Notice) -> Result<(), ReportError> {
        self.send_text(&format_notice(notice)).await?;
        tracing::debug!(kind = ?notice.kind, "notify: notice sent");
        Ok(())
    }
}
