//! Execution-budget signal checked before every cycle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reposter_core::{CreditSettings, CreditStatus};
use reqwest::Client;
use serde::Deserialize;

use crate::error::CreditError;

/// Reports how much of the execution budget has been consumed.
#[async_trait]
pub trait CreditSource: Send + Sync {
    async fn used(&self, limit: f64) -> Result<f64, CreditError>;
}

/// Operator-controlled flag. When set, the whole budget reads as used.
#[derive(Debug, Default)]
pub struct ManualCreditSource {
    exhausted: AtomicBool,
}

impl ManualCreditSource {
    #[must_use]
    pub fn new(exhausted: bool) -> Self {
        Self {
            exhausted: AtomicBool::new(exhausted),
        }
    }

    pub fn mark_exhausted(&self) {
        self.exhausted.store(true, Ordering::SeqCst);
    }

    pub fn restore(&self) {
        self.exhausted.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CreditSource for ManualCreditSource {
    async fn used(&self, limit: f64) -> Result<f64, CreditError> {
        Ok(if self.is_exhausted() { limit } else { 0.0 })
    }
}

#[derive(Debug, Deserialize)]
struct UsageResponse {
    used: f64,
}

/// Reads `{"used": <f64>}` from a usage endpoint.
pub struct HttpCreditSource {
    client: Client,
    url: String,
}

impl HttpCreditSource {
    /// # Errors
    ///
    /// Returns [`CreditError::Http`] if the HTTP client cannot be built.
    pub fn new(url: &str) -> Result<Self, CreditError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("reposter/0.1 (credit)")
            .build()?;
        Ok(Self {
            client,
            url: url.to_owned(),
        })
    }
}

#[async_trait]
impl CreditSource for HttpCreditSource {
    async fn used(&self, _limit: f64) -> Result<f64, CreditError> {
        let body = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        let parsed: UsageResponse =
            serde_json::from_str(&body).map_err(|e| CreditError::Deserialize {
                context: "credit usage".to_owned(),
                source: e,
            })?;
        Ok(parsed.used)
    }
}

/// Combines the manual flag with an optional remote source.
pub struct CreditMonitor {
    manual: Arc<ManualCreditSource>,
    remote: Option<Box<dyn CreditSource>>,
    limit: f64,
}

impl CreditMonitor {
    #[must_use]
    pub fn new(
        manual: Arc<ManualCreditSource>,
        remote: Option<Box<dyn CreditSource>>,
        limit: f64,
    ) -> Self {
        Self {
            manual,
            remote,
            limit,
        }
    }

    /// # Errors
    ///
    /// Returns [`CreditError::Http`] if the usage client cannot be built.
    pub fn from_settings(settings: &CreditSettings) -> Result<Self, CreditError> {
        let manual = Arc::new(ManualCreditSource::new(settings.trigger_at_startup));
        if settings.trigger_at_startup {
            tracing::warn!("credit: budget marked exhausted at startup");
        }
        let remote = match &settings.usage_url {
            Some(url) => Some(Box::new(HttpCreditSource::new(url)?) as Box<dyn CreditSource>),
            None => None,
        };
        Ok(Self::new(manual, remote, settings.limit))
    }

    /// Handle for the operator endpoints.
    #[must_use]
    pub fn manual(&self) -> Arc<ManualCreditSource> {
        Arc::clone(&self.manual)
    }

    #[must_use]
    pub fn limit(&self) -> f64 {
        self.limit
    }

    /// Current budget. An unreachable remote source counts as zero usage so
    /// a flaky collaborator never pauses publishing on its own.
    pub async fn check(&self) -> CreditStatus {
        let mut used = self.manual.used(self.limit).await.unwrap_or(0.0);
        if let Some(remote) = &self.remote {
            match remote.used(self.limit).await {
                Ok(remote_used) => used = used.max(remote_used),
                Err(e) => tracing::warn!(error = %e, "credit: usage check failed"),
            }
        }
        CreditStatus::from_usage(used, self.limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn manual_flag_exhausts_and_restores() {
        let monitor = CreditMonitor::new(Arc::new(ManualCreditSource::new(true)), None, 3.0);
        assert!(monitor.check().await.is_exhausted());

        monitor.manual().restore();
        assert_eq!(
            monitor.check().await,
            CreditStatus::Available { remaining: 3.0 }
        );
    }

    struct Fixed(f64);

    #[async_trait]
    impl CreditSource for Fixed {
        async fn used(&self, _limit: f64) -> Result<f64, CreditError> {
            Ok(self.0)
        }
    }

    #[tokio::test]
    async fn remote_usage_counts_against_limit() {
        let monitor = CreditMonitor::new(
            Arc::new(ManualCreditSource::default()),
            Some(Box::new(Fixed(1.25))),
            3.0,
        );
        assert_eq!(
            monitor.check().await,
            CreditStatus::Available { remaining: 1.75 }
        );

        let spent = CreditMonitor::new(
            Arc::new(ManualCreditSource::default()),
            Some(Box::new(Fixed(3.0))),
            3.0,
        );
        assert!(spent.check().await.is_exhausted());
    }
}
