//! HTTP client for the content platform's discovery API.
//!
//! Authenticates once per process (or reuses the stored session), fetches the
//! explore feed, and keeps only video items. A 401/403 on the feed triggers
//! one re-login and one retry of the request.

use std::time::Duration;

use async_trait::async_trait;
use reposter_core::{DiscoverySettings, VideoBatch};
use reqwest::{Client, StatusCode};
use tokio::sync::Mutex;

use crate::error::DiscoveryError;
use crate::retry::{check_rate_limit, RetryPolicy};
use crate::session::SessionStore;
use crate::types::{ExploreResponse, LoginRequest, LoginResponse};
use crate::CandidateSource;

pub struct DiscoveryClient {
    client: Client,
    base_url: String,
    username: String,
    password: String,
    store: SessionStore,
    session: Mutex<Option<String>>,
    retry: RetryPolicy,
}

impl DiscoveryClient {
    /// Build a client from discovery settings and scraper credentials.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        settings: &DiscoverySettings,
        username: &str,
        password: &str,
    ) -> Result<Self, DiscoveryError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("reposter/0.1 (discovery)")
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_owned(),
            username: username.to_owned(),
            password: password.to_owned(),
            store: SessionStore::new(&settings.session_file),
            session: Mutex::new(None),
            retry: RetryPolicy::new(settings.max_retries, settings.retry_backoff_base_ms),
        })
    }

    /// Fetch up to `count` explore items and return the video candidates.
    ///
    /// # Errors
    ///
    /// - [`DiscoveryError::Auth`] if login is rejected.
    /// - [`DiscoveryError::Http`] on network failure after retries.
    /// - [`DiscoveryError::Deserialize`] if the feed shape is unexpected.
    pub async fn explore_videos(&self, count: usize) -> Result<VideoBatch, DiscoveryError> {
        let token = self.ensure_session().await?;
        let response = match self.explore_with_retry(&token, count).await {
            Err(DiscoveryError::SessionExpired { status }) => {
                tracing::warn!(status, "discovery: session rejected, logging in again");
                self.invalidate_session().await;
                let token = self.login().await?;
                self.explore_with_retry(&token, count).await?
            }
            other => other?,
        };

        let total = response.items.len();
        let batch: VideoBatch = response
            .items
            .into_iter()
            .filter_map(crate::types::ExploreItem::into_candidate)
            .collect();
        tracing::info!(fetched = total, videos = batch.len(), "discovery: explore batch");
        Ok(batch)
    }

    async fn ensure_session(&self) -> Result<String, DiscoveryError> {
        {
            let guard = self.session.lock().await;
            if let Some(token) = guard.as_ref() {
                return Ok(token.clone());
            }
        }
        if let Some(token) = self.store.load(&self.username).await {
            tracing::info!("discovery: reusing stored session");
            *self.session.lock().await = Some(token.clone());
            return Ok(token);
        }
        self.login().await
    }

    async fn invalidate_session(&self) {
        *self.session.lock().await = None;
        if let Err(e) = self.store.clear().await {
            tracing::warn!(error = %e, "discovery: failed to clear stored session");
        }
    }

    async fn login(&self) -> Result<String, DiscoveryError> {
        let url = format!("{}/accounts/login/", self.base_url);
        let body = LoginRequest {
            username: &self.username,
            password: &self.password,
        };
        let (url, body) = (url.as_str(), &body);
        let response = self
            .retry
            .run(move || async move {
                let response = check_rate_limit(self.client.post(url).json(body).send().await?)?;
                Ok::<_, DiscoveryError>(response.error_for_status()?)
            })
            .await;

        let response = match response {
            Ok(r) => r,
            Err(DiscoveryError::Http(e))
                if e.status().is_some_and(|s| s.is_client_error()) =>
            {
                return Err(DiscoveryError::Auth(format!(
                    "login rejected for {}: {e}",
                    self.username
                )));
            }
            Err(e) => return Err(e),
        };

        let text = response.text().await?;
        let login: LoginResponse =
            serde_json::from_str(&text).map_err(|e| DiscoveryError::Deserialize {
                context: "accounts/login".to_owned(),
                source: e,
            })?;

        if let Err(e) = self.store.save(&self.username, &login.session_token).await {
            tracing::warn!(error = %e, "discovery: could not persist session");
        }
        *self.session.lock().await = Some(login.session_token.clone());
        tracing::info!(username = %self.username, "discovery: logged in");
        Ok(login.session_token)
    }

    async fn explore_with_retry(
        &self,
        token: &str,
        count: usize,
    ) -> Result<ExploreResponse, DiscoveryError> {
        self.retry
            .run(move || self.explore_once(token, count))
            .await
    }

    async fn explore_once(
        &self,
        token: &str,
        count: usize,
    ) -> Result<ExploreResponse, DiscoveryError> {
        let url = format!("{}/discover/explore/", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .query(&[("count", count)])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(DiscoveryError::SessionExpired {
                status: status.as_u16(),
            });
        }
        let body = check_rate_limit(response)?.error_for_status()?.text().await?;
        serde_json::from_str(&body).map_err(|e| DiscoveryError::Deserialize {
            context: format!("discover/explore(count={count})"),
            source: e,
        })
    }
}

#[async_trait]
impl CandidateSource for DiscoveryClient {
    async fn fetch(&self, batch_size: usize) -> Result<VideoBatch, DiscoveryError> {
        self.explore_videos(batch_size).await
    }
}
