//! Graph API client for the three publish calls.
//!
//! One `reqwest::Client` (one connection pool) serves container creation,
//! status checks, and the final publish call.

use std::time::Duration;

use reposter_core::PublishSettings;
use reqwest::Client;
use serde::Deserialize;

use crate::error::PublishError;
use crate::status::ContainerStatus;

#[derive(Debug, Deserialize)]
struct IdResponse {
    #[serde(default)]
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    status_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphErrorEnvelope {
    error: GraphErrorBody,
}

#[derive(Debug, Deserialize)]
struct GraphErrorBody {
    #[serde(default)]
    message: String,
}

pub struct GraphClient {
    client: Client,
    api_root: String,
    user_id: String,
    access_token: String,
}

impl GraphClient {
    /// # Errors
    ///
    /// Returns [`PublishError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        settings: &PublishSettings,
        user_id: &str,
        access_token: &str,
    ) -> Result<Self, PublishError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(4)
            .user_agent("reposter/0.1 (publish)")
            .build()?;
        Ok(Self {
            client,
            api_root: format!(
                "{}/{}",
                settings.graph_base_url.trim_end_matches('/'),
                settings.graph_api_version.trim_matches('/')
            ),
            user_id: user_id.to_owned(),
            access_token: access_token.to_owned(),
        })
    }

    /// Create a Reels container for `video_url` and return its id.
    ///
    /// # Errors
    ///
    /// [`PublishError::Api`] on a Graph error, [`PublishError::MissingId`] if
    /// the response has no id, [`PublishError::Http`] on network failure.
    pub async fn create_container(
        &self,
        video_url: &str,
        caption: &str,
    ) -> Result<String, PublishError> {
        let url = format!("{}/{}/media", self.api_root, self.user_id);
        let response = self
            .client
            .post(&url)
            .form(&[
                ("access_token", self.access_token.as_str()),
                ("video_url", video_url),
                ("media_type", "REELS"),
                ("caption", caption),
                ("share_to_feed", "true"),
            ])
            .send()
            .await?;
        let body = Self::checked_body(response).await?;
        Self::parse_id(&body, "create container")
    }

    /// Read the container's `status_code`.
    ///
    /// # Errors
    ///
    /// [`PublishError::Api`] on a Graph error, [`PublishError::Http`] on
    /// network failure, [`PublishError::Deserialize`] on a malformed body.
    pub async fn container_status(
        &self,
        container_id: &str,
    ) -> Result<ContainerStatus, PublishError> {
        let url = format!("{}/{container_id}", self.api_root);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("fields", "status_code"),
                ("access_token", self.access_token.as_str()),
            ])
            .send()
            .await?;
        let body = Self::checked_body(response).await?;
        let parsed: StatusResponse =
            serde_json::from_str(&body).map_err(|e| PublishError::Deserialize {
                context: format!("container status ({container_id})"),
                source: e,
            })?;
        Ok(parsed
            .status_code
            .as_deref()
            .map_or(ContainerStatus::Unknown(String::new()), ContainerStatus::parse))
    }

    /// Publish a finished container and return the media id.
    ///
    /// # Errors
    ///
    /// Same as [`GraphClient::create_container`].
    pub async fn publish_container(&self, container_id: &str) -> Result<String, PublishError> {
        let url = format!("{}/{}/media_publish", self.api_root, self.user_id);
        let response = self
            .client
            .post(&url)
            .form(&[
                ("access_token", self.access_token.as_str()),
                ("creation_id", container_id),
            ])
            .send()
            .await?;
        let body = Self::checked_body(response).await?;
        Self::parse_id(&body, "media_publish")
    }

    async fn checked_body(response: reqwest::Response) -> Result<String, PublishError> {
        let status = response.status();
        let body = response.text().await?;
        if status.is_success() {
            return Ok(body);
        }
        let message = serde_json::from_str::<GraphErrorEnvelope>(&body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| body.chars().take(200).collect());
        Err(PublishError::Api {
            status: status.as_u16(),
            message,
        })
    }

    fn parse_id(body: &str, context: &str) -> Result<String, PublishError> {
        let parsed: IdResponse =
            serde_json::from_str(body).map_err(|e| PublishError::Deserialize {
                context: context.to_owned(),
                source: e,
            })?;
        parsed
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| PublishError::MissingId {
                context: context.to_owned(),
            })
    }
}
