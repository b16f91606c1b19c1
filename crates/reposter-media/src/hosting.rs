//! Hosting collaborator: turns a local asset into a public URL the publish
//! API can fetch.

use std::time::Duration;

use async_trait::async_trait;
use reposter_core::{LocalAsset, MediaSettings};
use reqwest::Client;
use serde::Deserialize;

use crate::error::AcquisitionError;

#[async_trait]
pub trait HostingService: Send + Sync {
    /// Make `asset` reachable and return its public URL.
    async fn host(&self, asset: &LocalAsset) -> Result<String, AcquisitionError>;
}

/// The download directory is already served at a public base URL; the
/// hosted URL is just `{base}/{file_name}`.
#[derive(Debug, Clone)]
pub struct StaticUrlHosting {
    base_url: String,
}

impl StaticUrlHosting {
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }
}

#[async_trait]
impl HostingService for StaticUrlHosting {
    async fn host(&self, asset: &LocalAsset) -> Result<String, AcquisitionError> {
        let name = asset.file_name();
        if name.is_empty() {
            return Err(AcquisitionError::Hosting(format!(
                "asset path has no file name: {}",
                asset.path.display()
            )));
        }
        Ok(format!("{}/{name}", self.base_url))
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
}

/// Uploads the asset bytes to an endpoint that answers `{"url": "..."}`.
pub struct UploadHosting {
    client: Client,
    upload_url: String,
}

impl UploadHosting {
    /// # Errors
    ///
    /// Returns [`AcquisitionError::Http`] if the HTTP client cannot be built.
    pub fn new(upload_url: &str, timeout_secs: u64) -> Result<Self, AcquisitionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("reposter/0.1 (hosting)")
            .build()?;
        Ok(Self {
            client,
            upload_url: upload_url.to_owned(),
        })
    }
}

#[async_trait]
impl HostingService for UploadHosting {
    async fn host(&self, asset: &LocalAsset) -> Result<String, AcquisitionError> {
        let bytes = tokio::fs::read(&asset.path)
            .await
            .map_err(|e| AcquisitionError::io(&asset.path, e))?;

        let response = self
            .client
            .post(&self.upload_url)
            .header(reqwest::header::CONTENT_TYPE, "video/mp4")
            .header("X-File-Name", asset.file_name())
            .body(bytes)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AcquisitionError::Hosting(format!(
                "upload to {} returned HTTP {}",
                self.upload_url,
                status.as_u16()
            )));
        }
        let body = response.text().await?;
        let parsed: UploadResponse =
            serde_json::from_str(&body).map_err(|e| AcquisitionError::Deserialize {
                context: "hosting upload".to_owned(),
                source: e,
            })?;
        if !parsed.url.starts_with("https://") {
            return Err(AcquisitionError::Hosting(format!(
                "hosting returned a non-HTTPS URL: {}",
                parsed.url
            )));
        }
        tracing::info!(url = %parsed.url, "hosting: uploaded asset");
        Ok(parsed.url)
    }
}

/// Pick the hosting collaborator from settings. An upload endpoint wins over
/// a static base URL when both are configured.
///
/// # Errors
///
/// Returns [`AcquisitionError::Hosting`] when neither target is configured,
/// or [`AcquisitionError::Http`] if the upload client cannot be built.
pub fn hosting_from_settings(
    settings: &MediaSettings,
) -> Result<Box<dyn HostingService>, AcquisitionError> {
    if let Some(upload_url) = settings.hosting_upload_url.as_deref() {
        return Ok(Box::new(UploadHosting::new(
            upload_url,
            settings.download_timeout_secs,
        )?));
    }
    if let Some(base_url) = settings.hosting_public_base_url.as_deref() {
        return Ok(Box::new(StaticUrlHosting::new(base_url)));
    }
    Err(AcquisitionError::Hosting(
        "no hosting target configured".to_owned(),
    ))
}
