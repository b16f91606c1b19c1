//! Downloads a candidate's media into the managed directory.
//!
//! Bytes are streamed to a `.part` file and renamed into place only once the
//! body is complete, so a cancelled or failed download never leaves a file
//! the retention manifest would mistake for an asset. A `.part` file
//! abandoned by a dropped download is swept by the next retention pass.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use reposter_core::{CandidateVideo, LocalAsset, MediaSettings};
use reqwest::{Client, StatusCode};
use tokio::io::AsyncWriteExt;

use crate::error::AcquisitionError;
use crate::retention::{managed_file_name, RetentionManifest};

pub struct AssetAcquirer {
    client: Client,
    manifest: RetentionManifest,
}

impl AssetAcquirer {
    /// Build an acquirer for the configured directory, creating it if needed
    /// and seeding retention from files already there.
    ///
    /// # Errors
    ///
    /// Returns [`AcquisitionError::Io`] if the directory cannot be created or
    /// read, or [`AcquisitionError::Http`] if the HTTP client cannot be built.
    pub fn new(settings: &MediaSettings) -> Result<Self, AcquisitionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.download_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("reposter/0.1 (media)")
            .build()?;
        Self::with_client(client, &settings.download_dir, settings.retention_count)
    }

    /// Build an acquirer around an existing client.
    ///
    /// # Errors
    ///
    /// Returns [`AcquisitionError::Io`] if `dir` cannot be created or read.
    pub fn with_client(
        client: Client,
        dir: &Path,
        retention_count: usize,
    ) -> Result<Self, AcquisitionError> {
        std::fs::create_dir_all(dir).map_err(|e| AcquisitionError::io(dir, e))?;
        let manifest = RetentionManifest::from_directory(dir, retention_count)
            .map_err(|e| AcquisitionError::io(dir, e))?;
        tracing::info!(
            dir = %dir.display(),
            seeded = manifest.len(),
            retention = manifest.capacity(),
            "acquirer: ready"
        );
        Ok(Self { client, manifest })
    }

    #[must_use]
    pub fn manifest(&self) -> &RetentionManifest {
        &self.manifest
    }

    #[must_use]
    pub fn download_dir(&self) -> &Path {
        self.manifest.dir()
    }

    /// Download `candidate`'s media, record it, and enforce retention.
    ///
    /// # Errors
    ///
    /// - [`AcquisitionError::Unavailable`] when the source answers 403/404/410.
    /// - [`AcquisitionError::UnexpectedStatus`] for any other non-2xx status.
    /// - [`AcquisitionError::Http`] on network failure or timeout.
    /// - [`AcquisitionError::EmptyBody`] when no bytes were received.
    /// - [`AcquisitionError::Io`] when the file cannot be written.
    pub async fn acquire(
        &mut self,
        candidate: &CandidateVideo,
    ) -> Result<LocalAsset, AcquisitionError> {
        let url = candidate.media_url.as_str();
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if matches!(
            status,
            StatusCode::FORBIDDEN | StatusCode::NOT_FOUND | StatusCode::GONE
        ) {
            return Err(AcquisitionError::Unavailable {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }
        if !status.is_success() {
            return Err(AcquisitionError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        let final_path = self.next_path(&candidate.id);
        let part_path = final_path.with_extension("mp4.part");
        self.manifest.track_partial(part_path.clone());

        let size_bytes = match stream_to_file(response, &part_path).await {
            Ok(0) => {
                remove_quietly(&part_path).await;
                self.manifest.settle_partial(&part_path);
                return Err(AcquisitionError::EmptyBody {
                    url: url.to_owned(),
                });
            }
            Ok(n) => n,
            Err(e) => {
                remove_quietly(&part_path).await;
                self.manifest.settle_partial(&part_path);
                return Err(e);
            }
        };

        tokio::fs::rename(&part_path, &final_path)
            .await
            .map_err(|e| AcquisitionError::io(&final_path, e))?;
        self.manifest.settle_partial(&part_path);

        let asset = LocalAsset {
            path: final_path.clone(),
            size_bytes,
            candidate_id: candidate.id.clone(),
        };
        tracing::info!(
            candidate = %candidate.id,
            path = %final_path.display(),
            size_mb = asset.size_mb(),
            "acquirer: downloaded"
        );

        self.manifest.record_acquisition(final_path);
        for stale in self.manifest.enforce_retention() {
            match tokio::fs::remove_file(&stale).await {
                Ok(()) => tracing::info!(path = %stale.display(), "acquirer: removed stale file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %stale.display(), error = %e, "acquirer: failed to evict");
                }
            }
        }

        Ok(asset)
    }

    fn next_path(&self, candidate_id: &str) -> PathBuf {
        let now = Utc::now();
        let mut attempt = 0;
        loop {
            let path = self
                .manifest
                .dir()
                .join(managed_file_name(candidate_id, now, attempt));
            if !path.exists() {
                return path;
            }
            attempt += 1;
        }
    }
}

async fn stream_to_file(
    mut response: reqwest::Response,
    path: &Path,
) -> Result<u64, AcquisitionError> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| AcquisitionError::io(path, e))?;
    let mut written: u64 = 0;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk)
            .await
            .map_err(|e| AcquisitionError::io(path, e))?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(|e| AcquisitionError::io(path, e))?;
    Ok(written)
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(path = %path.display(), error = %e, "acquirer: could not remove partial file");
        }
    }
}
