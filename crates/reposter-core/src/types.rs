//! Domain data model shared by every stage of the repost cycle.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A candidate video and its public engagement metrics, as returned by one
/// discovery call. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateVideo {
    /// Platform identifier of the media item.
    pub id: String,
    /// Platform short code (used in public links).
    pub code: String,
    /// Source-side reference to the downloadable media.
    pub media_url: String,
    pub author: String,
    pub caption_text: Option<String>,
    pub like_count: u64,
    pub view_count: u64,
}

impl CandidateVideo {
    /// Likes divided by views; `0.0` when the view count is zero.
    #[must_use]
    pub fn engagement_rate(&self) -> f64 {
        if self.view_count == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let rate = self.like_count as f64 / self.view_count as f64;
        rate
    }

    /// A short human-readable title: the first 50 characters of the source
    /// caption, or `Video by @author` when the caption is empty.
    #[must_use]
    pub fn title(&self) -> String {
        match self.caption_text.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => {
                let mut title: String = text.chars().take(50).collect();
                if text.chars().count() > 50 {
                    title.push_str("...");
                }
                title
            }
            _ => format!("Video by @{}", self.author),
        }
    }
}

/// Ordered candidates from a single discovery call. Not persisted.
pub type VideoBatch = Vec<CandidateVideo>;

/// A media file downloaded into the managed directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalAsset {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub candidate_id: String,
}

impl LocalAsset {
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn size_mb(&self) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let mb = self.size_bytes as f64 / (1024.0 * 1024.0);
        (mb * 100.0).round() / 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptionMethod {
    Ai,
    Template,
}

impl std::fmt::Display for CaptionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptionMethod::Ai => write!(f, "ai"),
            CaptionMethod::Template => write!(f, "template"),
        }
    }
}

/// Caption text and how it was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Caption {
    pub text: String,
    pub method: CaptionMethod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PublishOutcome {
    Published { media_id: String },
    Failed { error: String },
}

/// Result of the publish phase with its wall-clock duration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishResult {
    pub outcome: PublishOutcome,
    #[serde(with = "duration_secs")]
    pub duration: Duration,
}

impl PublishResult {
    #[must_use]
    pub fn published(media_id: impl Into<String>, duration: Duration) -> Self {
        Self {
            outcome: PublishOutcome::Published {
                media_id: media_id.into(),
            },
            duration,
        }
    }

    #[must_use]
    pub fn failed(error: impl Into<String>, duration: Duration) -> Self {
        Self {
            outcome: PublishOutcome::Failed {
                error: error.into(),
            },
            duration,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, PublishOutcome::Published { .. })
    }

    #[must_use]
    pub fn media_id(&self) -> Option<&str> {
        match &self.outcome {
            PublishOutcome::Published { media_id } => Some(media_id),
            PublishOutcome::Failed { .. } => None,
        }
    }
}

/// Remaining execution budget as seen at the start of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CreditStatus {
    Available { remaining: f64 },
    Exhausted { used: f64, limit: f64 },
}

impl CreditStatus {
    /// Classify `used` against `limit`.
    #[must_use]
    pub fn from_usage(used: f64, limit: f64) -> Self {
        if used >= limit {
            CreditStatus::Exhausted { used, limit }
        } else {
            CreditStatus::Available {
                remaining: limit - used,
            }
        }
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        matches!(self, CreditStatus::Exhausted { .. })
    }
}

pub(crate) mod duration_secs {
    use std::time::Duration;

    use serde::Serializer;

    pub(crate) fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(value.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(likes: u64, views: u64) -> CandidateVideo {
        CandidateVideo {
            id: "1".to_string(),
            code: "abc".to_string(),
            media_url: "https://cdn.example.com/1.mp4".to_string(),
            author: "creator".to_string(),
            caption_text: None,
            like_count: likes,
            view_count: views,
        }
    }

    #[test]
    fn engagement_rate_is_likes_over_views() {
        let c = candidate(5_000, 100_000);
        assert!((c.engagement_rate() - 0.05).abs() < 1e-12);
    }

    #[test]
    fn engagement_rate_zero_views_is_zero() {
        assert_eq!(candidate(5_000, 0).engagement_rate(), 0.0);
    }

    #[test]
    fn title_falls_back_to_author() {
        assert_eq!(candidate(1, 1).title(), "Video by @creator");
    }

    #[test]
    fn title_truncates_long_captions() {
        let mut c = candidate(1, 1);
        c.caption_text = Some("x".repeat(80));
        let title = c.title();
        assert_eq!(title.chars().count(), 53);
        assert!(title.ends_with("..."));
    }

    #[test]
    fn credit_status_from_usage() {
        assert!(CreditStatus::from_usage(3.0, 3.0).is_exhausted());
        assert!(!CreditStatus::from_usage(1.0, 3.0).is_exhausted());
        assert_eq!(
            CreditStatus::from_usage(1.0, 3.0),
            CreditStatus::Available { remaining: 2.0 }
        );
    }

    #[test]
    fn publish_result_serializes_duration_as_seconds() {
        let result = PublishResult::published("1789", Duration::from_millis(1500));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["outcome"]["status"], "published");
        assert_eq!(json["outcome"]["media_id"], "1789");
        assert_eq!(json["duration"], 1.5);
    }

    #[test]
    fn local_asset_size_mb_rounds_to_two_places() {
        let asset = LocalAsset {
            path: PathBuf::from("/tmp/rp_1_2.mp4"),
            size_bytes: 3 * 1024 * 1024 + 512 * 1024,
            candidate_id: "1".to_string(),
        };
        assert!((asset.size_mb() - 3.5).abs() < f64::EPSILON);
        assert_eq!(asset.file_name(), "rp_1_2.mp4");
    }
}
