//! Discovery API response types.
//!
//! Models the JSON returned by the login and explore endpoints. Only the
//! fields the repost cycle consumes are captured; everything else is ignored.

use reposter_core::CandidateVideo;
use serde::{Deserialize, Deserializer, Serialize};

/// Media type codes that carry a playable video.
const VIDEO_MEDIA_TYPES: [u8; 2] = [2, 8];

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// `POST /accounts/login/` response.
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub session_token: String,
}

/// `GET /discover/explore/` response.
#[derive(Debug, Deserialize)]
pub struct ExploreResponse {
    #[serde(default)]
    pub items: Vec<ExploreItem>,
}

/// One media item from the explore feed.
#[derive(Debug, Deserialize)]
pub struct ExploreItem {
    /// Platform ids arrive as either JSON strings or numbers.
    #[serde(alias = "pk", deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub code: String,
    /// 1 = photo, 2 = video, 8 = carousel.
    pub media_type: u8,
    #[serde(default)]
    pub video_url: Option<String>,
    #[serde(default)]
    pub like_count: Option<u64>,
    #[serde(default, alias = "play_count")]
    pub view_count: Option<u64>,
    #[serde(default)]
    pub caption: Option<ItemCaption>,
    pub user: ItemUser,
}

#[derive(Debug, Deserialize)]
pub struct ItemCaption {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ItemUser {
    pub username: String,
}

impl ExploreItem {
    /// Convert to a [`CandidateVideo`] when the item is a video with a
    /// downloadable URL. Photos and url-less items yield `None`.
    #[must_use]
    pub fn into_candidate(self) -> Option<CandidateVideo> {
        if !VIDEO_MEDIA_TYPES.contains(&self.media_type) {
            return None;
        }
        let media_url = self.video_url.filter(|u| !u.trim().is_empty())?;
        let caption_text = self
            .caption
            .map(|c| c.text)
            .filter(|t| !t.trim().is_empty());

        Some(CandidateVideo {
            id: self.id,
            code: self.code,
            media_url,
            author: self.user.username,
            caption_text,
            like_count: self.like_count.unwrap_or(0),
            view_count: self.view_count.unwrap_or(0),
        })
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}
