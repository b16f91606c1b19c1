//! Generative caption path: a chat-completions call with a bounded timeout.

use std::time::Duration;

use async_trait::async_trait;
use reposter_core::{Caption, CaptionMethod, CaptionSettings};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::constraints::normalize;
use crate::error::CaptionError;
use crate::{CaptionContext, CaptionStrategy};

const SYSTEM_PROMPT: &str = "You write short, engaging captions for short-form video reposts. \
Captions are natural, never robotic, and always follow the requested layout.";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_completion_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct GenerativeCaptioner {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GenerativeCaptioner {
    /// # Errors
    ///
    /// Returns [`CaptionError::Http`] if the HTTP client cannot be built.
    pub fn new(settings: &CaptionSettings, api_key: &str) -> Result<Self, CaptionError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("reposter/0.1 (caption)")
            .build()?;
        Ok(Self {
            client,
            base_url: settings.openai_base_url.trim_end_matches('/').to_owned(),
            api_key: api_key.to_owned(),
            model: settings.openai_model.clone(),
        })
    }

    fn prompt(ctx: &CaptionContext<'_>) -> String {
        let mut about = ctx.candidate.title();
        if let Some(asset) = ctx.asset {
            about.push_str(&format!(" ({:.1} MB clip)", asset.size_mb()));
        }
        format!(
            "Write a caption for a repost of a video by @{author}. The video is about: {about}\n\n\
             Requirements:\n\
             - Start with an attention-grabbing hook that uses an emoji\n\
             - Keep the hook under 150 characters\n\
             - Add 15-20 relevant trending hashtags\n\
             - End with a call to action such as \"Follow for more!\"\n\n\
             Layout:\n\
             [hook]\n\n[hashtags separated by spaces]\n\n[call to action]",
            author = ctx.candidate.author,
        )
    }

    async fn complete(&self, prompt: &str) -> Result<String, CaptionError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            max_completion_tokens: 500,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        let body = response.text().await.map_err(classify)?;
        if !status.is_success() {
            let message: String = body.chars().take(200).collect();
            return Err(CaptionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse =
            serde_json::from_str(&body).map_err(|e| CaptionError::Deserialize {
                context: "chat/completions".to_owned(),
                source: e,
            })?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .ok_or(CaptionError::EmptyResponse)
    }
}

fn classify(err: reqwest::Error) -> CaptionError {
    if err.is_timeout() {
        CaptionError::Timeout
    } else {
        CaptionError::Http(err)
    }
}

#[async_trait]
impl CaptionStrategy for GenerativeCaptioner {
    async fn synthesize(&self, ctx: &CaptionContext<'_>) -> Result<Caption, CaptionError> {
        let raw = self.complete(&Self::prompt(ctx)).await?;
        let text = normalize(&raw)?;
        tracing::info!(chars = text.chars().count(), "caption: generated");
        Ok(Caption {
            text,
            method: CaptionMethod::Ai,
        })
    }
}
