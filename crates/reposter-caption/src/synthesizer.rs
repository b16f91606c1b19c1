//! Primary-then-fallback combinator.
//!
//! The return type of [`CaptionSynthesizer::synthesize`] is a bare
//! [`Caption`]: there is no error path out of the synthesizer.

use reposter_core::{Caption, CaptionSettings};

use crate::generative::GenerativeCaptioner;
use crate::template::TemplateCaptioner;
use crate::{CaptionContext, CaptionStrategy};

pub struct CaptionSynthesizer {
    primary: Option<Box<dyn CaptionStrategy>>,
    fallback: TemplateCaptioner,
}

impl CaptionSynthesizer {
    #[must_use]
    pub fn new(primary: Option<Box<dyn CaptionStrategy>>, fallback: TemplateCaptioner) -> Self {
        Self { primary, fallback }
    }

    /// Synthesizer that never attempts the generative path.
    #[must_use]
    pub fn template_only() -> Self {
        Self::new(None, TemplateCaptioner::new())
    }

    /// Wire the generative path from settings. When AI captions are disabled,
    /// no API key is configured, or the client cannot be built, the
    /// synthesizer runs template-only.
    #[must_use]
    pub fn from_settings(settings: &CaptionSettings, api_key: Option<&str>) -> Self {
        if !settings.ai_enabled {
            tracing::info!("caption: AI captions disabled, using templates");
            return Self::template_only();
        }
        let Some(key) = api_key else {
            tracing::warn!("caption: OPENAI_API_KEY not set, using templates");
            return Self::template_only();
        };
        match GenerativeCaptioner::new(settings, key) {
            Ok(generative) => {
                tracing::info!(model = %settings.openai_model, "caption: generative path enabled");
                Self::new(Some(Box::new(generative)), TemplateCaptioner::new())
            }
            Err(e) => {
                tracing::error!(error = %e, "caption: could not build generative client, using templates");
                Self::template_only()
            }
        }
    }

    #[must_use]
    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    /// Produce a caption. Tries the primary strategy when configured and
    /// falls back to the template on any error.
    pub async fn synthesize(&self, ctx: &CaptionContext<'_>) -> Caption {
        if let Some(primary) = &self.primary {
            match primary.synthesize(ctx).await {
                Ok(caption) => return caption,
                Err(e) => {
                    tracing::warn!(
                        candidate = %ctx.candidate.id,
                        error = %e,
                        "caption: generative path failed, using template"
                    );
                }
            }
        }
        self.fallback.compose(ctx)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use reposter_core::{CandidateVideo, CaptionMethod};

    use super::*;
    use crate::constraints::validate;
    use crate::error::CaptionError;

    struct Scripted {
        calls: Arc<AtomicU32>,
        result: fn() -> Result<Caption, CaptionError>,
    }

    #[async_trait]
    impl CaptionStrategy for Scripted {
        async fn synthesize(&self, _ctx: &CaptionContext<'_>) -> Result<Caption, CaptionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.result)()
        }
    }

    fn candidate() -> CandidateVideo {
        CandidateVideo {
            id: "42".to_owned(),
            code: "c".to_owned(),
            media_url: "https://cdn.example.com/42.mp4".to_owned(),
            author: "creator".to_owned(),
            caption_text: Some("a dog on a skateboard".to_owned()),
            like_count: 1,
            view_count: 1,
        }
    }

    fn settings(ai_enabled: bool) -> CaptionSettings {
        CaptionSettings {
            ai_enabled,
            openai_base_url: "http://127.0.0.1:9".to_owned(),
            openai_model: "test-model".to_owned(),
            timeout_secs: 1,
        }
    }

    #[tokio::test]
    async fn timeout_falls_back_to_template() {
        let calls = Arc::new(AtomicU32::new(0));
        let synth = CaptionSynthesizer::new(
            Some(Box::new(Scripted {
                calls: Arc::clone(&calls),
                result: || Err(CaptionError::Timeout),
            })),
            TemplateCaptioner::new(),
        );
        let c = candidate();
        let caption = synth.synthesize(&CaptionContext::new(&c)).await;
        assert_eq!(caption.method, CaptionMethod::Template);
        validate(&caption.text).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn primary_success_is_used() {
        let calls = Arc::new(AtomicU32::new(0));
        let synth = CaptionSynthesizer::new(
            Some(Box::new(Scripted {
                calls: Arc::clone(&calls),
                result: || {
                    Ok(Caption {
                        text: "🔥 hi\n\n#one #two\n\nFollow!".to_owned(),
                        method: CaptionMethod::Ai,
                    })
                },
            })),
            TemplateCaptioner::new(),
        );
        let c = candidate();
        let caption = synth.synthesize(&CaptionContext::new(&c)).await;
        assert_eq!(caption.method, CaptionMethod::Ai);
    }

    #[test]
    fn disabled_flag_skips_generative_path_entirely() {
        let synth = CaptionSynthesizer::from_settings(&settings(false), Some("sk-test"));
        assert!(!synth.has_primary());
    }

    #[test]
    fn missing_key_disables_generative_path() {
        let synth = CaptionSynthesizer::from_settings(&settings(true), None);
        assert!(!synth.has_primary());
    }

    #[test]
    fn enabled_with_key_has_primary() {
        let synth = CaptionSynthesizer::from_settings(&settings(true), Some("sk-test"));
        assert!(synth.has_primary());
    }
}
