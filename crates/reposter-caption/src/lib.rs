//! Caption Synthesizer: generative path with a template fallback.

pub mod constraints;
pub mod error;
pub mod generative;
pub mod synthesizer;
pub mod template;

use async_trait::async_trait;
use reposter_core::{CandidateVideo, Caption, LocalAsset};

pub use error::CaptionError;
pub use generative::GenerativeCaptioner;
pub use synthesizer::CaptionSynthesizer;
pub use template::TemplateCaptioner;

/// Inputs available when writing a caption.
#[derive(Debug, Clone, Copy)]
pub struct CaptionContext<'a> {
    pub candidate: &'a CandidateVideo,
    /// Downloaded asset, for contextual hints. Optional.
    pub asset: Option<&'a LocalAsset>,
}

impl<'a> CaptionContext<'a> {
    #[must_use]
    pub fn new(candidate: &'a CandidateVideo) -> Self {
        Self {
            candidate,
            asset: None,
        }
    }

    #[must_use]
    pub fn with_asset(mut self, asset: &'a LocalAsset) -> Self {
        self.asset = Some(asset);
        self
    }
}

/// A caption producer that may fail.
#[async_trait]
pub trait CaptionStrategy: Send + Sync {
    async fn synthesize(&self, ctx: &CaptionContext<'_>) -> Result<Caption, CaptionError>;
}
