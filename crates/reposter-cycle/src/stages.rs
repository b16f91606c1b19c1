//! Seams between the orchestrator and the stage crates.

use async_trait::async_trait;
use reposter_caption::CaptionSynthesizer;
use reposter_core::{CandidateVideo, LocalAsset, ViralityFilter};
use reposter_media::{AcquisitionError, AssetAcquirer, HostingService};
use reposter_publish::Publisher;
use reposter_source::CandidateSource;

/// Download side of the Asset Acquirer. The orchestrator is its only writer.
#[async_trait]
pub trait MediaAcquirer: Send {
    async fn acquire(&mut self, candidate: &CandidateVideo)
        -> Result<LocalAsset, AcquisitionError>;
}

#[async_trait]
impl MediaAcquirer for AssetAcquirer {
    async fn acquire(
        &mut self,
        candidate: &CandidateVideo,
    ) -> Result<LocalAsset, AcquisitionError> {
        AssetAcquirer::acquire(self, candidate).await
    }
}

/// Everything one cycle drives, in stage order.
pub struct Stages {
    pub source: Box<dyn CandidateSource>,
    pub filter: ViralityFilter,
    pub acquirer: Box<dyn MediaAcquirer>,
    pub hosting: Box<dyn HostingService>,
    pub captions: CaptionSynthesizer,
    pub publisher: Box<dyn Publisher>,
}
