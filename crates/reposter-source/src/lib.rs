//! Candidate Source: discovers trending videos and their engagement metrics.

pub mod client;
pub mod error;
pub(crate) mod retry;
pub mod session;
pub mod types;

use async_trait::async_trait;
use reposter_core::VideoBatch;

pub use client::DiscoveryClient;
pub use error::DiscoveryError;
pub use session::SessionStore;

/// A source of repost candidates.
///
/// A failed fetch means "no candidates this cycle"; it is never fatal to the
/// process. Implementations bound every request with their own timeout.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn fetch(&self, batch_size: usize) -> Result<VideoBatch, DiscoveryError>;
}
