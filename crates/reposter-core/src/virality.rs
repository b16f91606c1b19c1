//! Virality filter: picks one repost candidate out of a discovery batch.
//!
//! Candidates must clear every threshold. Qualifiers are ranked by a
//! configurable key, truncated to the top-K, and one is drawn uniformly at
//! random from that pool. The random source is injected so selection is
//! reproducible under test.

use std::cmp::Ordering;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use serde::Serialize;

use crate::types::{CandidateVideo, VideoBatch};

/// Minimum engagement a candidate must show to be eligible for repost.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    pub min_likes: u64,
    pub min_views: u64,
    pub min_engagement_rate: f64,
}

impl Thresholds {
    /// `true` when `candidate` clears all three thresholds. A candidate with
    /// zero views is never eligible.
    #[must_use]
    pub fn admits(&self, candidate: &CandidateVideo) -> bool {
        candidate.view_count > 0
            && candidate.like_count >= self.min_likes
            && candidate.view_count >= self.min_views
            && candidate.engagement_rate() >= self.min_engagement_rate
    }
}

/// Ordering used to build the top-K pool among qualifying candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingKey {
    #[default]
    LikesPlusViews,
    Likes,
    Views,
    Engagement,
}

impl RankingKey {
    fn compare(self, a: &CandidateVideo, b: &CandidateVideo) -> Ordering {
        match self {
            RankingKey::LikesPlusViews => {
                let sa = a.like_count.saturating_add(a.view_count);
                let sb = b.like_count.saturating_add(b.view_count);
                sa.cmp(&sb)
            }
            RankingKey::Likes => a.like_count.cmp(&b.like_count),
            RankingKey::Views => a.view_count.cmp(&b.view_count),
            RankingKey::Engagement => a.engagement_rate().total_cmp(&b.engagement_rate()),
        }
    }
}

impl FromStr for RankingKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "likes_plus_views" => Ok(RankingKey::LikesPlusViews),
            "likes" => Ok(RankingKey::Likes),
            "views" => Ok(RankingKey::Views),
            "engagement" => Ok(RankingKey::Engagement),
            other => Err(format!(
                "unknown ranking key '{other}' (expected likes_plus_views, likes, views or engagement)"
            )),
        }
    }
}

/// A candidate chosen by the filter.
///
/// Only [`ViralityFilter::select`] constructs this type, so holding one means
/// every threshold was satisfied.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedCandidate {
    candidate: CandidateVideo,
    rank: usize,
    pool_size: usize,
    qualified: usize,
}

impl SelectedCandidate {
    #[must_use]
    pub fn candidate(&self) -> &CandidateVideo {
        &self.candidate
    }

    #[must_use]
    pub fn into_candidate(self) -> CandidateVideo {
        self.candidate
    }

    /// Zero-based position of the pick within the ranked pool.
    #[must_use]
    pub fn rank(&self) -> usize {
        self.rank
    }

    #[must_use]
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Number of candidates in the batch that met every threshold.
    #[must_use]
    pub fn qualified(&self) -> usize {
        self.qualified
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Selected(SelectedCandidate),
    /// Zero candidates qualified. An expected outcome, not an error.
    Ineligible { batch_size: usize },
}

pub struct ViralityFilter {
    thresholds: Thresholds,
    top_k: usize,
    ranking_key: RankingKey,
    rng: Box<dyn RngCore + Send>,
}

impl ViralityFilter {
    /// Filter backed by an OS-seeded random source.
    #[must_use]
    pub fn new(thresholds: Thresholds, top_k: usize, ranking_key: RankingKey) -> Self {
        Self::with_rng(thresholds, top_k, ranking_key, StdRng::from_os_rng())
    }

    /// Filter with an explicit random source, for reproducible selection.
    #[must_use]
    pub fn with_rng(
        thresholds: Thresholds,
        top_k: usize,
        ranking_key: RankingKey,
        rng: impl RngCore + Send + 'static,
    ) -> Self {
        Self {
            thresholds,
            top_k: top_k.max(1),
            ranking_key,
            rng: Box::new(rng),
        }
    }

    #[must_use]
    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    /// Rank every qualifying candidate, best first. Ties keep batch order.
    #[must_use]
    pub fn rank_qualifiers<'a>(&self, batch: &'a VideoBatch) -> Vec<&'a CandidateVideo> {
        let mut qualifiers: Vec<&CandidateVideo> = batch
            .iter()
            .filter(|c| self.thresholds.admits(c))
            .collect();
        let key = self.ranking_key;
        qualifiers.sort_by(|a, b| key.compare(b, a));
        qualifiers
    }

    /// Choose one candidate from `batch`.
    pub fn select(&mut self, batch: &VideoBatch) -> Selection {
        let ranked = self.rank_qualifiers(batch);
        let qualified = ranked.len();

        if ranked.is_empty() {
            tracing::info!(
                batch_size = batch.len(),
                min_likes = self.thresholds.min_likes,
                min_views = self.thresholds.min_views,
                min_engagement_rate = self.thresholds.min_engagement_rate,
                "virality filter: no eligible candidate"
            );
            return Selection::Ineligible {
                batch_size: batch.len(),
            };
        }

        let pool = &ranked[..qualified.min(self.top_k)];
        let rank = self.rng.random_range(0..pool.len());
        let candidate = pool[rank].clone();

        tracing::info!(
            candidate = %candidate.id,
            author = %candidate.author,
            likes = candidate.like_count,
            views = candidate.view_count,
            rank,
            pool = pool.len(),
            qualified,
            "virality filter: candidate selected"
        );

        Selection::Selected(SelectedCandidate {
            candidate,
            rank,
            pool_size: pool.len(),
            qualified,
        })
    }
}
