//! Per-cycle outcome record handed to the reporter.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{CandidateVideo, Caption, PublishResult};

/// Orchestrator stage in which a cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Discovering,
    Filtering,
    Acquiring,
    Captioning,
    Publishing,
    Reporting,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Discovering => "discovering",
            Stage::Filtering => "filtering",
            Stage::Acquiring => "acquiring",
            Stage::Captioning => "captioning",
            Stage::Publishing => "publishing",
            Stage::Reporting => "reporting",
        };
        f.write_str(name)
    }
}

/// Classification of a failed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Discovery,
    Acquisition,
    Publish,
    Timeout,
    Cancelled,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FailureKind::Discovery => "discovery",
            FailureKind::Acquisition => "acquisition",
            FailureKind::Publish => "publish",
            FailureKind::Timeout => "timeout",
            FailureKind::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CycleOutcome {
    Published {
        media_id: String,
    },
    /// No candidate met the thresholds. Expected, not an error.
    Skipped {
        batch_size: usize,
    },
    Failed {
        stage: Stage,
        kind: FailureKind,
        detail: String,
    },
}

impl CycleOutcome {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            CycleOutcome::Published { .. } => "published",
            CycleOutcome::Skipped { .. } => "skipped",
            CycleOutcome::Failed { .. } => "failed",
        }
    }
}

/// Everything known about one cycle. Produced exactly once per cycle, sent to
/// the reporter and then discarded.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub candidate: Option<CandidateVideo>,
    pub caption: Option<Caption>,
    pub publish: Option<PublishResult>,
    pub outcome: CycleOutcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CycleReport {
    /// Wall-clock length of the cycle in seconds.
    #[must_use]
    pub fn duration_secs(&self) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let secs = (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0;
        secs
    }
}
