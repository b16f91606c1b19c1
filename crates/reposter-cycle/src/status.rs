//! Process-wide view of the scheduler, read by the liveness endpoint.

use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use reposter_core::{CreditStatus, CycleOutcome, CycleReport};
use serde::Serialize;

use crate::archive::ArchiveBundle;

#[derive(Debug, Clone, Serialize)]
pub struct LastCycle {
    pub outcome: CycleOutcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusSnapshot {
    pub paused: bool,
    pub credit: Option<CreditStatus>,
    pub cycles_run: u64,
    pub last_cycle: Option<LastCycle>,
    pub last_bundle: Option<ArchiveBundle>,
}

#[derive(Debug, Default)]
pub struct StatusBoard {
    inner: RwLock<StatusSnapshot>,
}

impl StatusBoard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn snapshot(&self) -> StatusSnapshot {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set_credit(&self, credit: CreditStatus) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.paused = credit.is_exhausted();
        inner.credit = Some(credit);
    }

    pub(crate) fn record_cycle(&self, report: &CycleReport) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.cycles_run += 1;
        inner.last_cycle = Some(LastCycle {
            outcome: report.outcome.clone(),
            started_at: report.started_at,
            finished_at: report.finished_at,
        });
    }

    pub(crate) fn set_bundle(&self, bundle: ArchiveBundle) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.last_bundle = Some(bundle);
    }
}
