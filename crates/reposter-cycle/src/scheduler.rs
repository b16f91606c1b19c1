//! Fixed-interval loop around the orchestrator.
//!
//! Cycles run strictly one after another: the next sleep starts only after
//! the previous cycle, including its report, has finished. Budget exhaustion
//! archives the download directory once and pauses scheduling until the
//! budget is restored.

use std::sync::Arc;
use std::time::Duration;

use reposter_core::shutdown::{is_shutdown, shutdown_requested};
use reposter_core::{AppConfig, CreditStatus, CycleReport, ShutdownRx};
use reposter_notify::{Notice, Reporter};
use tokio::sync::Notify;

use crate::archive::{ArchiveBundle, Archiver};
use crate::credit::CreditMonitor;
use crate::error::ArchiveError;
use crate::orchestrator::Orchestrator;
use crate::status::StatusBoard;

/// Handle that cuts the scheduler's current sleep short.
///
/// Only a scheduler already sleeping is woken. A wake sent while a cycle is
/// running is dropped, so it can never shorten the interval after that cycle.
#[derive(Debug, Clone, Default)]
pub struct SchedulerWaker(Arc<Notify>);

impl SchedulerWaker {
    pub fn wake(&self) {
        self.0.notify_waiters();
    }

    async fn woken(&self) {
        self.0.notified().await;
    }
}

#[derive(Debug)]
pub enum TickOutcome {
    Ran(Box<CycleReport>),
    Paused(CreditStatus),
}

pub struct Scheduler {
    orchestrator: Orchestrator,
    credit: CreditMonitor,
    archiver: Archiver,
    interval: Duration,
    recheck: Duration,
    status: Arc<StatusBoard>,
    wake: SchedulerWaker,
    archived: bool,
}

impl Scheduler {
    #[must_use]
    pub fn new(
        orchestrator: Orchestrator,
        credit: CreditMonitor,
        archiver: Archiver,
        interval: Duration,
        recheck: Duration,
    ) -> Self {
        Self {
            orchestrator,
            credit,
            archiver,
            interval,
            recheck,
            status: Arc::new(StatusBoard::new()),
            wake: SchedulerWaker::default(),
            archived: false,
        }
    }

    #[must_use]
    pub fn from_config(
        config: &AppConfig,
        orchestrator: Orchestrator,
        credit: CreditMonitor,
    ) -> Self {
        Self::new(
            orchestrator,
            credit,
            Archiver::from_settings(&config.credit, &config.media),
            config.interval(),
            Duration::from_secs(config.credit.check_interval_secs.max(1)),
        )
    }

    #[must_use]
    pub fn status(&self) -> Arc<StatusBoard> {
        Arc::clone(&self.status)
    }

    /// Interrupts the current sleep so the next tick runs immediately.
    #[must_use]
    pub fn waker(&self) -> SchedulerWaker {
        self.wake.clone()
    }

    #[must_use]
    pub fn credit(&self) -> &CreditMonitor {
        &self.credit
    }

    /// Check the budget, then either run one cycle or stay paused.
    pub async fn tick(&mut self, shutdown: ShutdownRx) -> TickOutcome {
        let credit = self.credit.check().await;
        self.status.set_credit(credit);

        if credit.is_exhausted() {
            if self.archived {
                tracing::info!("scheduler: budget still exhausted, staying paused");
            } else {
                tracing::warn!(?credit, "scheduler: budget exhausted, archiving and pausing");
                self.archived = archive_and_notify(
                    self.archiver.clone(),
                    &self.status,
                    self.orchestrator.reporter(),
                )
                .await;
            }
            return TickOutcome::Paused(credit);
        }
        self.archived = false;

        let report = self.orchestrator.run_cycle(shutdown).await;
        self.status.record_cycle(&report);
        TickOutcome::Ran(Box::new(report))
    }

    /// Tick until shutdown. Sleeps `interval` after a cycle and the credit
    /// re-check period while paused.
    pub async fn run(mut self, mut shutdown: ShutdownRx) {
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            recheck_secs = self.recheck.as_secs(),
            "scheduler: started"
        );
        loop {
            if is_shutdown(&shutdown) {
                break;
            }
            let wait = match self.tick(shutdown.clone()).await {
                TickOutcome::Ran(_) => self.interval,
                TickOutcome::Paused(_) => self.recheck,
            };
            tracing::info!(wait_secs = wait.as_secs(), "scheduler: sleeping");
            tokio::select! {
                () = tokio::time::sleep(wait) => {}
                () = self.wake.woken() => tracing::info!("scheduler: woken early"),
                () = shutdown_requested(&mut shutdown) => break,
            }
        }
        tracing::info!("scheduler: stopped");
    }
}

async fn archive_and_notify(
    archiver: Archiver,
    status: &StatusBoard,
    reporter: Arc<dyn Reporter>,
) -> bool {
    match build_bundle(archiver).await {
        Ok(bundle) => {
            let notice =
                Notice::archive_ready(&bundle.download_url, bundle.size_bytes, &bundle.sha256);
            status.set_bundle(bundle);
            deliver(reporter.as_ref(), &notice).await;
            true
        }
        Err(e) => {
            tracing::error!(error = %e, "scheduler: archive failed, will retry on next check");
            deliver(
                reporter.as_ref(),
                &Notice::error(format!("Budget exhausted but archiving failed: {e}")),
            )
            .await;
            false
        }
    }
}

/// Run the blocking archive build off the async workers.
///
/// # Errors
///
/// Returns [`ArchiveError`] from the build, or [`ArchiveError::Task`] if the
/// blocking task panicked.
pub async fn build_bundle(archiver: Archiver) -> Result<ArchiveBundle, ArchiveError> {
    tokio::task::spawn_blocking(move || archiver.archive())
        .await
        .map_err(|e| ArchiveError::Task(e.to_string()))?
}

async fn deliver(reporter: &dyn Reporter, notice: &Notice) {
    if let Err(e) = reporter.notify(notice).await {
        tracing::warn!(error = %e, "scheduler: notice delivery failed");
    }
}
