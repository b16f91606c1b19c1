//! One repost cycle: discover, filter, acquire, caption, publish, report.
//!
//! Every stage error is caught here and turned into a
//! [`CycleOutcome::Failed`]; `run_cycle` itself cannot fail. The whole cycle
//! runs under a wall-clock ceiling and is abandoned promptly on shutdown.
//! Either way exactly one report is handed to the reporter.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reposter_caption::{CaptionContext, CaptionSynthesizer};
use reposter_core::shutdown::{cancellable, is_shutdown};
use reposter_core::{
    AppConfig, CandidateVideo, Caption, CycleOutcome, CycleReport, FailureKind, PublishOutcome,
    PublishResult, Selection, ShutdownRx, Stage, ViralityFilter,
};
use reposter_media::{hosting_from_settings, AssetAcquirer};
use reposter_notify::Reporter;
use reposter_publish::GraphPublisher;
use reposter_source::DiscoveryClient;

use crate::error::WiringError;
use crate::stages::Stages;

/// Deadline for delivering the report once shutdown has been requested.
const SHUTDOWN_REPORT_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Discovering,
    Filtering,
    Acquiring,
    Captioning,
    Publishing,
    Reporting,
}

impl CycleState {
    fn stage(self) -> Stage {
        match self {
            CycleState::Idle | CycleState::Discovering => Stage::Discovering,
            CycleState::Filtering => Stage::Filtering,
            CycleState::Acquiring => Stage::Acquiring,
            CycleState::Captioning => Stage::Captioning,
            CycleState::Publishing => Stage::Publishing,
            CycleState::Reporting => Stage::Reporting,
        }
    }
}

/// What the cycle has learned so far; survives a timeout or cancellation.
#[derive(Default)]
struct Draft {
    candidate: Option<CandidateVideo>,
    caption: Option<Caption>,
    publish: Option<PublishResult>,
}

pub struct Orchestrator {
    stages: Stages,
    reporter: Arc<dyn Reporter>,
    batch_size: usize,
    cycle_timeout: Duration,
    shutdown_grace: Duration,
    state: CycleState,
}

impl Orchestrator {
    #[must_use]
    pub fn new(
        stages: Stages,
        reporter: Arc<dyn Reporter>,
        batch_size: usize,
        cycle_timeout: Duration,
    ) -> Self {
        Self {
            stages,
            reporter,
            batch_size,
            cycle_timeout,
            shutdown_grace: SHUTDOWN_REPORT_GRACE,
            state: CycleState::Idle,
        }
    }

    /// Bound on report delivery when the process is shutting down.
    #[must_use]
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Wire the production collaborators from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`WiringError`] if an HTTP client cannot be built or the
    /// download directory cannot be prepared.
    pub fn from_config(
        config: &AppConfig,
        reporter: Arc<dyn Reporter>,
    ) -> Result<Self, WiringError> {
        let creds = &config.credentials;
        let stages = Stages {
            source: Box::new(DiscoveryClient::new(
                &config.discovery,
                &creds.scraper_username,
                &creds.scraper_password,
            )?),
            filter: ViralityFilter::new(
                config.selection.thresholds,
                config.selection.top_k,
                config.selection.ranking_key,
            ),
            acquirer: Box::new(AssetAcquirer::new(&config.media)?),
            hosting: hosting_from_settings(&config.media)?,
            captions: CaptionSynthesizer::from_settings(
                &config.caption,
                creds.openai_api_key.as_deref(),
            ),
            publisher: Box::new(GraphPublisher::new(
                &config.publish,
                &creds.graph_user_id,
                &creds.graph_access_token,
            )?),
        };
        Ok(Self::new(
            stages,
            reporter,
            config.discovery.batch_size,
            config.cycle_timeout(),
        ))
    }

    #[must_use]
    pub fn state(&self) -> CycleState {
        self.state
    }

    #[must_use]
    pub fn reporter(&self) -> Arc<dyn Reporter> {
        Arc::clone(&self.reporter)
    }

    /// Run one full cycle and deliver its report. Never errors.
    pub async fn run_cycle(&mut self, shutdown: ShutdownRx) -> CycleReport {
        let started_at = Utc::now();
        let mut draft = Draft::default();
        let mut stop = shutdown.clone();
        tracing::info!(batch_size = self.batch_size, "cycle: starting");

        let driven = {
            let drive = tokio::time::timeout(self.cycle_timeout, self.drive(&mut draft, shutdown));
            cancellable(drive, &mut stop).await
        };
        let outcome = match driven {
            Some(Ok(outcome)) => outcome,
            Some(Err(_)) => CycleOutcome::Failed {
                stage: self.state.stage(),
                kind: FailureKind::Timeout,
                detail: format!(
                    "cycle exceeded its {}s ceiling",
                    self.cycle_timeout.as_secs()
                ),
            },
            None => CycleOutcome::Failed {
                stage: self.state.stage(),
                kind: FailureKind::Cancelled,
                detail: "shutdown requested".to_owned(),
            },
        };

        self.enter(CycleState::Reporting);
        let report = CycleReport {
            candidate: draft.candidate,
            caption: draft.caption,
            publish: draft.publish,
            outcome,
            started_at,
            finished_at: Utc::now(),
        };
        log_outcome(&report);

        let grace = is_shutdown(&stop).then_some(self.shutdown_grace);
        deliver(self.reporter.as_ref(), &report, grace).await;
        self.enter(CycleState::Idle);
        report
    }

    fn enter(&mut self, next: CycleState) {
        self.state = next;
        tracing::info!(state = ?next, "cycle: entering state");
    }

    async fn drive(&mut self, draft: &mut Draft, shutdown: ShutdownRx) -> CycleOutcome {
        self.enter(CycleState::Discovering);
        let batch = match self.stages.source.fetch(self.batch_size).await {
            Ok(batch) => batch,
            Err(e) => return failed(Stage::Discovering, FailureKind::Discovery, &e),
        };
        tracing::info!(fetched = batch.len(), "cycle: discovery complete");

        self.enter(CycleState::Filtering);
        let selected = match self.stages.filter.select(&batch) {
            Selection::Selected(selected) => selected,
            Selection::Ineligible { batch_size } => {
                return CycleOutcome::Skipped { batch_size };
            }
        };
        tracing::info!(
            candidate = %selected.candidate().id,
            rank = selected.rank(),
            pool = selected.pool_size(),
            qualified = selected.qualified(),
            "cycle: candidate selected"
        );
        let candidate = selected.into_candidate();
        draft.candidate = Some(candidate.clone());

        self.enter(CycleState::Acquiring);
        let asset = match self.stages.acquirer.acquire(&candidate).await {
            Ok(asset) => asset,
            Err(e) => return failed(Stage::Acquiring, FailureKind::Acquisition, &e),
        };
        let video_url = match self.stages.hosting.host(&asset).await {
            Ok(url) => url,
            Err(e) => return failed(Stage::Acquiring, FailureKind::Acquisition, &e),
        };

        self.enter(CycleState::Captioning);
        let ctx = CaptionContext::new(&candidate).with_asset(&asset);
        let caption = self.stages.captions.synthesize(&ctx).await;
        tracing::info!(method = %caption.method, "cycle: caption ready");
        draft.caption = Some(caption.clone());

        self.enter(CycleState::Publishing);
        let result = self
            .stages
            .publisher
            .publish(&video_url, &caption, shutdown.clone())
            .await;
        draft.publish = Some(result.clone());
        match result.outcome {
            PublishOutcome::Published { media_id } => CycleOutcome::Published { media_id },
            PublishOutcome::Failed { error } => CycleOutcome::Failed {
                stage: Stage::Publishing,
                kind: if is_shutdown(&shutdown) {
                    FailureKind::Cancelled
                } else {
                    FailureKind::Publish
                },
                detail: error,
            },
        }
    }
}

/// Best-effort delivery. With a `grace` bound (shutdown in progress) the
/// reporter's own retry schedule is cut off when it expires.
async fn deliver(reporter: &dyn Reporter, report: &CycleReport, grace: Option<Duration>) {
    let result = match grace {
        Some(grace) => match tokio::time::timeout(grace, reporter.report(report)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(grace_secs = grace.as_secs_f64(), "cycle: report abandoned at shutdown");
                return;
            }
        },
        None => reporter.report(report).await,
    };
    if let Err(e) = result {
        tracing::warn!(error = %e, "cycle: report delivery failed");
    }
}

fn failed(stage: Stage, kind: FailureKind, err: &dyn std::fmt::Display) -> CycleOutcome {
    CycleOutcome::Failed {
        stage,
        kind,
        detail: err.to_string(),
    }
}

fn log_outcome(report: &CycleReport) {
    let secs = report.duration_secs();
    match &report.outcome {
        CycleOutcome::Published { media_id } => {
            tracing::info!(media_id = %media_id, secs, "cycle: published");
        }
        CycleOutcome::Skipped { batch_size } => {
            tracing::info!(batch_size, secs, "cycle: skipped, no eligible candidate");
        }
        CycleOutcome::Failed {
            stage,
            kind,
            detail,
        } => {
            tracing::error!(%stage, %kind, detail = %detail, secs, "cycle: failed");
        }
    }
}
