//! End-to-end cycle tests with in-process stage fakes.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use reposter_caption::{
    CaptionContext, CaptionError, CaptionStrategy, CaptionSynthesizer, TemplateCaptioner,
};
use reposter_core::shutdown;
use reposter_core::{
    CandidateVideo, Caption, CaptionMethod, CycleOutcome, CycleReport, FailureKind, LocalAsset,
    PublishResult, RankingKey, ShutdownRx, Stage, Thresholds, VideoBatch, ViralityFilter,
};
use reposter_cycle::{
    Archiver, CreditMonitor, ManualCreditSource, MediaAcquirer, Orchestrator, Scheduler, Stages,
    TickOutcome,
};
use reposter_media::{AcquisitionError, StaticUrlHosting};
use reposter_notify::{Notice, NoticeKind, ReportError, Reporter};
use reposter_publish::Publisher;
use reposter_source::{CandidateSource, DiscoveryError};

// ---- fakes ----------------------------------------------------------------

struct FakeSource {
    batch: Option<VideoBatch>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl CandidateSource for FakeSource {
    async fn fetch(&self, _batch_size: usize) -> Result<VideoBatch, DiscoveryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.batch
            .clone()
            .ok_or_else(|| DiscoveryError::Auth("login rejected".to_owned()))
    }
}

struct FakeAcquirer {
    dir: PathBuf,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl MediaAcquirer for FakeAcquirer {
    async fn acquire(
        &mut self,
        candidate: &CandidateVideo,
    ) -> Result<LocalAsset, AcquisitionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AcquisitionError::Unavailable {
                status: 404,
                url: candidate.media_url.clone(),
            });
        }
        Ok(LocalAsset {
            path: self.dir.join(format!("rp_{}_20250101T000000000.mp4", candidate.id)),
            size_bytes: 2 * 1024 * 1024,
            candidate_id: candidate.id.clone(),
        })
    }
}

struct TimingOutCaptioner;

#[async_trait]
impl CaptionStrategy for TimingOutCaptioner {
    async fn synthesize(&self, _ctx: &CaptionContext<'_>) -> Result<Caption, CaptionError> {
        Err(CaptionError::Timeout)
    }
}

#[derive(Clone, Copy)]
enum PublishMode {
    Succeed,
    Fail,
    Hang,
}

struct FakePublisher {
    mode: PublishMode,
    seen: Arc<Mutex<Vec<(String, Caption)>>>,
}

#[async_trait]
impl Publisher for FakePublisher {
    async fn publish(
        &self,
        video_url: &str,
        caption: &Caption,
        _shutdown: ShutdownRx,
    ) -> PublishResult {
        self.seen
            .lock()
            .unwrap()
            .push((video_url.to_owned(), caption.clone()));
        match self.mode {
            PublishMode::Succeed => PublishResult::published("media-789", Duration::from_secs(3)),
            PublishMode::Fail => PublishResult::failed(
                "container c1 failed with status ERROR",
                Duration::from_secs(5),
            ),
            PublishMode::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                PublishResult::published("never", Duration::ZERO)
            }
        }
    }
}

#[derive(Clone, Default)]
struct RecordingReporter {
    reports: Arc<Mutex<Vec<CycleReport>>>,
    notices: Arc<Mutex<Vec<Notice>>>,
    fail: bool,
    stall: Option<Duration>,
}

impl RecordingReporter {
    fn reports(&self) -> Vec<CycleReport> {
        self.reports.lock().unwrap().clone()
    }

    fn archive_notices(&self) -> usize {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.kind == NoticeKind::Archive)
            .count()
    }
}

#[async_trait]
impl Reporter for RecordingReporter {
    async fn report(&self, report: &CycleReport) -> Result<(), ReportError> {
        self.reports.lock().unwrap().push(report.clone());
        if let Some(stall) = self.stall {
            tokio::time::sleep(stall).await;
        }
        if self.fail {
            return Err(ReportError::Exhausted {
                attempts: 3,
                last_error: "HTTP 502".to_owned(),
            });
        }
        Ok(())
    }

    async fn notify(&self, notice: &Notice) -> Result<(), ReportError> {
        self.notices.lock().unwrap().push(notice.clone());
        Ok(())
    }
}

// ---- harness --------------------------------------------------------------

fn video(id: &str, likes: u64, views: u64) -> CandidateVideo {
    CandidateVideo {
        id: id.to_owned(),
        code: format!("code{id}"),
        media_url: format!("https://cdn.example.com/{id}.mp4"),
        author: "creator".to_owned(),
        caption_text: Some("A dog learns to skateboard".to_owned()),
        like_count: likes,
        view_count: views,
    }
}

fn viral_batch() -> VideoBatch {
    vec![video("1", 20_000, 100_000), video("2", 50, 1_000)]
}

struct Harness {
    batch: Option<VideoBatch>,
    acquire_fails: bool,
    publish: PublishMode,
    reporter: RecordingReporter,
    cycle_timeout: Duration,
}

impl Default for Harness {
    fn default() -> Self {
        Self {
            batch: Some(viral_batch()),
            acquire_fails: false,
            publish: PublishMode::Succeed,
            reporter: RecordingReporter::default(),
            cycle_timeout: Duration::from_secs(30),
        }
    }
}

struct Built {
    orchestrator: Orchestrator,
    fetches: Arc<AtomicUsize>,
    acquisitions: Arc<AtomicUsize>,
    published: Arc<Mutex<Vec<(String, Caption)>>>,
}

impl Harness {
    fn build(self) -> Built {
        let fetches = Arc::new(AtomicUsize::new(0));
        let acquisitions = Arc::new(AtomicUsize::new(0));
        let published = Arc::new(Mutex::new(Vec::new()));
        let stages = Stages {
            source: Box::new(FakeSource {
                batch: self.batch,
                calls: Arc::clone(&fetches),
            }),
            filter: ViralityFilter::with_rng(
                Thresholds {
                    min_likes: 10_000,
                    min_views: 50_000,
                    min_engagement_rate: 0.05,
                },
                5,
                RankingKey::LikesPlusViews,
                StdRng::seed_from_u64(7),
            ),
            acquirer: Box::new(FakeAcquirer {
                dir: PathBuf::from("/tmp/reposter-test"),
                fail: self.acquire_fails,
                calls: Arc::clone(&acquisitions),
            }),
            hosting: Box::new(StaticUrlHosting::new("https://media.example.com/v/")),
            captions: CaptionSynthesizer::new(
                Some(Box::new(TimingOutCaptioner)),
                TemplateCaptioner::new(),
            ),
            publisher: Box::new(FakePublisher {
                mode: self.publish,
                seen: Arc::clone(&published),
            }),
        };
        Built {
            orchestrator: Orchestrator::new(
                stages,
                Arc::new(self.reporter),
                50,
                self.cycle_timeout,
            ),
            fetches,
            acquisitions,
            published,
        }
    }
}

/// A receiver whose sender is gone: shutdown can never be requested.
fn running() -> ShutdownRx {
    shutdown::channel().1
}

// ---- orchestrator ---------------------------------------------------------

#[tokio::test]
async fn caption_timeout_falls_back_to_template_and_still_publishes() {
    let reporter = RecordingReporter::default();
    let mut built = Harness {
        reporter: reporter.clone(),
        ..Harness::default()
    }
    .build();

    let report = built.orchestrator.run_cycle(running()).await;

    assert_eq!(
        report.outcome,
        CycleOutcome::Published {
            media_id: "media-789".to_owned()
        }
    );
    let caption = report.caption.as_ref().unwrap();
    assert_eq!(caption.method, CaptionMethod::Template);
    assert!(caption.text.contains('#'));

    let published = built.published.lock().unwrap().clone();
    assert_eq!(published.len(), 1);
    assert_eq!(
        published[0].0,
        "https://media.example.com/v/rp_1_20250101T000000000.mp4"
    );
    assert_eq!(published[0].1.method, CaptionMethod::Template);

    assert_eq!(report.candidate.as_ref().unwrap().id, "1");
    assert_eq!(reporter.reports().len(), 1);
}

#[tokio::test]
async fn discovery_failure_is_reported_not_raised() {
    let reporter = RecordingReporter::default();
    let mut built = Harness {
        batch: None,
        reporter: reporter.clone(),
        ..Harness::default()
    }
    .build();

    let report = built.orchestrator.run_cycle(running()).await;

    match &report.outcome {
        CycleOutcome::Failed {
            stage,
            kind,
            detail,
        } => {
            assert_eq!(*stage, Stage::Discovering);
            assert_eq!(*kind, FailureKind::Discovery);
            assert!(detail.contains("login rejected"));
        }
        other => panic!("expected discovery failure, got {other:?}"),
    }
    assert!(report.candidate.is_none());
    assert_eq!(built.acquisitions.load(Ordering::SeqCst), 0);
    assert_eq!(reporter.reports().len(), 1);
}

#[tokio::test]
async fn ineligible_batch_is_skipped() {
    let reporter = RecordingReporter::default();
    let mut built = Harness {
        batch: Some(vec![video("a", 10, 100), video("b", 9_999, 1_000_000)]),
        reporter: reporter.clone(),
        ..Harness::default()
    }
    .build();

    let report = built.orchestrator.run_cycle(running()).await;

    assert_eq!(report.outcome, CycleOutcome::Skipped { batch_size: 2 });
    assert!(report.candidate.is_none());
    assert_eq!(built.acquisitions.load(Ordering::SeqCst), 0);
    assert_eq!(reporter.reports().len(), 1);
}

#[tokio::test]
async fn acquisition_failure_keeps_candidate_in_report() {
    let mut built = Harness {
        acquire_fails: true,
        ..Harness::default()
    }
    .build();

    let report = built.orchestrator.run_cycle(running()).await;

    assert!(matches!(
        report.outcome,
        CycleOutcome::Failed {
            stage: Stage::Acquiring,
            kind: FailureKind::Acquisition,
            ..
        }
    ));
    assert_eq!(report.candidate.unwrap().id, "1");
    assert!(report.caption.is_none());
    assert!(built.published.lock().unwrap().is_empty());
}

#[tokio::test]
async fn publish_failure_carries_caption_and_detail() {
    let mut built = Harness {
        publish: PublishMode::Fail,
        ..Harness::default()
    }
    .build();

    let report = built.orchestrator.run_cycle(running()).await;

    match &report.outcome {
        CycleOutcome::Failed {
            stage,
            kind,
            detail,
        } => {
            assert_eq!(*stage, Stage::Publishing);
            assert_eq!(*kind, FailureKind::Publish);
            assert!(detail.contains("ERROR"));
        }
        other => panic!("expected publish failure, got {other:?}"),
    }
    assert!(report.caption.is_some());
    assert!(!report.publish.unwrap().is_success());
}

#[tokio::test]
async fn report_delivery_failure_does_not_change_outcome() {
    let reporter = RecordingReporter {
        fail: true,
        ..RecordingReporter::default()
    };
    let mut built = Harness {
        reporter: reporter.clone(),
        ..Harness::default()
    }
    .build();

    let report = built.orchestrator.run_cycle(running()).await;

    assert_eq!(report.outcome.label(), "published");
    assert_eq!(reporter.reports().len(), 1);
}

#[tokio::test]
async fn stalled_stage_hits_cycle_ceiling() {
    let reporter = RecordingReporter::default();
    let mut built = Harness {
        publish: PublishMode::Hang,
        cycle_timeout: Duration::from_millis(200),
        reporter: reporter.clone(),
        ..Harness::default()
    }
    .build();

    let report = tokio::time::timeout(
        Duration::from_secs(10),
        built.orchestrator.run_cycle(running()),
    )
    .await
    .expect("cycle ceiling should fire");

    assert!(matches!(
        report.outcome,
        CycleOutcome::Failed {
            stage: Stage::Publishing,
            kind: FailureKind::Timeout,
            ..
        }
    ));
    assert!(report.caption.is_some());
    assert_eq!(reporter.reports().len(), 1);
}

#[tokio::test]
async fn shutdown_cancels_in_flight_cycle() {
    let reporter = RecordingReporter::default();
    let built = Harness {
        publish: PublishMode::Hang,
        reporter: reporter.clone(),
        ..Harness::default()
    }
    .build();
    let mut orchestrator = built.orchestrator;
    let (tx, rx) = shutdown::channel();

    let handle = tokio::spawn(async move { orchestrator.run_cycle(rx).await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    tx.send(true).unwrap();

    let report = tokio::time::timeout(Duration::from_secs(10), handle)
        .await
        .expect("cancellation should be prompt")
        .unwrap();
    assert!(matches!(
        report.outcome,
        CycleOutcome::Failed {
            kind: FailureKind::Cancelled,
            ..
        }
    ));
    assert_eq!(reporter.reports().len(), 1);
}

#[tokio::test]
async fn report_during_shutdown_is_bounded_by_grace() {
    let reporter = RecordingReporter {
        stall: Some(Duration::from_secs(3600)),
        ..RecordingReporter::default()
    };
    let built = Harness {
        publish: PublishMode::Hang,
        reporter: reporter.clone(),
        ..Harness::default()
    }
    .build();
    let mut orchestrator = built
        .orchestrator
        .with_shutdown_grace(Duration::from_millis(100));
    let (tx, rx) = shutdown::channel();

    let handle = tokio::spawn(async move { orchestrator.run_cycle(rx).await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    tx.send(true).unwrap();

    let report = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("a stalled reporter must not hold up shutdown")
        .unwrap();
    assert_eq!(report.outcome.label(), "failed");
    assert_eq!(reporter.reports().len(), 1, "delivery is still attempted once");
}

// ---- scheduler ------------------------------------------------------------

fn scheduler(
    orchestrator: Orchestrator,
    manual: Arc<ManualCreditSource>,
    root: &tempfile::TempDir,
) -> Scheduler {
    let videos = root.path().join("videos");
    std::fs::create_dir_all(&videos).unwrap();
    std::fs::write(videos.join("rp_1_20250101T000000000.mp4"), b"clip").unwrap();
    Scheduler::new(
        orchestrator,
        CreditMonitor::new(manual, None, 3.0),
        Archiver::new(
            &videos,
            root.path().join("bundle.zip"),
            "https://bot.example.com",
        ),
        Duration::from_secs(3 * 3600),
        Duration::from_secs(3600),
    )
}

#[tokio::test]
async fn exhausted_budget_archives_once_and_pauses_until_restored() {
    let root = tempfile::tempdir().unwrap();
    let reporter = RecordingReporter::default();
    let built = Harness {
        reporter: reporter.clone(),
        ..Harness::default()
    }
    .build();
    let fetches = Arc::clone(&built.fetches);
    let manual = Arc::new(ManualCreditSource::new(true));
    let mut scheduler = scheduler(built.orchestrator, Arc::clone(&manual), &root);
    let status = scheduler.status();

    for _ in 0..3 {
        assert!(matches!(
            scheduler.tick(running()).await,
            TickOutcome::Paused(_)
        ));
    }
    assert_eq!(reporter.archive_notices(), 1);
    assert_eq!(fetches.load(Ordering::SeqCst), 0);
    assert!(reporter.reports().is_empty());
    assert!(root.path().join("bundle.zip").exists());

    let snapshot = status.snapshot();
    assert!(snapshot.paused);
    assert_eq!(snapshot.last_bundle.unwrap().file_count, 1);

    manual.restore();
    match scheduler.tick(running()).await {
        TickOutcome::Ran(report) => assert_eq!(report.outcome.label(), "published"),
        TickOutcome::Paused(credit) => panic!("still paused: {credit:?}"),
    }
    assert_eq!(fetches.load(Ordering::SeqCst), 1);
    assert_eq!(reporter.archive_notices(), 1);

    let snapshot = status.snapshot();
    assert!(!snapshot.paused);
    assert_eq!(snapshot.cycles_run, 1);

    manual.mark_exhausted();
    assert!(matches!(
        scheduler.tick(running()).await,
        TickOutcome::Paused(_)
    ));
    assert_eq!(reporter.archive_notices(), 2);
}

#[tokio::test]
async fn run_stops_on_shutdown_after_a_cycle() {
    let root = tempfile::tempdir().unwrap();
    let reporter = RecordingReporter::default();
    let built = Harness {
        reporter: reporter.clone(),
        ..Harness::default()
    }
    .build();
    let scheduler = scheduler(
        built.orchestrator,
        Arc::new(ManualCreditSource::default()),
        &root,
    );
    let (tx, rx) = shutdown::channel();

    let handle = tokio::spawn(scheduler.run(rx));
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while reporter.reports().is_empty() {
        assert!(tokio::time::Instant::now() < deadline, "no cycle ran");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    tx.send(true).unwrap();

    tokio::time::timeout(Duration::from_secs(10), handle)
        .await
        .expect("scheduler should stop")
        .unwrap();
    assert_eq!(reporter.reports().len(), 1);
}

#[tokio::test]
async fn wake_before_a_cycle_does_not_shorten_the_interval() {
    let root = tempfile::tempdir().unwrap();
    let reporter = RecordingReporter::default();
    let built = Harness {
        reporter: reporter.clone(),
        ..Harness::default()
    }
    .build();
    let scheduler = scheduler(
        built.orchestrator,
        Arc::new(ManualCreditSource::default()),
        &root,
    );
    let waker = scheduler.waker();
    waker.wake();
    waker.wake();
    let (tx, rx) = shutdown::channel();

    let handle = tokio::spawn(scheduler.run(rx));
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while reporter.reports().is_empty() {
        assert!(tokio::time::Instant::now() < deadline, "no cycle ran");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(reporter.reports().len(), 1, "second cycle ran inside a 3h interval");

    tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(10), handle)
        .await
        .expect("scheduler should stop")
        .unwrap();
}

#[tokio::test]
async fn wake_during_sleep_runs_the_next_tick_early() {
    let root = tempfile::tempdir().unwrap();
    let reporter = RecordingReporter::default();
    let built = Harness {
        reporter: reporter.clone(),
        ..Harness::default()
    }
    .build();
    let scheduler = scheduler(
        built.orchestrator,
        Arc::new(ManualCreditSource::default()),
        &root,
    );
    let waker = scheduler.waker();
    let (tx, rx) = shutdown::channel();

    let handle = tokio::spawn(scheduler.run(rx));
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while reporter.reports().len() < 2 {
        assert!(tokio::time::Instant::now() < deadline, "wake did not cut the sleep");
        if !reporter.reports().is_empty() {
            waker.wake();
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(10), handle)
        .await
        .expect("scheduler should stop")
        .unwrap();
}
