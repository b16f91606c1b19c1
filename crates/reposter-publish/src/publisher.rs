//! Two-phase publish: create container, poll until ready, finalize.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reposter_core::shutdown::cancellable;
use reposter_core::{Caption, PublishResult, PublishSettings, ShutdownRx};

use crate::clock::{Clock, TokioClock};
use crate::error::PublishError;
use crate::graph::GraphClient;
use crate::poll::{PollState, PollTracker};

#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish the video at `video_url` with `caption`. Never errors: failures
    /// are carried in the returned [`PublishResult`].
    async fn publish(
        &self,
        video_url: &str,
        caption: &Caption,
        shutdown: ShutdownRx,
    ) -> PublishResult;
}

pub struct GraphPublisher {
    graph: GraphClient,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
    max_wait: Duration,
}

impl GraphPublisher {
    /// # Errors
    ///
    /// Returns [`PublishError::Http`] if the HTTP client cannot be built.
    pub fn new(
        settings: &PublishSettings,
        user_id: &str,
        access_token: &str,
    ) -> Result<Self, PublishError> {
        Ok(Self::with_clock(
            GraphClient::new(settings, user_id, access_token)?,
            settings,
            Arc::new(TokioClock),
        ))
    }

    #[must_use]
    pub fn with_clock(
        graph: GraphClient,
        settings: &PublishSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            graph,
            clock,
            poll_interval: Duration::from_secs(settings.poll_interval_secs.max(1)),
            max_wait: Duration::from_secs(settings.max_wait_secs),
        }
    }

    async fn run(
        &self,
        video_url: &str,
        caption: &Caption,
        shutdown: &mut ShutdownRx,
    ) -> Result<String, PublishError> {
        tracing::info!(
            chars = caption.text.chars().count(),
            method = %caption.method,
            "publisher: creating container"
        );
        let create = self.graph.create_container(video_url, &caption.text);
        let container_id = cancellable(create, shutdown)
            .await
            .ok_or(PublishError::Cancelled)??;
        tracing::info!(container = %container_id, "publisher: container created");

        let mut tracker = PollTracker::new(self.poll_interval, self.max_wait, self.clock.now());
        loop {
            let checked = cancellable(self.graph.container_status(&container_id), shutdown)
                .await
                .ok_or(PublishError::Cancelled)?;
            let observed = match checked {
                Ok(status) => Some(status),
                Err(e) => {
                    tracing::warn!(
                        container = %container_id,
                        error = %e,
                        "publisher: status check failed"
                    );
                    None
                }
            };

            match tracker.observe(observed, self.clock.now()).clone() {
                PollState::Ready => break,
                PollState::Error(last_status) => {
                    return Err(PublishError::ContainerFailed {
                        container_id,
                        last_status,
                    });
                }
                PollState::TimedOut => return Err(self.timed_out(container_id, &tracker)),
                PollState::AwaitingStatus => {}
            }

            let Some(delay) = tracker.next_delay(self.clock.now()) else {
                return Err(self.timed_out(container_id, &tracker));
            };
            tracing::debug!(
                container = %container_id,
                status = %tracker.last_status(),
                delay_secs = delay.as_secs(),
                "publisher: container not ready"
            );
            cancellable(self.clock.sleep(delay), shutdown)
                .await
                .ok_or(PublishError::Cancelled)?;
        }

        tracing::info!(
            container = %container_id,
            checks = tracker.checks(),
            "publisher: container ready"
        );
        cancellable(self.graph.publish_container(&container_id), shutdown)
            .await
            .ok_or(PublishError::Cancelled)?
    }

    fn timed_out(&self, container_id: String, tracker: &PollTracker) -> PublishError {
        PublishError::TimedOut {
            container_id,
            last_status: tracker.last_status().clone(),
            waited_secs: tracker.elapsed(self.clock.now()).as_secs(),
        }
    }
}

#[async_trait]
impl Publisher for GraphPublisher {
    async fn publish(
        &self,
        video_url: &str,
        caption: &Caption,
        mut shutdown: ShutdownRx,
    ) -> PublishResult {
        let started = self.clock.now();
        let outcome = self.run(video_url, caption, &mut shutdown).await;
        let duration = self.clock.now().saturating_duration_since(started);
        match outcome {
            Ok(media_id) => {
                tracing::info!(media_id = %media_id, secs = duration.as_secs(), "publisher: published");
                PublishResult::published(media_id, duration)
            }
            Err(e) => {
                tracing::error!(error = %e, secs = duration.as_secs(), "publisher: publish failed");
                PublishResult::failed(e.to_string(), duration)
            }
        }
    }
}
