//! Failed-release listener
//!
//! Turns release status notifications into recovery runs:
//! - only releases reported as `FAILED` are considered
//! - an id seen within the dedup window is dropped
//! - accepted ids are queued and handled one at a time by a single worker
//! - on shutdown the queue is closed and already accepted ids are still
//!   handled, within a grace period

use crate::config::ListenerSettings;
use moka::future::Cache;
use ofh_core::{FailureRecoveryProcedure, RecoveryRequest};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Release status as reported in notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReleaseStatus {
    Template,
    Planned,
    InProgress,
    Paused,
    Failing,
    Failed,
    Completed,
    Aborted,
    #[serde(other)]
    Unknown,
}

/// A release status change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseEvent {
    pub id: String,
    pub status: ReleaseStatus,
}

impl ReleaseEvent {
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>, status: ReleaseStatus) -> Self {
        Self {
            id: id.into(),
            status,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.status == ReleaseStatus::Failed
    }
}

/// Handle feeding failed releases to the recovery worker
///
/// Clones share the dedup window and the queue. The worker stops once the
/// queue is closed, either by [`ListenerWorker::finish`] or by dropping
/// every handle, and everything already queued is handled.
#[derive(Debug, Clone)]
pub struct FailureListener {
    seen: Cache<String, ()>,
    queue: mpsc::Sender<String>,
}

impl FailureListener {
    /// Create listener and spawn its worker on the current runtime
    #[must_use]
    pub fn spawn(
        procedure: FailureRecoveryProcedure,
        settings: &ListenerSettings,
    ) -> (Self, ListenerWorker) {
        let (queue, rx) = mpsc::channel(settings.queue_depth.max(1));
        let (stop, stop_rx) = oneshot::channel();
        let seen = Cache::builder()
            .max_capacity(settings.dedup_capacity)
            .time_to_live(settings.dedup_ttl())
            .build();
        let handle = tokio::spawn(drain(procedure, settings.user.clone(), rx, stop_rx));
        let worker = ListenerWorker {
            handle,
            stop: Some(stop),
        };
        (Self { seen, queue }, worker)
    }

    /// Submit the failed releases among `events`
    ///
    /// Returns how many were queued.
    pub async fn observe(&self, events: &[ReleaseEvent]) -> usize {
        let mut accepted = 0;
        for event in events {
            if !event.is_failure() {
                continue;
            }

            let entry = self.seen.entry(event.id.clone()).or_insert(()).await;
            if !entry.is_fresh() {
                info!(release_id = %event.id, "Release failure already being handled, ignoring");
                continue;
            }

            debug!(release_id = %event.id, "Queueing failed release");
            if self.queue.send(event.id.clone()).await.is_err() {
                warn!(release_id = %event.id, "Recovery worker has stopped, dropping release");
                continue;
            }
            accepted += 1;
        }
        accepted
    }
}

/// The spawned recovery worker
///
/// Dropping it without [`finish`](Self::finish) also closes the queue, but
/// leaves the in-flight run to the runtime.
#[derive(Debug)]
pub struct ListenerWorker {
    handle: JoinHandle<()>,
    stop: Option<oneshot::Sender<()>>,
}

impl ListenerWorker {
    /// Stop accepting releases and wait for the queued ones
    ///
    /// Returns `false` when `grace` elapsed first; the worker is then
    /// aborted and the run in progress may be left incomplete.
    pub async fn finish(mut self, grace: Duration) -> bool {
        if let Some(stop) = self.stop.take() {
            // the worker may already be gone
            let _ = stop.send(());
        }
        match tokio::time::timeout(grace, &mut self.handle).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                error!("Recovery worker ended abnormally: {e}");
                false
            }
            Err(_) => {
                warn!(
                    grace_secs = grace.as_secs(),
                    "Recovery worker did not finish in time, aborting"
                );
                self.handle.abort();
                false
            }
        }
    }
}

async fn drain(
    procedure: FailureRecoveryProcedure,
    user: String,
    mut queue: mpsc::Receiver<String>,
    mut stop: oneshot::Receiver<()>,
) {
    let mut stopping = false;
    loop {
        let next = if stopping {
            queue.recv().await
        } else {
            tokio::select! {
                next = queue.recv() => next,
                _ = &mut stop => {
                    debug!("Recovery worker closing queue");
                    queue.close();
                    stopping = true;
                    continue;
                }
            }
        };
        let Some(release_id) = next else {
            break;
        };
        let request = RecoveryRequest::new(&release_id, &user);
        match procedure.run(&request).await {
            Ok(outcome) => debug!(
                release_id = %release_id,
                recovered = outcome.is_recovered(),
                "Failure handling finished"
            ),
            Err(e) => error!(
                release_id = %release_id,
                step = %e.step(),
                partial = e.is_partial(),
                "Failure handling failed: {e}"
            ),
        }
    }
    debug!("Recovery worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_notification() {
        let event: ReleaseEvent =
            serde_json::from_str(r#"{"id":"Applications/Rel1","status":"FAILED"}"#).unwrap();
        assert!(event.is_failure());

        let event: ReleaseEvent =
            serde_json::from_str(r#"{"id":"Applications/Rel1","status":"SOMETHING_NEW"}"#)
                .unwrap();
        assert_eq!(event.status, ReleaseStatus::Unknown);
        assert!(!event.is_failure());
    }

    #[test]
    fn failing_is_not_failed() {
        assert!(!ReleaseEvent::new("r", ReleaseStatus::Failing).is_failure());
    }
}
