//! Poll fallback loop.
//!
//! Guarantees forward progress when the push channel never delivers:
//! while the tracked job is non-terminal, the job is re-fetched on a
//! fixed delay and every snapshot is fed to the reconciler channel.
//! The loop itself never decides termination -- the session cancels it
//! the moment the reconciler reports a terminal status, so no fetch is
//! issued after termination and ticks never overlap.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use propgen_core::proposal::ProposalSnapshot;
use propgen_core::ProposalId;

use crate::source::ProposalSource;

/// Tunable parameters for the poll fallback.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Fixed delay between the end of one fetch and the start of the next.
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
        }
    }
}

/// Run the poll loop until cancelled.
///
/// Each cycle sleeps the configured delay, fetches the job snapshot,
/// and forwards it on `tx`.  A failed fetch is logged and skipped --
/// transient network failure must not abort tracking, and there is no
/// retry cap: termination is driven solely by status (via cancellation)
/// or by external teardown.
pub async fn run_poll_loop<S: ProposalSource>(
    source: Arc<S>,
    proposal_id: ProposalId,
    config: PollConfig,
    tx: mpsc::Sender<ProposalSnapshot>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(proposal_id, "Poll loop cancelled");
                return;
            }
            _ = tokio::time::sleep(config.interval) => {}
        }

        let snapshot = tokio::select! {
            // Abandon an in-flight fetch on cancellation.
            _ = cancel.cancelled() => {
                tracing::debug!(proposal_id, "Poll loop cancelled mid-fetch");
                return;
            }
            result = source.fetch(proposal_id) => match result {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::warn!(
                        proposal_id,
                        error = %e,
                        "Poll fetch failed, will retry next tick",
                    );
                    continue;
                }
            },
        };

        // Cancellation may have fired while the fetch resolved; never
        // submit a candidate after teardown has begun.
        if cancel.is_cancelled() {
            return;
        }

        if tx.send(snapshot).await.is_err() {
            // Reconciler gone; the session has ended.
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use propgen_backend::SubmissionError;
    use propgen_core::request::GenerateRequest;
    use propgen_core::status::JobStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        fetches: AtomicUsize,
        fail: bool,
    }

    impl CountingSource {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                fetches: AtomicUsize::new(0),
                fail,
            })
        }
    }

    #[async_trait]
    impl ProposalSource for CountingSource {
        async fn submit(
            &self,
            _request: &GenerateRequest,
        ) -> Result<ProposalSnapshot, SubmissionError> {
            unreachable!("poll loop never submits");
        }

        async fn fetch(&self, id: ProposalId) -> Result<ProposalSnapshot, SubmissionError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(SubmissionError::Api {
                    status: 500,
                    body: "boom".into(),
                })
            } else {
                Ok(ProposalSnapshot::new(id, JobStatus::Processing))
            }
        }
    }

    fn fast() -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(10),
        }
    }

    #[tokio::test]
    async fn forwards_snapshots_on_each_tick() {
        let source = CountingSource::new(false);
        let (tx, mut rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run_poll_loop(
            Arc::clone(&source),
            5,
            fast(),
            tx,
            cancel.clone(),
        ));

        let first = rx.recv().await.unwrap();
        assert_eq!(first.id, 5);
        let second = rx.recv().await.unwrap();
        assert_eq!(second.status, JobStatus::Processing);

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn failed_fetch_is_skipped_and_loop_continues() {
        let source = CountingSource::new(true);
        let (tx, mut rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run_poll_loop(
            Arc::clone(&source),
            5,
            fast(),
            tx,
            cancel.clone(),
        ));

        // Give the loop a few ticks worth of time: every fetch fails,
        // nothing is forwarded, and the loop keeps running.
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(rx.try_recv().is_err());
        assert!(source.fetches.load(Ordering::SeqCst) >= 2);

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn no_fetch_after_cancellation() {
        let source = CountingSource::new(false);
        let (tx, _rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run_poll_loop(
            Arc::clone(&source),
            5,
            fast(),
            tx,
            cancel.clone(),
        ));

        tokio::time::sleep(Duration::from_millis(35)).await;
        cancel.cancel();
        task.await.unwrap();

        let frozen = source.fetches.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(source.fetches.load(Ordering::SeqCst), frozen);
    }

    #[tokio::test]
    async fn dropped_receiver_stops_the_loop() {
        let source = CountingSource::new(false);
        let (tx, rx) = mpsc::channel(16);
        drop(rx);

        let task = tokio::spawn(run_poll_loop(
            source,
            5,
            fast(),
            tx,
            CancellationToken::new(),
        ));

        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap();
    }
}
