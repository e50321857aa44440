//! Behavioural tests for `TrackingSession`.
//!
//! These exercise the full session wiring -- submission, poll loop,
//! fan-in, reconciliation, teardown -- against scripted in-memory
//! sources, without any network.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use assert_matches::assert_matches;
use async_trait::async_trait;
use tokio::sync::mpsc::error::TrySendError;

use propgen_backend::SubmissionError;
use propgen_core::proposal::{Estimation, ProposalSnapshot};
use propgen_core::request::GenerateRequest;
use propgen_core::status::JobStatus;
use propgen_core::ProposalId;
use propgen_tracker::poll::PollConfig;
use propgen_tracker::{ProposalSource, TrackerState, TrackingSession};

// ---------------------------------------------------------------------------
// Scripted source
// ---------------------------------------------------------------------------

/// Source whose submit/fetch answers follow a fixed script.
///
/// `fetch` pops the next scripted snapshot; once the script runs dry it
/// keeps returning the last one.  Every fetch is counted.
struct ScriptedSource {
    submit_snapshot: ProposalSnapshot,
    script: Mutex<VecDeque<ProposalSnapshot>>,
    last: Mutex<ProposalSnapshot>,
    fetches: AtomicUsize,
}

impl ScriptedSource {
    fn new(
        submit_snapshot: ProposalSnapshot,
        script: Vec<ProposalSnapshot>,
    ) -> Arc<Self> {
        let last = script
            .last()
            .cloned()
            .unwrap_or_else(|| submit_snapshot.clone());
        Arc::new(Self {
            submit_snapshot,
            script: Mutex::new(script.into()),
            last: Mutex::new(last),
            fetches: AtomicUsize::new(0),
        })
    }

    fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProposalSource for ScriptedSource {
    async fn submit(
        &self,
        _request: &GenerateRequest,
    ) -> Result<ProposalSnapshot, SubmissionError> {
        Ok(self.submit_snapshot.clone())
    }

    async fn fetch(&self, _id: ProposalId) -> Result<ProposalSnapshot, SubmissionError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().unwrap().pop_front() {
            Some(snapshot) => {
                *self.last.lock().unwrap() = snapshot.clone();
                Ok(snapshot)
            }
            None => Ok(self.last.lock().unwrap().clone()),
        }
    }
}

/// Source that rejects every submission with a validation error.
struct RejectingSource {
    fetches: AtomicUsize,
}

#[async_trait]
impl ProposalSource for RejectingSource {
    async fn submit(
        &self,
        _request: &GenerateRequest,
    ) -> Result<ProposalSnapshot, SubmissionError> {
        let body = r#"{"message":"The given data was invalid.","errors":{"brief":["too short"]}}"#;
        Err(SubmissionError::from_status(422, body.to_string()))
    }

    async fn fetch(&self, _id: ProposalId) -> Result<ProposalSnapshot, SubmissionError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        panic!("fetch must never be called when submission failed");
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn snap(id: i64, status: JobStatus) -> ProposalSnapshot {
    ProposalSnapshot::new(id, status)
}

fn completed(id: i64, content: &str) -> ProposalSnapshot {
    let mut s = snap(id, JobStatus::Completed);
    s.content = Some(content.into());
    s
}

fn request() -> GenerateRequest {
    GenerateRequest::new("b".repeat(60))
}

fn fast_poll() -> PollConfig {
    PollConfig {
        interval: Duration::from_millis(10),
    }
}

/// Poll interval long enough that polling never fires within a test.
fn idle_poll() -> PollConfig {
    PollConfig {
        interval: Duration::from_secs(3600),
    }
}

// ---------------------------------------------------------------------------
// Test: session converges to Completed via polling alone
// ---------------------------------------------------------------------------

#[tokio::test]
async fn converges_via_polling_alone() {
    let mut with_summary = snap(7, JobStatus::Processing);
    with_summary.summary = Some("A web shop".into());

    let source = ScriptedSource::new(
        snap(7, JobStatus::Pending),
        vec![
            snap(7, JobStatus::Processing),
            with_summary,
            completed(7, "Dear client..."),
        ],
    );

    let mut handle = TrackingSession::submit(Arc::clone(&source), &request(), fast_poll())
        .await
        .unwrap();

    assert_eq!(handle.ready().await, Some(7));

    match handle.current_state() {
        TrackerState::Completed(s) => {
            assert_eq!(s.summary.as_deref(), Some("A web shop"));
            assert_eq!(s.content.as_deref(), Some("Dear client..."));
            assert!(s.is_complete());
        }
        other => panic!("Expected Completed, got {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// Test: no poll fetch is issued after the terminal transition
// ---------------------------------------------------------------------------

#[tokio::test]
async fn poll_ceases_on_terminal_state() {
    let source = ScriptedSource::new(
        snap(3, JobStatus::Pending),
        vec![snap(3, JobStatus::Processing), completed(3, "X")],
    );

    let mut handle = TrackingSession::submit(Arc::clone(&source), &request(), fast_poll())
        .await
        .unwrap();

    assert_eq!(handle.ready().await, Some(3));

    // Allow any in-flight tick to settle, then the count must freeze.
    tokio::time::sleep(Duration::from_millis(30)).await;
    let frozen = source.fetch_count();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(source.fetch_count(), frozen);
}

// ---------------------------------------------------------------------------
// Test: teardown stops polling and forbids further mutation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn teardown_stops_polling_and_mutation() {
    // Never reaches a terminal status on its own.
    let source = ScriptedSource::new(snap(5, JobStatus::Pending), vec![]);

    let handle = TrackingSession::submit(Arc::clone(&source), &request(), fast_poll())
        .await
        .unwrap();

    let watch = handle.state_watch();
    let injector = handle.update_sender();

    tokio::time::sleep(Duration::from_millis(35)).await;
    handle.shutdown().await;

    // Polling stops.
    let frozen = source.fetch_count();
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(source.fetch_count(), frozen);

    // A delayed push update can no longer mutate state: the session's
    // receiver is gone and the published state stays non-terminal.
    let late = completed(5, "too late");
    assert_matches!(injector.try_send(late), Err(TrySendError::Closed(_)));
    assert!(!watch.borrow().is_terminal());
}

// ---------------------------------------------------------------------------
// Test: validation failure surfaces the field map, no tracking starts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn validation_error_surfaces_without_tracking() {
    let source = Arc::new(RejectingSource {
        fetches: AtomicUsize::new(0),
    });

    let result = TrackingSession::submit(Arc::clone(&source), &request(), fast_poll()).await;

    let err = result.err().expect("submission must fail");
    let fields = err.field_errors().expect("validation error expected");
    assert_eq!(fields["brief"], vec!["too short"]);

    // No job id was assigned, no poll loop ever ran.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
}

// ---------------------------------------------------------------------------
// Test: a failed job is terminal and never fires the ready signal
// ---------------------------------------------------------------------------

#[tokio::test]
async fn failed_job_is_terminal_without_ready() {
    let source = ScriptedSource::new(
        snap(9, JobStatus::Processing),
        vec![snap(9, JobStatus::Failed)],
    );

    let mut handle = TrackingSession::submit(Arc::clone(&source), &request(), fast_poll())
        .await
        .unwrap();

    // The ready signal never fires for a failed job.
    assert_eq!(handle.ready().await, None);
    assert_matches!(handle.current_state(), TrackerState::Failed(_));
}

// ---------------------------------------------------------------------------
// Test: push updates drive the session when polling is silent
// ---------------------------------------------------------------------------

#[tokio::test]
async fn push_updates_drive_session_without_polling() {
    let source = ScriptedSource::new(snap(11, JobStatus::Pending), vec![]);

    let mut handle = TrackingSession::submit(Arc::clone(&source), &request(), idle_poll())
        .await
        .unwrap();
    let push = handle.update_sender();

    let mut progress = snap(11, JobStatus::Processing);
    progress.scope = vec!["Design".into(), "Build".into()];
    progress.estimation = Some(Estimation {
        duration_days: 21,
        price: 9_000_000.0,
    });
    push.send(progress).await.unwrap();
    push.send(completed(11, "Final text")).await.unwrap();

    assert_eq!(handle.ready().await, Some(11));

    match handle.current_state() {
        TrackerState::Completed(s) => {
            assert_eq!(s.scope.len(), 2);
            assert_eq!(s.content.as_deref(), Some("Final text"));
        }
        other => panic!("Expected Completed, got {other:?}"),
    }
    assert_eq!(source.fetch_count(), 0);
}

// ---------------------------------------------------------------------------
// Test: duplicate completion reports fire the ready signal once
// ---------------------------------------------------------------------------

#[tokio::test]
async fn duplicate_completion_fires_ready_once() {
    let source = ScriptedSource::new(snap(13, JobStatus::Processing), vec![]);

    let mut handle = TrackingSession::submit(Arc::clone(&source), &request(), idle_poll())
        .await
        .unwrap();
    let push = handle.update_sender();

    // Both "sources" report completion in the same tick window.
    push.send(completed(13, "X")).await.unwrap();
    push.send(completed(13, "X")).await.unwrap();

    assert_eq!(handle.ready().await, Some(13));
    // The signal is one-shot; asking again yields nothing.
    assert_eq!(handle.ready().await, None);
}

// ---------------------------------------------------------------------------
// Test: stale poll response queued behind the push completion still
// fills empty fields, and the state stays Completed
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stale_update_in_terminal_window_fills_fields() {
    let source = ScriptedSource::new(snap(17, JobStatus::Processing), vec![]);

    let mut handle = TrackingSession::submit(Arc::clone(&source), &request(), idle_poll())
        .await
        .unwrap();
    let push = handle.update_sender();

    // Completion arrives first; the stale snapshot (issued earlier,
    // resolving later) is already queued right behind it.
    push.send(completed(17, "X")).await.unwrap();
    let mut stale = snap(17, JobStatus::Processing);
    stale.scope = vec!["Discovery".into()];
    push.send(stale).await.unwrap();

    assert_eq!(handle.ready().await, Some(17));

    let watch = handle.state_watch();
    handle.shutdown().await;

    match watch.borrow().clone() {
        TrackerState::Completed(s) => {
            assert_eq!(s.content.as_deref(), Some("X"));
            assert_eq!(s.scope, vec!["Discovery"]);
        }
        other => panic!("Expected Completed, got {other:?}"),
    };
}

// ---------------------------------------------------------------------------
// Test: a synchronously-completed submission is ready immediately
// ---------------------------------------------------------------------------

#[tokio::test]
async fn synchronously_completed_submission_is_ready_immediately() {
    let source = ScriptedSource::new(completed(21, "instant"), vec![]);

    let mut handle = TrackingSession::submit(Arc::clone(&source), &request(), fast_poll())
        .await
        .unwrap();

    assert_eq!(handle.ready().await, Some(21));
    assert_matches!(handle.current_state(), TrackerState::Completed(_));

    // No poll loop was ever started for a job born terminal.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(source.fetch_count(), 0);
}
