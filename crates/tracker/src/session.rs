//! Tracking session lifecycle.
//!
//! [`TrackingSession::submit`] creates the generation job, then spawns
//! the session task that owns the [`Reconciler`] plus a poll-loop child
//! task.  Candidate snapshots from every source fan into one mpsc
//! channel; the merged view is published on a watch channel and the
//! one-shot ready signal fires on the completed transition.  All child
//! tasks hang off one [`CancellationToken`], cancelled on terminal
//! transition or when the handle is dropped, so nothing mutates state
//! after teardown has begun.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use propgen_backend::SubmissionError;
use propgen_core::proposal::ProposalSnapshot;
use propgen_core::request::GenerateRequest;
use propgen_core::ProposalId;
use propgen_push::PushListener;

use crate::poll::{run_poll_loop, PollConfig};
use crate::reconcile::{Reconciler, TrackerState};
use crate::source::ProposalSource;

/// Capacity of the snapshot fan-in channel.
const UPDATE_CHANNEL_CAPACITY: usize = 32;

/// Entry point for tracking one proposal-generation job.
pub struct TrackingSession;

impl TrackingSession {
    /// Submit a brief and start tracking the resulting job.
    ///
    /// On submission failure the error surfaces to the caller and no
    /// tracking is started -- the session never leaves the idle state.
    /// On success the job is tracked until terminal status or teardown.
    pub async fn submit<S: ProposalSource>(
        source: Arc<S>,
        request: &GenerateRequest,
        poll: PollConfig,
    ) -> Result<SessionHandle, SubmissionError> {
        let initial = source.submit(request).await?;
        Ok(Self::track(source, initial, poll))
    }

    /// Track an already-created job from its submission snapshot.
    pub fn track<S: ProposalSource>(
        source: Arc<S>,
        initial: ProposalSnapshot,
        poll: PollConfig,
    ) -> SessionHandle {
        let proposal_id = initial.id;
        let mut reconciler = Reconciler::new(initial);

        let (state_tx, state_rx) = watch::channel(reconciler.state().clone());
        let (ready_tx, ready_rx) = oneshot::channel();
        let (update_tx, update_rx) = mpsc::channel(UPDATE_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();

        let mut ready_tx = Some(ready_tx);

        // The backend may finish synchronously; then there is nothing to
        // feed and the ready signal fires immediately.
        if reconciler.take_ready() {
            if let Some(tx) = ready_tx.take() {
                let _ = tx.send(proposal_id);
            }
        }

        let task = if reconciler.state().is_terminal() {
            tracing::info!(proposal_id, "Job was terminal at submission");
            None
        } else {
            tokio::spawn(run_poll_loop(
                source,
                proposal_id,
                poll,
                update_tx.clone(),
                cancel.child_token(),
            ));

            Some(tokio::spawn(run_session(
                reconciler,
                update_rx,
                state_tx,
                ready_tx,
                cancel.clone(),
            )))
        };

        SessionHandle {
            proposal_id,
            state_rx,
            ready_rx: Some(ready_rx),
            update_tx,
            cancel,
            task,
        }
    }
}

/// Drive the reconciler until terminal status or cancellation.
async fn run_session(
    mut reconciler: Reconciler,
    mut update_rx: mpsc::Receiver<ProposalSnapshot>,
    state_tx: watch::Sender<TrackerState>,
    mut ready_tx: Option<oneshot::Sender<ProposalId>>,
    cancel: CancellationToken,
) {
    let proposal_id = reconciler.tracked_id();

    loop {
        let snapshot = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(proposal_id, "Tracking session torn down");
                return;
            }
            maybe = update_rx.recv() => match maybe {
                Some(snapshot) => snapshot,
                None => return,
            },
        };

        let applied = reconciler.apply(snapshot);
        if applied.changed {
            let _ = state_tx.send(reconciler.state().clone());
        }
        if reconciler.take_ready() {
            if let Some(tx) = ready_tx.take() {
                let _ = tx.send(proposal_id);
            }
        }

        if applied.terminal {
            // Stop the feeders first: no poll fetch may be issued after
            // the terminal transition.
            cancel.cancel();

            // Candidates already queued in this tick window (a poll
            // response racing the push event) may still fill empty
            // fields; transitions stay absorbed by the reconciler.
            while let Ok(late) = update_rx.try_recv() {
                if reconciler.apply(late).changed {
                    let _ = state_tx.send(reconciler.state().clone());
                }
            }

            tracing::info!(
                proposal_id,
                state = reconciler.state().progress_label(),
                "Tracking session reached terminal state",
            );
            return;
        }
    }
}

/// Caller-facing handle for one tracking session.
///
/// Dropping the handle tears the session down: the poll loop and any
/// attached push listener are cancelled before any further state
/// mutation is attempted.
pub struct SessionHandle {
    proposal_id: ProposalId,
    state_rx: watch::Receiver<TrackerState>,
    ready_rx: Option<oneshot::Receiver<ProposalId>>,
    update_tx: mpsc::Sender<ProposalSnapshot>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SessionHandle {
    /// Id of the tracked job.
    pub fn proposal_id(&self) -> ProposalId {
        self.proposal_id
    }

    /// The state to display right now.
    pub fn current_state(&self) -> TrackerState {
        self.state_rx.borrow().clone()
    }

    /// Watch receiver for state changes.
    pub fn state_watch(&self) -> watch::Receiver<TrackerState> {
        self.state_rx.clone()
    }

    /// Sender on which additional update sources submit candidate
    /// snapshots (the push listener uses this; so do tests).
    pub fn update_sender(&self) -> mpsc::Sender<ProposalSnapshot> {
        self.update_tx.clone()
    }

    /// Spawn a push listener feeding this session.
    ///
    /// The listener subscribes to the user's private channel and is torn
    /// down with the session.  Its failures degrade silently; the poll
    /// loop keeps the session converging.
    pub fn attach_push(&self, listener: PushListener, user_id: i64, token: impl Into<String>) {
        let tx = self.update_tx.clone();
        let cancel = self.cancel.child_token();
        let proposal_id = self.proposal_id;
        let token = token.into();
        tokio::spawn(async move {
            listener.run(user_id, proposal_id, &token, tx, cancel).await;
        });
    }

    /// Resolve when the job completes.
    ///
    /// Returns the proposal id to navigate to, exactly once.  Returns
    /// `None` if the job failed, the session was torn down first, or
    /// the signal was already consumed.
    pub async fn ready(&mut self) -> Option<ProposalId> {
        match self.ready_rx.take() {
            Some(rx) => rx.await.ok(),
            None => None,
        }
    }

    /// Tear the session down and wait for the session task to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
