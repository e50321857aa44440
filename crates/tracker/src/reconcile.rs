//! The job state reconciler.
//!
//! Single source of truth for "what should the UI show right now" for
//! one tracked job.  Candidate snapshots arrive from the push listener
//! and the poll loop in no guaranteed relative order; the reconciler
//! applies the monotonic merge from [`propgen_core::merge`] and decides
//! the terminal transition exactly once.

use propgen_core::merge::{merge_snapshot, ProgressStage};
use propgen_core::proposal::ProposalSnapshot;
use propgen_core::status::JobStatus;
use propgen_core::ProposalId;

/// Observable state of one tracking session.
#[derive(Debug, Clone)]
pub enum TrackerState {
    /// No job tracked.
    Idle,
    /// Submission request in flight.
    Submitting,
    /// Job id known, status non-terminal.
    Tracking(ProposalSnapshot),
    /// Terminal: generation finished, content available.
    Completed(ProposalSnapshot),
    /// Terminal: the backend reported the job failed.  This is an
    /// expected outcome, distinct from any transport error.
    Failed(ProposalSnapshot),
}

impl TrackerState {
    /// The current snapshot, if a job is being (or was) tracked.
    pub fn snapshot(&self) -> Option<&ProposalSnapshot> {
        match self {
            Self::Idle | Self::Submitting => None,
            Self::Tracking(s) | Self::Completed(s) | Self::Failed(s) => Some(s),
        }
    }

    /// Whether no further updates will be accepted.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Failed(_))
    }

    /// Progress message for the in-flight phases.
    pub fn progress_label(&self) -> &'static str {
        match self {
            Self::Idle | Self::Submitting => ProgressStage::Starting.label(),
            Self::Tracking(s) => ProgressStage::of(s).label(),
            Self::Completed(_) => "Completed",
            Self::Failed(_) => "Failed",
        }
    }
}

/// Result of applying one candidate snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Applied {
    /// The displayed state changed.
    pub changed: bool,
    /// The state became terminal on this application.
    pub terminal: bool,
}

/// Merges candidate snapshots into one monotonic view of a job.
///
/// Owns the snapshot exclusively for the tracking session; update
/// sources never mutate it directly.  Terminal states are absorbing,
/// and the ready signal is handed out exactly once via
/// [`take_ready`](Reconciler::take_ready).
pub struct Reconciler {
    tracked_id: ProposalId,
    state: TrackerState,
    ready_taken: bool,
}

impl Reconciler {
    /// Start reconciling from the submission response.
    ///
    /// A snapshot that is already terminal (the backend finished
    /// synchronously) lands directly in the terminal state.
    pub fn new(initial: ProposalSnapshot) -> Self {
        let tracked_id = initial.id;
        let state = Self::classify(initial);
        Self {
            tracked_id,
            state,
            ready_taken: false,
        }
    }

    /// The job id this reconciler accepts updates for.
    pub fn tracked_id(&self) -> ProposalId {
        self.tracked_id
    }

    pub fn state(&self) -> &TrackerState {
        &self.state
    }

    /// Apply one candidate snapshot from either update source.
    ///
    /// Updates for a different job id are ignored -- the push listener
    /// already filters on job id, but multiple jobs could theoretically
    /// be in flight, so the check is repeated here.
    pub fn apply(&mut self, incoming: ProposalSnapshot) -> Applied {
        if incoming.id != self.tracked_id {
            tracing::debug!(
                got = incoming.id,
                tracked = self.tracked_id,
                "Reconciler ignoring snapshot for a different job",
            );
            return Applied {
                changed: false,
                terminal: false,
            };
        }

        // Terminal states are absorbing for *transitions*: a late
        // snapshot may still fill fields that were empty (a poll issued
        // before completion can resolve after it, carrying e.g. the
        // scope), but the status never leaves the terminal state and
        // Tracking is never re-entered.
        let was_terminal = self.state.is_terminal();
        let current = match &mut self.state {
            TrackerState::Tracking(s)
            | TrackerState::Completed(s)
            | TrackerState::Failed(s) => s,
            TrackerState::Idle | TrackerState::Submitting => {
                return Applied {
                    changed: false,
                    terminal: false,
                }
            }
        };

        let changed = merge_snapshot(current, &incoming);

        if !was_terminal && current.status.is_terminal() {
            let snapshot = current.clone();
            self.state = Self::classify(snapshot);
            return Applied {
                changed: true,
                terminal: true,
            };
        }

        Applied {
            changed,
            terminal: false,
        }
    }

    /// One-shot ready signal for the `Completed` transition.
    ///
    /// Returns `true` the first time it is called with the state
    /// completed, then never again -- even if several sources reported
    /// completion concurrently.
    pub fn take_ready(&mut self) -> bool {
        if self.ready_taken {
            return false;
        }
        if matches!(self.state, TrackerState::Completed(_)) {
            self.ready_taken = true;
            return true;
        }
        false
    }

    fn classify(snapshot: ProposalSnapshot) -> TrackerState {
        match snapshot.status {
            JobStatus::Completed => TrackerState::Completed(snapshot),
            JobStatus::Failed => TrackerState::Failed(snapshot),
            JobStatus::Pending | JobStatus::Processing => TrackerState::Tracking(snapshot),
        }
    }
}
