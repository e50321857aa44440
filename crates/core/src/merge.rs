//! Monotonic snapshot merge.
//!
//! Push and poll race each other, so snapshots can arrive stale,
//! duplicated, or out of order across the two sources.  Last-write-wins
//! is wrong for this data: a poll response issued before a push event can
//! resolve after it and would wipe fields the push already delivered.
//! Instead each field is merged upward -- non-empty beats empty, status
//! only advances -- making the displayed job a join over everything seen
//! so far.

use crate::proposal::ProposalSnapshot;

/// Merge an incoming snapshot into the current one, field by field.
///
/// Returns `true` if anything changed.  Both snapshots must belong to the
/// same job id; callers (the reconciler) filter mismatched ids first.
pub fn merge_snapshot(current: &mut ProposalSnapshot, incoming: &ProposalSnapshot) -> bool {
    debug_assert_eq!(current.id, incoming.id);

    let mut changed = false;

    let next_status = current.status.advance(incoming.status);
    if next_status != current.status {
        current.status = next_status;
        changed = true;
    }

    if current.summary.is_none() && incoming.summary.is_some() {
        current.summary = incoming.summary.clone();
        changed = true;
    }

    // Scope grows or is replaced wholesale, never partially retracted:
    // adopt the incoming list only when it is strictly larger.
    if incoming.scope.len() > current.scope.len() {
        current.scope = incoming.scope.clone();
        changed = true;
    }

    if current.estimation.is_none() && incoming.estimation.is_some() {
        current.estimation = incoming.estimation;
        changed = true;
    }

    if current.content.is_none() && incoming.content.is_some() {
        current.content = incoming.content.clone();
        changed = true;
    }

    changed
}

/// How far generation has progressed, derived from field completeness.
///
/// The backend populates fields in a fixed order (summary, then scope,
/// then estimation, then content); the stage drives the progress label
/// shown while a job is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStage {
    /// Job accepted, nothing produced yet.
    Starting,
    /// Summary pending: the brief is being analyzed.
    Analyzing,
    /// Scope items are being determined.
    Scoping,
    /// Price and duration are being estimated.
    Estimating,
    /// The proposal text is being written.
    Drafting,
    /// All fields present, waiting for the terminal status.
    Finalizing,
}

impl ProgressStage {
    /// Derive the stage from the first missing field, in backend order.
    pub fn of(snapshot: &ProposalSnapshot) -> Self {
        if snapshot.summary.is_none() {
            Self::Analyzing
        } else if snapshot.scope.is_empty() {
            Self::Scoping
        } else if snapshot.estimation.is_none() {
            Self::Estimating
        } else if snapshot.content.is_none() {
            Self::Drafting
        } else {
            Self::Finalizing
        }
    }

    /// Progress message shown while the job is in flight.
    pub fn label(self) -> &'static str {
        match self {
            Self::Starting => "Starting...",
            Self::Analyzing => "Analyzing project brief...",
            Self::Scoping => "Determining scope of work...",
            Self::Estimating => "Calculating cost and duration estimate...",
            Self::Drafting => "Writing proposal draft...",
            Self::Finalizing => "Finalizing...",
        }
    }
}
