//! Job status vocabulary and forward-only ordering.
//!
//! The backend reports one of four statuses for a generation job.  Status
//! transitions only ever move forward along `pending -> processing ->
//! {completed|failed}`; a stale update source must never drag a job
//! backward, so merges consult [`JobStatus::rank`].

use serde::{Deserialize, Serialize};

/// Lifecycle status of a proposal-generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Queued, generation has not started.
    Pending,
    /// The backend is actively generating.
    Processing,
    /// Generation finished; full content is available.
    Completed,
    /// Generation failed. Terminal, but not a transport error.
    Failed,
}

impl JobStatus {
    /// Position along the forward-only lifecycle.
    ///
    /// Both terminal statuses share the top rank -- neither outranks the
    /// other, a job resolves to exactly one of them.
    pub fn rank(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Processing => 1,
            Self::Completed | Self::Failed => 2,
        }
    }

    /// Whether this status accepts no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Adopt `incoming` only if it moves the lifecycle forward.
    ///
    /// Returns the status that should be displayed after seeing
    /// `incoming`: the newer one if it advances, `self` otherwise.
    pub fn advance(self, incoming: JobStatus) -> JobStatus {
        if self.is_terminal() {
            return self;
        }
        if incoming.rank() > self.rank() {
            incoming
        } else {
            self
        }
    }

    /// Human-readable label for display in the UI.
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        }
    }
}
