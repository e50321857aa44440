//! Proposal records, progress snapshots, and the push-channel payload.
//!
//! The backend reports a job either as a full [`Proposal`] row (polling
//! and CRUD endpoints) or as a partial [`ProposalUpdate`] pushed over the
//! notification channel.  Both convert into a [`ProposalSnapshot`], the
//! shape the reconciler merges over.

use serde::{Deserialize, Serialize};

use crate::status::JobStatus;
use crate::{ProposalId, Timestamp};

/// Price and duration estimate computed mid-generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Estimation {
    /// Estimated project duration in days.
    pub duration_days: i64,
    /// Estimated price in the proposal's currency.
    pub price: f64,
}

/// A full proposal record as returned by `GET /api/proposals/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub brief: String,
    #[serde(default)]
    pub user_brief: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub scope: Vec<String>,
    #[serde(default)]
    pub duration_days: Option<i64>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    pub status: JobStatus,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
}

/// Partial view of one job's fields as reported by one update source.
///
/// Snapshots are lattice points: the reconciler only ever merges them
/// upward (see [`crate::merge::merge_snapshot`]), so a populated field is
/// never displayed as empty again for the same job id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalSnapshot {
    pub id: ProposalId,
    pub status: JobStatus,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub scope: Vec<String>,
    #[serde(default)]
    pub estimation: Option<Estimation>,
    #[serde(default)]
    pub content: Option<String>,
}

impl ProposalSnapshot {
    /// A freshly-submitted job: id and status only.
    pub fn new(id: ProposalId, status: JobStatus) -> Self {
        Self {
            id,
            status,
            summary: None,
            scope: Vec::new(),
            estimation: None,
            content: None,
        }
    }

    /// Terminal signal: the job finished and the proposal text arrived.
    pub fn is_complete(&self) -> bool {
        self.status == JobStatus::Completed && self.content.is_some()
    }
}

impl From<Proposal> for ProposalSnapshot {
    fn from(p: Proposal) -> Self {
        let estimation = match (p.duration_days, p.price) {
            (Some(duration_days), Some(price)) => Some(Estimation {
                duration_days,
                price,
            }),
            _ => None,
        };
        Self {
            id: p.id,
            status: p.status,
            summary: p.summary,
            scope: p.scope,
            estimation,
            content: p.content,
        }
    }
}

/// Payload of the `ProposalGenerated` push event.
#[derive(Debug, Clone, Deserialize)]
pub struct ProposalUpdate {
    pub proposal_id: ProposalId,
    pub status: JobStatus,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub scope: Vec<String>,
    #[serde(default)]
    pub estimation: Option<Estimation>,
    #[serde(default)]
    pub content: Option<String>,
}

impl From<ProposalUpdate> for ProposalSnapshot {
    fn from(u: ProposalUpdate) -> Self {
        Self {
            id: u.proposal_id,
            status: u.status,
            summary: u.summary,
            scope: u.scope,
            estimation: u.estimation,
            content: u.content,
        }
    }
}
