//! Seam between the tracker and the backend API.
//!
//! The poll loop and session logic talk to the backend through this
//! trait so tests can substitute scripted sources with call counters.

use async_trait::async_trait;

use propgen_backend::{BackendClient, SubmissionError};
use propgen_core::proposal::ProposalSnapshot;
use propgen_core::request::GenerateRequest;
use propgen_core::ProposalId;

/// Backend operations the tracker needs.
#[async_trait]
pub trait ProposalSource: Send + Sync + 'static {
    /// Create a generation job.  No polling or subscription side effects.
    async fn submit(&self, request: &GenerateRequest)
        -> Result<ProposalSnapshot, SubmissionError>;

    /// Fetch the current snapshot of a job.
    async fn fetch(&self, id: ProposalId) -> Result<ProposalSnapshot, SubmissionError>;
}

#[async_trait]
impl ProposalSource for BackendClient {
    async fn submit(
        &self,
        request: &GenerateRequest,
    ) -> Result<ProposalSnapshot, SubmissionError> {
        self.generate_proposal(request).await
    }

    async fn fetch(&self, id: ProposalId) -> Result<ProposalSnapshot, SubmissionError> {
        Ok(self.get_proposal(id).await?.into())
    }
}
