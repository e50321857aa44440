//! REST client for the proposal backend.
//!
//! One [`BackendClient`] per authenticated user session.  Every call
//! carries the session's bearer token; bodies are JSON except the PDF
//! export, which returns raw bytes.

use propgen_core::proposal::{Proposal, ProposalSnapshot};
use propgen_core::request::GenerateRequest;
use propgen_core::ProposalId;

use crate::envelope;
use crate::error::SubmissionError;

/// HTTP client for the proposal backend API.
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl BackendClient {
    /// Create a client for a backend instance.
    ///
    /// * `base_url` - API base URL, e.g. `https://api.example.com`.
    /// * `token`    - Bearer credential from the auth layer.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    /// Create a client reusing an existing [`reqwest::Client`]
    /// (shares the connection pool with other API consumers).
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            token: token.into(),
        }
    }

    /// Submit a brief for proposal generation.
    ///
    /// Sends `POST /api/generate-proposal`.  Returns the created job's
    /// snapshot -- at minimum id and status; the remaining fields fill in
    /// asynchronously.  Does not start polling or subscribing; the caller
    /// wires a tracking session up with the returned id.
    pub async fn generate_proposal(
        &self,
        request: &GenerateRequest,
    ) -> Result<ProposalSnapshot, SubmissionError> {
        let response = self
            .client
            .post(format!("{}/api/generate-proposal", self.base_url))
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .await?;

        let value = Self::success_json(response).await?;
        let snapshot: ProposalSnapshot = envelope::decode(value)?;

        tracing::info!(
            proposal_id = snapshot.id,
            status = snapshot.status.label(),
            "Proposal generation job created",
        );

        Ok(snapshot)
    }

    /// Fetch the current snapshot of one proposal.
    ///
    /// Sends `GET /api/proposals/{id}`.  Used by the poll fallback loop.
    pub async fn get_proposal(&self, id: ProposalId) -> Result<Proposal, SubmissionError> {
        let response = self
            .client
            .get(format!("{}/api/proposals/{}", self.base_url, id))
            .bearer_auth(&self.token)
            .send()
            .await?;

        let value = Self::success_json(response).await?;
        envelope::decode_keyed(value, "proposal")
    }

    /// List all proposals belonging to the authenticated user.
    pub async fn list_proposals(&self) -> Result<Vec<Proposal>, SubmissionError> {
        let response = self
            .client
            .get(format!("{}/api/proposals", self.base_url))
            .bearer_auth(&self.token)
            .send()
            .await?;

        let value = Self::success_json(response).await?;
        envelope::decode_keyed(value, "proposals")
    }

    /// Replace the edited proposal text.
    ///
    /// Sends `PUT /api/proposals/{id}` with the new content.
    pub async fn update_proposal(
        &self,
        id: ProposalId,
        content: &str,
    ) -> Result<Proposal, SubmissionError> {
        let response = self
            .client
            .put(format!("{}/api/proposals/{}", self.base_url, id))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await?;

        let value = Self::success_json(response).await?;
        envelope::decode_keyed(value, "proposal")
    }

    /// Delete a proposal.
    pub async fn delete_proposal(&self, id: ProposalId) -> Result<(), SubmissionError> {
        let response = self
            .client
            .delete(format!("{}/api/proposals/{}", self.base_url, id))
            .bearer_auth(&self.token)
            .send()
            .await?;

        Self::ensure_success(response).await?;
        Ok(())
    }

    /// Export a completed proposal as PDF bytes.
    ///
    /// Sends `GET /api/proposals/{id}/pdf`.
    pub async fn download_pdf(&self, id: ProposalId) -> Result<Vec<u8>, SubmissionError> {
        let response = self
            .client
            .get(format!("{}/api/proposals/{}/pdf", self.base_url, id))
            .bearer_auth(&self.token)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code.  On failure, the
    /// status and body are turned into the structured error taxonomy
    /// (validation map vs generic API failure).
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, SubmissionError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(SubmissionError::from_status(status.as_u16(), body));
        }
        Ok(response)
    }

    /// Read a successful response body as JSON.
    async fn success_json(response: reqwest::Response) -> Result<serde_json::Value, SubmissionError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<serde_json::Value>().await?)
    }
}
