//! HTTP client for the proposal-generation backend.
//!
//! Wraps the backend REST API (job submission, proposal CRUD, PDF
//! export) using [`reqwest`], unwraps its response envelopes, and maps
//! validation failures into structured per-field errors.

pub mod client;
pub mod envelope;
pub mod error;

pub use client::BackendClient;
pub use error::SubmissionError;
