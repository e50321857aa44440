//! Generation request body and client-side validation policy.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Minimum brief length accepted for generation.
pub const MIN_BRIEF_CHARS: u64 = 50;

/// Output language of the generated proposal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Bahasa Indonesia (primary).
    #[default]
    Id,
    /// English (secondary).
    En,
}

/// Body of `POST /api/generate-proposal`.
///
/// The minimum-length policy on `brief` is the caller's responsibility:
/// validate before submitting, the submission client sends the request
/// as-is and lets the backend be the final authority.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct GenerateRequest {
    #[validate(length(min = 50, message = "Brief must be at least 50 characters."))]
    pub brief: String,

    /// Optional free-form notes from the freelancer, passed through to
    /// the generator alongside the client brief.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_brief: Option<String>,

    pub language: Language,
}

impl GenerateRequest {
    pub fn new(brief: impl Into<String>) -> Self {
        Self {
            brief: brief.into(),
            user_brief: None,
            language: Language::default(),
        }
    }

    pub fn with_user_brief(mut self, user_brief: impl Into<String>) -> Self {
        self.user_brief = Some(user_brief.into());
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }
}
