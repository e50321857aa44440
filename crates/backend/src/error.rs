//! Error types for backend API calls.

use std::collections::HashMap;

use serde::Deserialize;

/// HTTP status the backend uses for request validation failures.
pub const VALIDATION_STATUS: u16 = 422;

/// Errors from the backend REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend rejected the request body, with per-field messages.
    #[error("Validation failed: {message}")]
    Validation {
        /// Top-level message from the backend.
        message: String,
        /// Field name -> list of messages for that field.
        errors: HashMap<String, Vec<String>>,
    },

    /// The backend returned a non-2xx status other than validation.
    #[error("Backend API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The response body did not match the expected shape.
    #[error("Unexpected response shape: {0}")]
    Decode(String),
}

/// Validation error body shape: `{"message": "...", "errors": {"field": ["msg"]}}`.
#[derive(Debug, Deserialize)]
struct ValidationBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: HashMap<String, Vec<String>>,
}

impl SubmissionError {
    /// Build the error for a non-2xx response body.
    ///
    /// A `422` with a parseable error map becomes
    /// [`SubmissionError::Validation`]; everything else is a generic
    /// [`SubmissionError::Api`].
    pub fn from_status(status: u16, body: String) -> Self {
        if status == VALIDATION_STATUS {
            if let Ok(parsed) = serde_json::from_str::<ValidationBody>(&body) {
                if !parsed.errors.is_empty() {
                    return Self::Validation {
                        message: parsed.message,
                        errors: parsed.errors,
                    };
                }
            }
        }
        Self::Api { status, body }
    }

    /// Per-field validation messages, if this is a validation failure.
    pub fn field_errors(&self) -> Option<&HashMap<String, Vec<String>>> {
        match self {
            Self::Validation { errors, .. } => Some(errors),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unprocessable_with_error_map_is_validation() {
        let body = r#"{"message":"The brief field is invalid.","errors":{"brief":["Brief must be at least 50 characters."]}}"#;
        let err = SubmissionError::from_status(422, body.to_string());
        let fields = err.field_errors().unwrap();
        assert_eq!(
            fields["brief"],
            vec!["Brief must be at least 50 characters."]
        );
    }

    #[test]
    fn unprocessable_without_error_map_is_generic() {
        let err = SubmissionError::from_status(422, "not json".to_string());
        assert!(err.field_errors().is_none());
        assert!(matches!(err, SubmissionError::Api { status: 422, .. }));
    }

    #[test]
    fn server_error_is_generic() {
        let err = SubmissionError::from_status(500, "boom".to_string());
        match err {
            SubmissionError::Api { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("Expected Api, got {other:?}"),
        }
    }
}
