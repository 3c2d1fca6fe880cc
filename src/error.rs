//! Error types for the screening service
//!
//! Every failure that reaches the HTTP boundary is a [`ScreeningError`]. Each
//! variant maps to one status code and to the `{"detail": ...}` envelope.

use crate::config::ConfigError;
use crate::screening::pipeline::PipelineError;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::{PoisonError, RwLock};
use thiserror::Error;
use warp::http::StatusCode;

const REDACTED: &str = "***";

/// Credential values registered at startup, scrubbed from client-facing detail
static REGISTERED_SECRETS: Lazy<RwLock<Vec<String>>> = Lazy::new(|| RwLock::new(Vec::new()));

/// Main error type for screening operations
#[derive(Debug, Error)]
pub enum ScreeningError {
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Malformed request body: {message}")]
    MalformedBody { message: String },

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Request body exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: u64 },

    #[error("Internal error: {message}")]
    InternalError { message: String },
}

/// Error envelope returned to HTTP clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

impl ScreeningError {
    /// Create schema validation error
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create malformed body error
    pub fn malformed_body<S: Into<String>>(message: S) -> Self {
        Self::MalformedBody {
            message: message.into(),
        }
    }

    /// Create body size error
    pub fn payload_too_large(limit: u64) -> Self {
        Self::PayloadTooLarge { limit }
    }

    /// Create internal error
    pub fn internal_error<S: Into<String>>(message: S) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }

    /// Whether the failure happened before any downstream work
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput { .. } | Self::MalformedBody { .. } | Self::PayloadTooLarge { .. }
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedBody { .. } => StatusCode::BAD_REQUEST,
            Self::InvalidInput { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Pipeline(_) | Self::Config(_) | Self::InternalError { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Build the client-facing envelope
    ///
    /// Pipeline failures carry the raised error's own message, whatever its
    /// length; schema failures keep their prefix so clients can tell what was
    /// wrong with the body. Only registered credential values are altered.
    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse {
            detail: redact_secrets(&self.to_string()),
        }
    }
}

/// Register a credential (e.g. the provider API key) to keep out of responses
pub fn register_secret(value: &str) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }

    let mut secrets = REGISTERED_SECRETS
        .write()
        .unwrap_or_else(PoisonError::into_inner);
    if !secrets.iter().any(|known| known == value) {
        secrets.push(value.to_string());
    }
}

/// Replace every registered credential value in `message` with `***`
pub fn redact_secrets(message: &str) -> String {
    let secrets = REGISTERED_SECRETS
        .read()
        .unwrap_or_else(PoisonError::into_inner);
    secrets
        .iter()
        .fold(message.to_string(), |acc, secret| acc.replace(secret.as_str(), REDACTED))
}

/// Result type for screening operations
pub type ScreeningResult<T> = Result<T, ScreeningError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;
    use crate::screening::pipeline::Stage;

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(
            ScreeningError::malformed_body("eof").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ScreeningError::invalid_input("missing field `country`").status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ScreeningError::from(PipelineError::execution("provider timeout")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ScreeningError::internal_error("boom").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_client_error_classification() {
        assert!(ScreeningError::invalid_input("x").is_client_error());
        assert!(ScreeningError::malformed_body("x").is_client_error());
        assert!(!ScreeningError::from(PipelineError::execution("x")).is_client_error());
    }

    #[test]
    fn test_pipeline_error_detail_is_raw_message() {
        let error = ScreeningError::from(PipelineError::execution("provider timeout"));
        assert_eq!(error.to_error_response().detail, "provider timeout");
    }

    #[test]
    fn test_stage_failure_detail_names_stage_and_cause() {
        let error = ScreeningError::from(PipelineError::StageFailed {
            stage: Stage::EthicsAudit,
            source: LlmError::NetworkError("provider timeout".to_string()),
        });
        let detail = error.to_error_response().detail;
        assert!(detail.contains("ethics_audit"));
        assert!(detail.contains("provider timeout"));
    }

    #[test]
    fn test_payload_too_large_maps_to_413() {
        let error = ScreeningError::payload_too_large(32);
        assert_eq!(error.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(error.is_client_error());
        assert_eq!(
            error.to_error_response().detail,
            "Request body exceeds the 32 byte limit"
        );
    }

    #[test]
    fn test_long_pipeline_message_is_not_shortened() {
        let message = format!("provider timeout {}", "x".repeat(600));
        let error = ScreeningError::from(PipelineError::execution(message.clone()));
        assert_eq!(error.to_error_response().detail, message);
    }

    #[test]
    fn test_credential_words_are_left_alone() {
        let message = "quota key: exhausted for tenant; token=expired";
        let error = ScreeningError::from(PipelineError::execution(message));
        assert_eq!(error.to_error_response().detail, message);
    }

    #[test]
    fn test_registered_secret_is_redacted() {
        register_secret("sk-error-module-registered-value");
        let error = ScreeningError::from(PipelineError::execution(
            "openai API error: 401 - invalid key sk-error-module-registered-value",
        ));
        assert_eq!(
            error.to_error_response().detail,
            "openai API error: 401 - invalid key ***"
        );
    }

    #[test]
    fn test_blank_secret_is_ignored() {
        register_secret("   ");
        assert_eq!(redact_secrets("a b  c"), "a b  c");
    }
}
