//! Error taxonomy for one validation cycle
//!
//! Every variant is terminal for the current cycle only. None of them
//! panic or escape the orchestrator; they are stored on the cycle and
//! rendered to the operator as text.

use crate::models::SlotKind;
use std::time::Duration;
use thiserror::Error;
use tsv_common::api::ServiceErrorBody;

/// Validation cycle errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Submit attempted with one or both slots empty
    #[error("Cannot submit: missing {}", format_missing(.missing))]
    Precondition { missing: Vec<SlotKind> },

    /// Candidate file refused by the intake filter
    #[error("{slot}: {reason}")]
    Intake { slot: SlotKind, reason: String },

    /// Service answered with a non-2xx status
    #[error("Validation service returned HTTP {status}: {}", summarize_body(.body))]
    Server { status: u16, body: String },

    /// Request sent, no response received
    #[error("Could not reach the validation service: {0}")]
    Transport(String),

    /// Configured bound expired before a response arrived
    #[error("Validation service did not respond within {}s", .after.as_secs())]
    Timeout { after: Duration },

    /// Failure before the request left the client
    #[error("Failed to build validation request: {0}")]
    RequestSetup(String),

    /// 2xx response whose body is not a ValidationResponse
    #[error("Malformed response from validation service: {0}")]
    MalformedResponse(String),

    /// Caller stopped waiting before the cycle finished
    #[error("Validation request was abandoned before the service answered")]
    Abandoned,
}

impl ValidationError {
    /// Short classification label for logs and exit messages
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::Precondition { .. } => "precondition",
            ValidationError::Intake { .. } => "intake",
            ValidationError::Server { .. } => "server",
            ValidationError::Transport(_) => "transport",
            ValidationError::Timeout { .. } => "timeout",
            ValidationError::RequestSetup(_) => "request_setup",
            ValidationError::MalformedResponse(_) => "malformed_response",
            ValidationError::Abandoned => "abandoned",
        }
    }

    /// `error` field of a service error body, if the body has one
    pub fn service_message(&self) -> Option<String> {
        match self {
            ValidationError::Server { body, .. } => {
                ServiceErrorBody::parse(body).and_then(|b| b.error)
            }
            _ => None,
        }
    }

    /// Classify a reqwest failure for a request that was handed to the client
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            ValidationError::Timeout { after: timeout }
        } else if err.is_builder() {
            ValidationError::RequestSetup(err.to_string())
        } else if err.is_decode() {
            ValidationError::MalformedResponse(err.to_string())
        } else {
            ValidationError::Transport(err.to_string())
        }
    }
}

fn format_missing(missing: &[SlotKind]) -> String {
    missing
        .iter()
        .map(|slot| slot.to_string())
        .collect::<Vec<_>>()
        .join(" and ")
}

// Prefer the service's own message; fall back to the raw body
fn summarize_body(body: &str) -> String {
    if let Some(message) = ServiceErrorBody::parse(body).and_then(|b| b.error) {
        return message;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "(empty body)".to_string()
    } else {
        trimmed.to_string()
    }
}
