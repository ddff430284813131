//! Error types for assistant requests.
//!
//! Every failure the request pipeline can produce is a [`ClientError`]. The
//! conversation session turns each one into a failed turn carrying a fixed,
//! human-readable message, so none of them ever reach the user as a crash.

use serde::Deserialize;
use thiserror::Error;

/// Shown when the request could not be completed.
pub const APOLOGY_MESSAGE: &str =
    "Sorry, I couldn't get an answer right now. Please try again in a moment.";

/// Shown when the API kept throttling us until the retries ran out.
pub const RATE_LIMITED_MESSAGE: &str =
    "Sorry, the assistant is receiving too many requests right now. Please try again shortly.";

/// Shown when no API key is configured.
pub const NOT_CONFIGURED_MESSAGE: &str =
    "The assistant is not configured yet. Add a Gemini API key to start chatting.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The request never produced an HTTP response.
    #[error("transport failure: {0}")]
    TransportFailure(String),

    /// Every attempt was answered with 429.
    #[error("rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    /// A non-retryable, non-success status.
    #[error("upstream error {status}: {message}")]
    UpstreamError { status: u16, message: String },

    /// Success status, but the body did not have the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// No API key; no request was attempted.
    #[error("assistant API key is not configured")]
    NotConfigured,
}

impl ClientError {
    /// Stable identifier for logs and JSON output.
    pub fn code(&self) -> &'static str {
        match self {
            ClientError::TransportFailure(_) => "transport_failure",
            ClientError::RateLimited { .. } => "rate_limited",
            ClientError::UpstreamError { .. } => "upstream_error",
            ClientError::MalformedResponse(_) => "malformed_response",
            ClientError::NotConfigured => "not_configured",
        }
    }

    /// The static text rendered in place of an answer.
    pub fn user_message(&self) -> &'static str {
        match self {
            ClientError::RateLimited { .. } => RATE_LIMITED_MESSAGE,
            ClientError::NotConfigured => NOT_CONFIGURED_MESSAGE,
            ClientError::TransportFailure(_)
            | ClientError::UpstreamError { .. }
            | ClientError::MalformedResponse(_) => APOLOGY_MESSAGE,
        }
    }

    /// Whether another attempt may succeed: the request never got a response,
    /// or the API asked us to slow down. The retrying client stops on
    /// anything else.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ClientError::TransportFailure(_) | ClientError::RateLimited { .. }
        )
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::UpstreamError { status, .. } => Some(*status),
            ClientError::RateLimited { .. } => Some(429),
            _ => None,
        }
    }
}

// ============================================================================
// API Error Parsing
// ============================================================================

/// Gemini error envelope: `{"error": {"code", "message", "status"}}`.
#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
    status: Option<String>,
}

/// Build an [`ClientError::UpstreamError`] from a non-success response,
/// pulling the provider's message out of the body when it is there.
pub fn parse_api_error(status: u16, body: &str) -> ClientError {
    let detail = serde_json::from_str::<ApiErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error);

    let message = match detail {
        Some(ApiErrorDetail {
            message: Some(message),
            status: Some(kind),
        }) => format!("{}: {}", kind, message),
        Some(ApiErrorDetail {
            message: Some(message),
            ..
        }) => message,
        _ if body.trim().is_empty() => format!("HTTP {}", status),
        _ => truncate(body.trim(), 500),
    };

    ClientError::UpstreamError { status, message }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}
