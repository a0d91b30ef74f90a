use crate::constants::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing_error::SpanTrace;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: String,
}

impl ConversationMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Body of `POST /relay`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RelayRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    pub messages: Vec<ConversationMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReplyBody {
    pub reply: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailureBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// Lenient view of any relay response body, as the client reads it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelayResponse {
    #[serde(default)]
    pub reply: Option<String>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

/// Where the system persona of a provider request came from.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PersonaSource {
    Override,
    Deployment,
    Fallback,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Misconfigured,
    InvalidRequest,
    ProviderError,
    EmptyResponse,
    Unknown,
}

/// Outcome of one request/response cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnResult {
    Reply(String),
    Failure { kind: FailureKind, detail: String },
}

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Server misconfigured: {0}")]
    Misconfigured(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The HTTP layer refused to buffer the body (over the size limit).
    #[error("Request body rejected ({status}): {detail}")]
    BodyRejected { status: u16, detail: String },

    #[error("Provider error (status {status:?}, type {kind:?}): {message:?}")]
    Provider {
        status: Option<u16>,
        kind: Option<String>,
        message: Option<String>,
    },

    #[error("Empty response from model")]
    EmptyResponse,

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl RelayError {
    pub fn kind(&self) -> FailureKind {
        match self {
            RelayError::Misconfigured(_) => FailureKind::Misconfigured,
            RelayError::InvalidRequest(_) | RelayError::BodyRejected { .. } => {
                FailureKind::InvalidRequest
            }
            RelayError::Provider { .. } => FailureKind::ProviderError,
            RelayError::EmptyResponse => FailureKind::EmptyResponse,
            RelayError::Unknown(_) => FailureKind::Unknown,
        }
    }

    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            RelayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RelayError::BodyRejected { status, .. } => match StatusCode::from_u16(*status) {
                Ok(s) if s.is_client_error() => s,
                _ => StatusCode::BAD_REQUEST,
            },
            RelayError::Provider {
                status: Some(code), ..
            } => match StatusCode::from_u16(*code) {
                Ok(s) if s.is_client_error() || s.is_server_error() => s,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The body returned to callers. Validation detail and the internals of
    /// empty and unknown failures stay in the server log.
    pub fn public_body(&self) -> FailureBody {
        match self {
            RelayError::Misconfigured(_) => FailureBody {
                error: MISCONFIGURED_MESSAGE.to_string(),
                status: None,
                kind: None,
            },
            RelayError::InvalidRequest(_) => FailureBody {
                error: INVALID_BODY_MESSAGE.to_string(),
                status: None,
                kind: None,
            },
            RelayError::BodyRejected { .. } => FailureBody {
                error: BODY_TOO_LARGE_MESSAGE.to_string(),
                status: None,
                kind: None,
            },
            RelayError::Provider {
                status,
                kind,
                message,
            } => FailureBody {
                error: message
                    .clone()
                    .unwrap_or_else(|| PROVIDER_FAILED_MESSAGE.to_string()),
                status: *status,
                kind: kind.clone(),
            },
            RelayError::EmptyResponse | RelayError::Unknown(_) => FailureBody {
                error: GENERIC_FAILURE_MESSAGE.to_string(),
                status: None,
                kind: None,
            },
        }
    }
}

impl From<crate::provider::ProviderError> for RelayError {
    fn from(e: crate::provider::ProviderError) -> Self {
        use crate::provider::ProviderError;
        match e {
            ProviderError::Api {
                status,
                kind,
                message,
            } => RelayError::Provider {
                status,
                kind,
                message,
            },
            other => RelayError::Unknown(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(e: serde_json::Error) -> Self {
        RelayError::InvalidRequest(e.to_string())
    }
}

#[derive(Debug)]
pub struct ObservedError {
    pub inner: RelayError,
    pub span_trace: SpanTrace,
}

impl ObservedError {
    pub fn kind(&self) -> FailureKind {
        self.inner.kind()
    }
}

impl std::fmt::Display for ObservedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\n\nSpan Trace:\n{}", self.inner, self.span_trace)
    }
}

impl std::error::Error for ObservedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.inner)
    }
}

impl<E> From<E> for ObservedError
where
    E: Into<RelayError>,
{
    fn from(error: E) -> Self {
        Self {
            inner: error.into(),
            span_trace: SpanTrace::capture(),
        }
    }
}

impl axum::response::IntoResponse for ObservedError {
    fn into_response(self) -> axum::response::Response {
        let status = self.inner.status_code();
        match &self.inner {
            RelayError::InvalidRequest(m) => {
                tracing::warn!(status = status.as_u16(), "Rejected relay request: {}", m);
            }
            RelayError::BodyRejected { detail, .. } => {
                tracing::warn!(status = status.as_u16(), "Rejected relay body: {}", detail);
            }
            RelayError::Provider { .. } => {
                tracing::warn!(status = status.as_u16(), "Provider failure: {}", self.inner);
            }
            _ => {
                tracing::error!(
                    status = status.as_u16(),
                    span_trace = %self.span_trace,
                    "Relay failure: {}",
                    self.inner
                );
            }
        }
        (status, axum::Json(self.inner.public_body())).into_response()
    }
}

impl From<ObservedError> for TurnResult {
    fn from(e: ObservedError) -> Self {
        TurnResult::Failure {
            kind: e.kind(),
            detail: e.inner.public_body().error,
        }
    }
}

pub type Result<T> = std::result::Result<T, ObservedError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_role_wire_names() {
        let msg = ConversationMessage::assistant("hi");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["content"], "hi");
    }

    #[test]
    fn test_relay_request_camel_case() {
        let req = RelayRequest {
            system_prompt: Some("Be brief".into()),
            messages: vec![ConversationMessage::user("hi")],
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["systemPrompt"], "Be brief");

        let no_prompt = RelayRequest {
            system_prompt: None,
            messages: vec![],
        };
        let json = serde_json::to_value(&no_prompt).unwrap();
        assert!(json.get("systemPrompt").is_none());
    }

    #[test]
    fn test_provider_status_passthrough() {
        let err = RelayError::Provider {
            status: Some(429),
            kind: Some("rate_limit_exceeded".into()),
            message: Some("Slow down".into()),
        };
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
        let body = serde_json::to_value(err.public_body()).unwrap();
        assert_eq!(body["error"], "Slow down");
        assert_eq!(body["status"], 429);
        assert_eq!(body["type"], "rate_limit_exceeded");
    }

    #[test]
    fn test_provider_without_status_is_500() {
        let err = RelayError::Provider {
            status: None,
            kind: None,
            message: None,
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::to_value(err.public_body()).unwrap();
        assert_eq!(body["error"], PROVIDER_FAILED_MESSAGE);
        assert!(body.get("status").is_none());
        assert!(body.get("type").is_none());
    }

    #[test]
    fn test_unknown_detail_not_leaked() {
        let err = RelayError::Unknown("connection refused at 10.0.0.3:443".into());
        let body = err.public_body();
        assert_eq!(body.error, GENERIC_FAILURE_MESSAGE);
        assert!(!body.error.contains("10.0.0.3"));

        let empty = RelayError::EmptyResponse.public_body();
        assert_eq!(empty.error, GENERIC_FAILURE_MESSAGE);
    }

    #[test]
    fn test_fixed_failure_wording() {
        let body = RelayError::Misconfigured("missing HF_TOKEN".into()).public_body();
        assert_eq!(body.error, "Server misconfigured: missing Hugging Face token.");

        let body = RelayError::InvalidRequest("message 0: missing field `content`".into())
            .public_body();
        assert_eq!(body.error, "Invalid request body");
        assert!(body.status.is_none());
    }

    #[test]
    fn test_body_rejection_keeps_client_status() {
        let err = RelayError::BodyRejected {
            status: 413,
            detail: "length limit exceeded".into(),
        };
        assert_eq!(err.status_code(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.kind(), FailureKind::InvalidRequest);
        assert_eq!(err.public_body().error, BODY_TOO_LARGE_MESSAGE);

        let odd = RelayError::BodyRejected {
            status: 200,
            detail: "x".into(),
        };
        assert_eq!(odd.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_status_codes_by_kind() {
        assert_eq!(
            RelayError::InvalidRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            RelayError::Misconfigured("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            RelayError::EmptyResponse.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
