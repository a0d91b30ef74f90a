//! Turn driver: runs the conversation state machine against a relay.

use crate::constants::{MISSING_REPLY, RELAY_PATH};
use crate::conversation::{ConversationState, IgnoreReason, Submission};
use crate::scroll::ViewportMetrics;
use crate::str_utils;
use crate::types::*;
use async_trait::async_trait;
use futures_util::FutureExt;
use thiserror::Error;
use tokio::sync::Mutex;

/// Anything that can carry a relay request and hand back the turn outcome.
#[async_trait]
pub trait RelayTransport: Send + Sync {
    async fn send(&self, request: &RelayRequest) -> TurnResult;
}

#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Ignored(IgnoreReason),
    Settled {
        state: ConversationState,
        result: TurnResult,
    },
}

/// One conversation bound to a transport. At most one turn is in flight; a
/// submit while pending is dropped rather than queued.
pub struct ChatSession<T> {
    transport: T,
    state: Mutex<ConversationState>,
}

impl<T: RelayTransport> ChatSession<T> {
    pub fn new(transport: T, state: ConversationState) -> Self {
        Self {
            transport,
            state: Mutex::new(state),
        }
    }

    pub async fn snapshot(&self) -> ConversationState {
        self.state.lock().await.clone()
    }

    pub async fn set_persona(&self, persona: &str) {
        let mut state = self.state.lock().await;
        *state = state.with_persona(persona);
    }

    pub async fn submit(&self, text: &str, viewport: Option<ViewportMetrics>) -> TurnOutcome {
        let request = {
            let mut state = self.state.lock().await;
            match state.submit(text, viewport) {
                Submission::Ignored(reason) => {
                    tracing::debug!("Submit ignored: {:?}", reason);
                    return TurnOutcome::Ignored(reason);
                }
                Submission::Accepted {
                    state: sending,
                    request,
                } => {
                    *state = sending;
                    request
                }
            }
        };

        // The lock is released while the relay is working. A panicking
        // transport still settles the turn so `pending` cannot stick.
        let result = match std::panic::AssertUnwindSafe(self.transport.send(&request))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic_payload) => {
                let message = if let Some(s) = panic_payload.downcast_ref::<&str>() {
                    (*s).to_string()
                } else if let Some(s) = panic_payload.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                tracing::error!(target: "panic", "Relay transport panicked: {}", message);
                TurnResult::Failure {
                    kind: FailureKind::Unknown,
                    detail: message,
                }
            }
        };

        match &result {
            TurnResult::Reply(text) => {
                tracing::debug!(reply = %str_utils::preview(text, 80), "Turn settled with reply");
            }
            TurnResult::Failure { kind, detail } => {
                tracing::error!("Chat request failed ({:?}): {}", kind, detail);
            }
        }

        let mut state = self.state.lock().await;
        *state = state.apply(&result);
        TurnOutcome::Settled {
            state: state.clone(),
            result,
        }
    }
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Relay answered {status}: {body}")]
    Status { status: u16, body: String },
}

/// Calls a relay service over HTTP.
pub struct HttpRelayClient {
    http: reqwest::Client,
    endpoint: String,
}

impl HttpRelayClient {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), RELAY_PATH),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the text to show for a 2xx answer: the reply, else the error
    /// string, else a stock apology.
    pub async fn post(&self, request: &RelayRequest) -> std::result::Result<String, TransportError> {
        let response = self.http.post(&self.endpoint).json(request).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: RelayResponse = serde_json::from_str(&body).unwrap_or_default();
        let text = parsed
            .reply
            .or_else(|| parsed.error.as_ref().and_then(|e| e.as_str()).map(String::from))
            .unwrap_or_else(|| MISSING_REPLY.to_string());
        Ok(text)
    }
}

fn failure_kind_for_status(status: u16, body: &str) -> FailureKind {
    if status == 400 || status == 413 {
        return FailureKind::InvalidRequest;
    }
    match serde_json::from_str::<FailureBody>(body) {
        Ok(f) if f.status.is_some() || f.kind.is_some() => FailureKind::ProviderError,
        Ok(f) if f.error == crate::constants::MISCONFIGURED_MESSAGE => FailureKind::Misconfigured,
        _ => FailureKind::Unknown,
    }
}

#[async_trait]
impl RelayTransport for HttpRelayClient {
    async fn send(&self, request: &RelayRequest) -> TurnResult {
        match self.post(request).await {
            Ok(text) => TurnResult::Reply(text),
            Err(TransportError::Status { status, body }) => TurnResult::Failure {
                kind: failure_kind_for_status(status, &body),
                detail: format!("relay answered {}", status),
            },
            Err(e) => TurnResult::Failure {
                kind: FailureKind::Unknown,
                detail: e.to_string(),
            },
        }
    }
}
