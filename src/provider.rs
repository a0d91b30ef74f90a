//! Upstream model provider: an OpenAI-compatible chat completions endpoint.

use crate::specs::openai::{
    ApiErrorEnvelope, ApiErrorPayload, ChatCompletionRequest, ChatCompletionResponse,
};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    /// The provider answered with a structured error.
    #[error("Provider API error (status {status:?}, type {kind:?}): {message:?}")]
    Api {
        status: Option<u16>,
        kind: Option<String>,
        message: Option<String>,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Malformed provider response: {0}")]
    Decode(String),
}

/// The single upstream operation the relay needs.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn create_chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ProviderError>;
}

pub struct OpenAiCompatClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl OpenAiCompatClient {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatProvider for OpenAiCompatClient {
    async fn create_chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ProviderError> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(parse_api_error(Some(status.as_u16()), &body));
        }

        let value: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| ProviderError::Decode(e.to_string()))?;

        // Some routers report failures inside a 200 body
        if value.get("error").is_some() && value.get("choices").is_none() {
            return Err(parse_api_error(None, &body));
        }

        serde_json::from_value(value).map_err(|e| ProviderError::Decode(e.to_string()))
    }
}

/// Builds an `Api` error from a provider error body. Non-JSON bodies (proxy
/// HTML pages and the like) keep only the status.
pub fn parse_api_error(status: Option<u16>, body: &str) -> ProviderError {
    let envelope = match serde_json::from_str::<ApiErrorEnvelope>(body) {
        Ok(e) => e,
        Err(_) => {
            return ProviderError::Api {
                status,
                kind: None,
                message: None,
            }
        }
    };

    match envelope.error {
        ApiErrorPayload::Message(message) => ProviderError::Api {
            status,
            kind: None,
            message: Some(message),
        },
        ApiErrorPayload::Detailed(detail) => {
            let code_status = detail
                .code
                .as_ref()
                .and_then(|c| c.as_u64())
                .and_then(|c| u16::try_from(c).ok())
                .filter(|c| (400..600).contains(c));
            ProviderError::Api {
                status: status.or(code_status),
                kind: detail.kind,
                message: detail.message,
            }
        }
    }
}
