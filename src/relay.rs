//! Server-side relay between the chat client and the model provider.

use crate::constants::*;
use crate::main_helper::RelayConfig;
use crate::provider::ChatProvider;
use crate::redaction::redact_value;
use crate::specs::openai::ChatCompletionRequest;
use crate::str_utils;
use crate::types::*;
use std::sync::Arc;

pub struct Relay {
    config: RelayConfig,
    provider: Arc<dyn ChatProvider>,
}

/// A provider request together with how it was shaped.
#[derive(Debug, Clone)]
pub struct PreparedTurn {
    pub request: ChatCompletionRequest,
    pub persona_source: PersonaSource,
    pub truncated: usize,
    pub dropped_system: usize,
}

impl Relay {
    pub fn new(config: RelayConfig, provider: Arc<dyn ChatProvider>) -> Self {
        Self { config, provider }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Entry point for raw HTTP bodies.
    pub async fn handle_body(&self, body: &[u8]) -> Result<String> {
        self.ensure_configured()?;
        let payload: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| RelayError::InvalidRequest(format!("body is not JSON ({})", e)))?;
        self.parse_and_dispatch(&payload).await
    }

    pub async fn handle(&self, payload: &serde_json::Value) -> Result<String> {
        self.ensure_configured()?;
        self.parse_and_dispatch(payload).await
    }

    /// A body the HTTP layer would not buffer, answered in the relay's own
    /// failure shape. The credential check still comes first.
    pub fn reject_body(&self, status: u16, detail: &str) -> ObservedError {
        match self.ensure_configured() {
            Err(e) => e,
            Ok(()) => RelayError::BodyRejected {
                status,
                detail: detail.to_string(),
            }
            .into(),
        }
    }

    async fn parse_and_dispatch(&self, payload: &serde_json::Value) -> Result<String> {
        let request = parse_request(payload)?;
        self.dispatch(&request).await
    }

    /// Completes one turn. Exactly one provider call is made, never retried.
    pub async fn complete(&self, request: &RelayRequest) -> Result<String> {
        self.ensure_configured()?;
        self.dispatch(request).await
    }

    fn ensure_configured(&self) -> Result<()> {
        if self.config.has_credential() {
            Ok(())
        } else {
            tracing::error!("Relay call rejected: {} is not configured", ENV_PROVIDER_TOKEN);
            Err(RelayError::Misconfigured(format!("missing {}", ENV_PROVIDER_TOKEN)).into())
        }
    }

    async fn dispatch(&self, request: &RelayRequest) -> Result<String> {
        let prepared = self.prepare(request);
        self.log_request_summary(&prepared);

        let response = match self.provider.create_chat_completion(&prepared.request).await {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(model = %prepared.request.model, "Provider call failed: {}", e);
                return Err(RelayError::from(e).into());
            }
        };

        let reply = response.first_content().map(str::trim).unwrap_or_default();
        tracing::info!(
            "[RES] Finish: {} | Content: {} chars",
            response.finish_reason().unwrap_or("UNKNOWN"),
            reply.chars().count()
        );

        if reply.is_empty() {
            tracing::error!(model = %prepared.request.model, "Empty response from model");
            return Err(RelayError::EmptyResponse.into());
        }

        Ok(reply.to_string())
    }

    /// Persona precedence: non-blank request override, deployment default, fallback.
    pub fn resolve_persona(&self, override_text: Option<&str>) -> (String, PersonaSource) {
        if let Some(text) = override_text.map(str::trim).filter(|t| !t.is_empty()) {
            return (text.to_string(), PersonaSource::Override);
        }
        if let Some(text) = self.config.default_persona.as_deref() {
            return (text.to_string(), PersonaSource::Deployment);
        }
        (FALLBACK_PERSONA.to_string(), PersonaSource::Fallback)
    }

    /// Builds the provider payload: the resolved persona as the only system
    /// message, then the conversation with each content bounded.
    pub fn prepare(&self, request: &RelayRequest) -> PreparedTurn {
        let (persona, persona_source) = self.resolve_persona(request.system_prompt.as_deref());

        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(ConversationMessage::system(persona));

        let mut truncated = 0;
        let mut dropped_system = 0;
        for message in &request.messages {
            if message.role == Role::System {
                dropped_system += 1;
                continue;
            }
            let content = str_utils::truncate_chars(&message.content, MAX_MESSAGE_CHARS);
            if content.len() < message.content.len() {
                truncated += 1;
            }
            messages.push(ConversationMessage {
                role: message.role,
                content: content.into_owned(),
            });
        }

        if dropped_system > 0 {
            tracing::warn!(
                "Dropped {} client-supplied system message(s); persona comes from systemPrompt",
                dropped_system
            );
        }

        PreparedTurn {
            request: ChatCompletionRequest {
                model: self.config.model.clone(),
                messages,
                temperature: Some(TEMPERATURE),
                max_tokens: Some(MAX_OUTPUT_TOKENS),
            },
            persona_source,
            truncated,
            dropped_system,
        }
    }

    fn log_request_summary(&self, prepared: &PreparedTurn) {
        let last_role = match prepared.request.messages.last() {
            Some(m) => m.role.to_string(),
            None => "NONE".into(),
        };
        tracing::info!(
            "[REQ] Messages: {} | Last Role: {} | Persona: {:?} | Truncated: {}",
            prepared.request.messages.len(),
            last_role,
            prepared.persona_source,
            prepared.truncated
        );

        if tracing::enabled!(tracing::Level::DEBUG) {
            if let Ok(mut payload) = serde_json::to_value(&prepared.request) {
                redact_value(&mut payload, self.config.redaction);
                tracing::debug!(payload = %payload, "Outbound provider payload");
            }
        }
    }
}

#[async_trait::async_trait]
impl crate::session::RelayTransport for Relay {
    async fn send(&self, request: &RelayRequest) -> TurnResult {
        match self.complete(request).await {
            Ok(reply) => TurnResult::Reply(reply),
            Err(e) => e.into(),
        }
    }
}

/// Validates a `POST /relay` body into a typed request.
pub fn parse_request(payload: &serde_json::Value) -> Result<RelayRequest> {
    let Some(object) = payload.as_object() else {
        return Err(RelayError::InvalidRequest("body must be a JSON object".into()).into());
    };

    let messages = match object.get("messages") {
        Some(serde_json::Value::Array(items)) => items,
        _ => {
            return Err(RelayError::InvalidRequest("`messages` must be an array".into()).into())
        }
    };

    let system_prompt = match object.get("systemPrompt") {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(_) => {
            return Err(
                RelayError::InvalidRequest("`systemPrompt` must be a string".into()).into(),
            )
        }
    };

    let messages = messages
        .iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value::<ConversationMessage>(item.clone())
                .map_err(|e| RelayError::InvalidRequest(format!("message {}: {}", i, e)))
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(RelayRequest {
        system_prompt,
        messages,
    })
}
