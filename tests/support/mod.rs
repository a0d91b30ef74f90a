#![allow(dead_code)]

use async_trait::async_trait;
use chat_relay::provider::{ChatProvider, ProviderError};
use chat_relay::specs::openai::{
    ChatChoice, ChatCompletionRequest, ChatCompletionResponse, ChoiceMessage,
};
use std::sync::Mutex;

pub fn completion(text: &str) -> ChatCompletionResponse {
    ChatCompletionResponse {
        choices: vec![ChatChoice {
            index: Some(0),
            message: Some(ChoiceMessage {
                role: Some("assistant".into()),
                content: Some(text.to_string()),
            }),
            finish_reason: Some("stop".into()),
        }],
        ..Default::default()
    }
}

pub enum Canned {
    Reply(String),
    Api {
        status: Option<u16>,
        kind: Option<String>,
        message: Option<String>,
    },
    Broken,
}

/// Provider double that records requests and answers from a fixed script.
pub struct RecordingProvider {
    pub calls: Mutex<Vec<ChatCompletionRequest>>,
    canned: Canned,
}

impl RecordingProvider {
    pub fn replying(text: &str) -> Self {
        Self::new(Canned::Reply(text.to_string()))
    }

    pub fn new(canned: Canned) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            canned,
        }
    }

    pub fn calls(&self) -> Vec<ChatCompletionRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatProvider for RecordingProvider {
    async fn create_chat_completion(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, ProviderError> {
        self.calls.lock().unwrap().push(request.clone());
        match &self.canned {
            Canned::Reply(text) => Ok(completion(text)),
            Canned::Api {
                status,
                kind,
                message,
            } => Err(ProviderError::Api {
                status: *status,
                kind: kind.clone(),
                message: message.clone(),
            }),
            Canned::Broken => Err(ProviderError::Decode("unexpected end of stream".into())),
        }
    }
}
