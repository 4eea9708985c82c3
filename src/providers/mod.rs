/*!
 * Provider implementations for the remote model service.
 *
 * This module contains the request/response types shared by all providers and
 * the client implementations:
 * - OpenAI: any OpenAI-compatible chat completions endpoint
 * - Mock: in-process provider for tests and benchmarks
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// Chat message sent to the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,

    /// Content of the message
    pub content: String,
}

/// Chat completion request
#[derive(Debug, Clone, Serialize, Default)]
pub struct ChatRequest {
    /// The model to use
    pub model: String,

    /// The messages for the conversation
    pub messages: Vec<ChatMessage>,
}

impl ChatRequest {
    /// Create a new chat request
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// Add a message to the request
    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage {
            role: role.into(),
            content: content.into(),
        });
        self
    }

    /// Content of the first system message, empty if none
    pub fn system_prompt(&self) -> &str {
        self.messages
            .iter()
            .find(|m| m.role == "system")
            .map(|m| m.content.as_str())
            .unwrap_or("")
    }

    /// Content of the last user message, empty if none
    pub fn user_text(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
            .unwrap_or("")
    }
}

/// Token usage information
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
}

/// Message inside a completion choice
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CompletionMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// One completion choice
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CompletionChoice {
    pub message: CompletionMessage,
}

/// Well-formed chat completion body
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ChatCompletion {
    pub choices: Vec<CompletionChoice>,
    #[serde(default)]
    pub usage: Option<TokenUsage>,
}

/// Response body as received, in whichever shape the endpoint produced
#[derive(Debug, Clone, PartialEq)]
pub enum RawResponse {
    /// Matches the chat completion schema
    Structured(ChatCompletion),
    /// JSON object carrying `choices`, field types not guaranteed
    Mapping(Value),
    /// Anything else: plain text, a JSON string, an HTML page
    Text(String),
}

impl RawResponse {
    /// Classify a response body
    pub fn from_body(body: &str) -> Self {
        if let Ok(completion) = serde_json::from_str::<ChatCompletion>(body) {
            return RawResponse::Structured(completion);
        }

        match serde_json::from_str::<Value>(body) {
            Ok(value @ Value::Object(_)) if value.get("choices").is_some() => RawResponse::Mapping(value),
            Ok(Value::String(text)) => RawResponse::Text(text),
            _ => RawResponse::Text(body.to_string()),
        }
    }
}

/// Common trait for all model providers
///
/// A provider performs exactly one round trip per `complete` call and leaves
/// interpretation of the body to the caller.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Send one chat request
    async fn complete(&self, request: ChatRequest) -> Result<RawResponse, ProviderError>;

    /// Release pooled connections; the next call reconnects
    async fn close(&self) {}
}

pub mod openai;
pub mod mock;
