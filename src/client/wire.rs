//! Request / response bodies exchanged with the router.

use serde::{Deserialize, Serialize};

use crate::error::{ConsoleError, Result};

/// A single message in a chat conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    /// Build a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Request body for `POST /v1/chat/completions`.
///
/// `model` is only the declared target; the router is free to substitute a
/// cheaper, faster, or cached provider and reports what it actually used in
/// [`CompletionResponse::model`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub model: String,
}

impl CompletionRequest {
    /// The fixed trace-session request shape: one user message.
    pub fn single_prompt(prompt: impl Into<String>, declared_model: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::user(prompt)],
            model: declared_model.into(),
        }
    }
}

/// Response body from the completions endpoint.
///
/// Only `model` and `choices[0].message.content` are read.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CompletionResponse {
    pub model: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: String,
}

impl CompletionResponse {
    /// Text of the first choice; an empty `choices` array is a protocol error.
    pub fn first_content(&self) -> Result<&str> {
        self.choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| ConsoleError::protocol("completion response has no choices"))
    }
}

/// Response body from `POST /api/parse-document`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ParseDocumentResponse {
    pub text: String,
}
