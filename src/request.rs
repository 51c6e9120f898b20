//! outgoing request assembly.
//!
//! the message sequence is built fresh per call:
//! system instruction, prior turns (user/assistant), mode directive, new utterance.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::transcript::Transcript;

pub const SYSTEM_PROMPT: &str = "You are a helpful AI assistant. \
Always follow the user's chosen language mode:\n\
- Auto: detect input (Swahili or English) and reply in the same language.\n\
- Swahili-only: reply only in Kiswahili, even if input is English.\n\
- English-only: reply only in English, even if input is Swahili.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMessage {
    pub role: Role,
    pub content: String,
}

impl RequestMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// openai-compatible chat completion body.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<RequestMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream: bool,
}

/// directive entry text. `mode` is rendered as-is, never validated.
pub fn mode_directive(mode: impl Display) -> String {
    format!("User selected mode: {mode}")
}

pub fn build_messages(
    history: &Transcript,
    utterance: &str,
    mode: impl Display,
) -> Vec<RequestMessage> {
    let mut messages = Vec::with_capacity(history.len() * 2 + 3);
    messages.push(RequestMessage::system(SYSTEM_PROMPT));

    for turn in history {
        if !turn.user.is_empty() {
            messages.push(RequestMessage::user(turn.user.clone()));
        }
        if let Some(answer) = turn.assistant.as_deref()
            && !answer.is_empty() {
                messages.push(RequestMessage::assistant(answer));
        }
    }

    messages.push(RequestMessage::system(mode_directive(mode)));
    messages.push(RequestMessage::user(utterance));
    messages
}
