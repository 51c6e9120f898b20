//! in-memory chat history for one session.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// prefix a failed turn carries in place of a model answer.
pub const ERROR_PREFIX: &str = "Error: ";

/// one request/response exchange.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub user: String,
    pub assistant: Option<String>,
}

impl Turn {
    pub fn new(user: impl Into<String>, assistant: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            assistant: Some(assistant.into()),
        }
    }

    /// a turn that has not been answered (only ever seen in histories handed
    /// in by a front-end; the engine appends settled turns only).
    pub fn pending(user: impl Into<String>) -> Self {
        Self { user: user.into(), assistant: None }
    }

    /// settle a turn from the engine's result. failures are rendered inline as
    /// `Error: <message>` so the session keeps going.
    pub fn settled<E: Display>(user: impl Into<String>, outcome: Result<String, E>) -> Self {
        let assistant = match outcome {
            Ok(text) => text,
            Err(err) => format!("{ERROR_PREFIX}{err}"),
        };
        Self::new(user, assistant)
    }

    pub fn assistant_text(&self) -> &str {
        self.assistant.as_deref().unwrap_or_default()
    }

    /// true when the assistant text is a surfaced failure, not an answer.
    pub fn is_error(&self) -> bool {
        self.assistant_text().starts_with(ERROR_PREFIX)
    }
}

/// ordered turns. append-only apart from a wholesale `clear`.
///
/// concurrent `respond` calls against one transcript are not supported: the
/// caller serializes them (`&mut` access makes this the default in rust).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_turns(turns: impl IntoIterator<Item = Turn>) -> Self {
        Self { turns: turns.into_iter().collect() }
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// reset action.
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Turn> {
        self.turns.iter()
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Turn;
    type IntoIter = std::slice::Iter<'a, Turn>;

    fn into_iter(self) -> Self::IntoIter {
        self.turns.iter()
    }
}

/// blank input is filtered by front-ends before it reaches the engine.
pub fn is_blank(utterance: &str) -> bool {
    utterance.trim().is_empty()
}
