//! streamed response handling: fragments, server-sent-event decoding, and
//! accumulation into one final string.

use std::pin::Pin;

use futures_lite::{Stream, StreamExt};
use serde::Deserialize;

use crate::error::EngineError;

/// one incremental piece of the response. `content` may be absent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Fragment {
    pub content: Option<String>,
}

impl Fragment {
    pub fn text(content: impl Into<String>) -> Self {
        Self { content: Some(content.into()) }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// missing content counts as the empty string.
    pub fn as_str(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }
}

pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Fragment, EngineError>> + Send>>;

/// drain `stream`, concatenating fragments in arrival order.
///
/// the first error aborts the turn; text accumulated so far is dropped.
pub async fn accumulate(mut stream: FragmentStream) -> Result<String, EngineError> {
    let mut text = String::new();
    let mut fragments = 0usize;
    while let Some(item) = stream.next().await {
        let fragment = item?;
        text.push_str(fragment.as_str());
        fragments += 1;
    }
    tracing::debug!(target: "dualbot", "stream drained: fragments={} final_len={}", fragments, text.len());
    Ok(text)
}

/// one decoded line of an openai-compatible event stream.
#[derive(Debug, PartialEq, Eq)]
pub enum SseLine {
    Fragment(Fragment),
    Done,
    /// blank lines, comments, and non-data fields.
    Skip,
}

#[derive(Deserialize)]
struct ChunkBody {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<ChunkError>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Deserialize, Default)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChunkError {
    message: String,
}

pub fn decode_sse_line(line: &str) -> Result<SseLine, EngineError> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(SseLine::Skip);
    };
    let data = data.trim();
    if data == "[DONE]" {
        return Ok(SseLine::Done);
    }
    if data.is_empty() {
        return Ok(SseLine::Skip);
    }

    let body: ChunkBody =
        serde_json::from_str(data).map_err(|e| EngineError::Malformed(e.to_string()))?;
    if let Some(err) = body.error {
        return Err(EngineError::Backend(err.message));
    }
    // only the first choice is requested (n = 1)
    let content = body.choices.into_iter().next().and_then(|c| c.delta.content);
    Ok(SseLine::Fragment(Fragment { content }))
}
