//! conversation engine: transcript + utterance + mode in, settled turn out.

use std::sync::Arc;

use crate::backend::{CompletionBackend, HttpBackend};
use crate::config::Config;
use crate::error::EngineError;
use crate::mode::LanguageMode;
use crate::request::{build_messages, CompletionRequest};
use crate::stream::accumulate;
use crate::transcript::{Transcript, Turn};

/// shared by every front-end. cheap to clone; holds no per-session state.
#[derive(Clone)]
pub struct Engine {
    config: Config,
    backend: Arc<dyn CompletionBackend>,
}

impl Engine {
    pub fn new(config: Config, backend: Arc<dyn CompletionBackend>) -> Self {
        Self { config, backend }
    }

    /// engine over the default openai-compatible http backend.
    pub fn from_config(config: Config) -> Self {
        let backend = Arc::new(HttpBackend::new(&config));
        Self::new(config, backend)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn request(&self, history: &Transcript, utterance: &str, mode: LanguageMode) -> CompletionRequest {
        CompletionRequest {
            model: self.config.model.clone(),
            messages: build_messages(history, utterance, mode),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream: true,
        }
    }

    /// one streaming call, accumulated. no retries; partial text on failure is dropped.
    pub async fn complete(
        &self,
        history: &Transcript,
        utterance: &str,
        mode: LanguageMode,
    ) -> Result<String, EngineError> {
        let request = self.request(history, utterance, mode);
        tracing::info!(
            target: "dualbot",
            "complete: model={} mode={} history_turns={} msgs={}",
            request.model, mode, history.len(), request.messages.len()
        );
        let stream = self.backend.stream(&request).await?;
        accumulate(stream).await
    }

    /// run one turn and append it. never fails: a transport error becomes a
    /// turn whose answer reads `Error: <message>`.
    ///
    /// `utterance` is not validated; front-ends filter blank input.
    pub async fn respond<'t>(
        &self,
        utterance: impl Into<String>,
        transcript: &'t mut Transcript,
        mode: LanguageMode,
    ) -> &'t Turn {
        let utterance = utterance.into();
        let outcome = self.complete(transcript, &utterance, mode).await;
        match &outcome {
            Ok(text) => tracing::info!(target: "dualbot", "turn settled: final_len={}", text.len()),
            Err(err) => tracing::error!(target: "dualbot", "turn failed: {}", err),
        }
        let idx = transcript.len();
        transcript.push(Turn::settled(utterance, outcome));
        &transcript.turns()[idx]
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").field("config", &self.config).finish_non_exhaustive()
    }
}
