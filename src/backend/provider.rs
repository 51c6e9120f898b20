use async_trait::async_trait;
use futures_lite::StreamExt;
use llm::builder::{LLMBackend, LLMBuilder};
use llm::chat::{ChatMessage, StreamResponse};

use super::CompletionBackend;
use crate::config::Config;
use crate::error::EngineError;
use crate::request::{CompletionRequest, RequestMessage, Role};
use crate::stream::{Fragment, FragmentStream};

/// adapter over the `llm` crate's providers.
///
/// `llm` chat messages carry no system role, so a provider is built per call
/// with the request's system entries folded (in order) into its system prompt.
/// user/assistant entries are forwarded unchanged.
#[derive(Clone)]
pub struct ProviderBackend {
    backend: LLMBackend,
    api_key: String,
    base_url: Option<String>,
}

impl ProviderBackend {
    /// groq via `llm`, same credential as the http backend.
    pub fn groq(config: &Config) -> Self {
        Self::new(LLMBackend::Groq, config.api_key())
    }

    pub fn new(backend: LLMBackend, api_key: impl Into<String>) -> Self {
        Self {
            backend,
            api_key: api_key.into(),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    fn builder(&self, request: &CompletionRequest) -> LLMBuilder {
        let mut b = LLMBuilder::new()
            .backend(self.backend.clone())
            .api_key(self.api_key.clone())
            .model(request.model.clone())
            .temperature(request.temperature)
            .max_tokens(request.max_tokens)
            .stream(request.stream)
            .system(system_prompt(&request.messages));
        if let Some(url) = &self.base_url {
            b = b.base_url(url.clone());
        }
        b
    }
}

/// all system entries joined in order.
fn system_prompt(messages: &[RequestMessage]) -> String {
    messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// user/assistant entries in order, as `llm` messages.
fn chat_messages(messages: &[RequestMessage]) -> Vec<ChatMessage> {
    messages
        .iter()
        .filter_map(|m| match m.role {
            Role::System => None,
            Role::User => Some(ChatMessage::user().content(m.content.clone()).build()),
            Role::Assistant => Some(ChatMessage::assistant().content(m.content.clone()).build()),
        })
        .collect()
}

fn first_delta(resp: StreamResponse) -> Fragment {
    let content = resp.choices.into_iter().next().and_then(|c| c.delta.content);
    Fragment { content }
}

#[async_trait]
impl CompletionBackend for ProviderBackend {
    async fn stream(&self, request: &CompletionRequest) -> Result<FragmentStream, EngineError> {
        let provider = self.builder(request).build()?;
        let messages = chat_messages(&request.messages);
        tracing::debug!(target: "dualbot", "provider stream: backend={:?} msgs={}", self.backend, messages.len());

        let stream = provider.chat_stream_struct(&messages).await?;
        Ok(Box::pin(stream.map(|item| item.map(first_delta).map_err(EngineError::from))))
    }
}
