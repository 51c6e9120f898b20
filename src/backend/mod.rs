//! remote inference collaborators.
//!
//! - `HttpBackend`:     openai-compatible sse over `ureq` (default; sends roles exactly as built)
//! - `ProviderBackend`: any `llm` crate provider via `chat_stream_struct`

use async_trait::async_trait;

use crate::error::EngineError;
use crate::request::CompletionRequest;
use crate::stream::FragmentStream;

mod http;
mod provider;

pub use http::HttpBackend;
pub use provider::ProviderBackend;

/// issues one streaming completion call.
///
/// errors returned here (before any fragment) and errors yielded by the stream
/// are treated the same by the engine.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn stream(&self, request: &CompletionRequest) -> Result<FragmentStream, EngineError>;
}
