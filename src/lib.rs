//! dualbot: a bilingual (english/swahili) chat engine over a streaming
//! chat-completion api, plus a thin bevy plugin to drive it from an app.
//!
//! - one engine, any number of front-ends: `Engine::respond` takes a transcript,
//!   an utterance, and a `LanguageMode`, streams the answer, and appends one turn.
//! - transport failures never escape: they land in the transcript as `Error: ...`.
//! - the credential is resolved once (`Config::from_env`) and passed in; a
//!   missing key is a `ConfigError` before any request is attempted.
//! - the remote call sits behind `CompletionBackend` (http/sse over `ureq` by
//!   default, or any `llm` crate provider).
//!
//! api docs for the provider types: https://docs.rs/llm

pub mod backend;
pub mod config;
pub mod engine;
pub mod error;
pub mod mode;
#[cfg(feature = "bevy")]
pub mod plugin;
pub mod request;
pub mod stream;
pub mod transcript;

pub use backend::{CompletionBackend, HttpBackend, ProviderBackend};
pub use config::Config;
pub use engine::Engine;
pub use error::{ConfigError, EngineError};
pub use mode::{LanguageMode, ModeParseError};
#[cfg(feature = "bevy")]
pub use plugin::{
    clear_transcript, send_user_text, ChatCompletedEvt, ChatErrorEvt, ChatRequest, ChatSession,
    ChatStarted, ClearTranscript, DualbotPlugin, DualbotSet, EngineRes, TokioRt, TranscriptCleared,
};
pub use request::{build_messages, CompletionRequest, RequestMessage, Role, SYSTEM_PROMPT};
pub use stream::{accumulate, Fragment, FragmentStream};
pub use transcript::{Transcript, Turn};

/// re-export the llm backend selector so `ProviderBackend::new` callers don't
/// need a direct dependency.
pub use llm::builder::LLMBackend;
