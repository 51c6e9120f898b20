use thiserror::Error;

/// startup failures. fatal: the caller halts before any turn is attempted.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} not set")]
    MissingApiKey { var: &'static str },
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// transport/api failures for one turn. never escapes `Engine::respond`;
/// the display text is what lands in the transcript after `Error: `.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Http(#[from] ureq::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Provider(#[from] llm::error::LLMError),
    #[error("malformed stream chunk: {0}")]
    Malformed(String),
    /// non-2xx answer; `message` is the api's own error text when it sent one.
    #[error("error code: {status} - {message}")]
    Status { status: u16, message: String },
    #[error("{0}")]
    Backend(String),
}

impl EngineError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_names_the_variable() {
        let err = ConfigError::MissingApiKey { var: "GROQ_API_KEY" };
        assert_eq!(err.to_string(), "GROQ_API_KEY not set");
    }

    #[test]
    fn backend_error_is_the_raw_message() {
        assert_eq!(EngineError::backend("connection refused").to_string(), "connection refused");
        assert_eq!(
            EngineError::Malformed("expected value".into()).to_string(),
            "malformed stream chunk: expected value"
        );
        assert_eq!(
            EngineError::Status { status: 401, message: "Invalid API Key".into() }.to_string(),
            "error code: 401 - Invalid API Key"
        );
    }
}
