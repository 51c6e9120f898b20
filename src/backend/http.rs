use std::io::{BufRead, BufReader, Read};

use async_trait::async_trait;
use flume::Sender;
use serde::Deserialize;

use super::CompletionBackend;
use crate::config::Config;
use crate::error::EngineError;
use crate::request::CompletionRequest;
use crate::stream::{decode_sse_line, Fragment, FragmentStream, SseLine};

/// fragments buffered between the blocking reader and the async consumer.
const CHANNEL_CAPACITY: usize = 256;

/// most of an error body kept for the transcript.
const ERROR_BODY_LIMIT: u64 = 8 * 1024;

/// openai-compatible streaming client (groq by default).
///
/// `ureq` is blocking, so each call runs on a tokio blocking worker that
/// decodes the event stream line by line and forwards fragments through a
/// bounded `flume` channel. must be called from within a tokio runtime.
#[derive(Clone)]
pub struct HttpBackend {
    agent: ureq::Agent,
    endpoint: String,
    api_key: String,
}

impl HttpBackend {
    pub fn new(config: &Config) -> Self {
        Self {
            // statuses are checked by hand so the api's error body survives
            agent: ureq::Agent::config_builder()
                .http_status_as_error(false)
                .build()
                .into(),
            endpoint: config.endpoint.clone(),
            api_key: config.api_key().to_string(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend").field("endpoint", &self.endpoint).finish_non_exhaustive()
    }
}

#[async_trait]
impl CompletionBackend for HttpBackend {
    async fn stream(&self, request: &CompletionRequest) -> Result<FragmentStream, EngineError> {
        let (tx, rx) = flume::bounded(CHANNEL_CAPACITY);
        let agent = self.agent.clone();
        let endpoint = self.endpoint.clone();
        let api_key = self.api_key.clone();
        let request = request.clone();

        tracing::debug!(target: "dualbot", "http stream -> {} (msgs={})", endpoint, request.messages.len());
        tokio::task::spawn_blocking(move || pump(&agent, &endpoint, &api_key, &request, &tx));

        Ok(Box::pin(rx.into_stream()))
    }
}

/// runs on the blocking worker. every outcome, including connect and status
/// failures, is delivered through `tx`; dropping `tx` ends the stream.
fn pump(
    agent: &ureq::Agent,
    endpoint: &str,
    api_key: &str,
    request: &CompletionRequest,
    tx: &Sender<Result<Fragment, EngineError>>,
) {
    let response = match agent
        .post(endpoint)
        .header("authorization", &format!("Bearer {}", api_key))
        .header("accept", "text/event-stream")
        .send_json(request)
    {
        Ok(response) => response,
        Err(err) => {
            tracing::error!(target: "dualbot", "completion request failed: {}", err);
            let _ = tx.send(Err(err.into()));
            return;
        }
    };

    let status = response.status();
    if !status.is_success() {
        let mut body = String::new();
        let _ = response
            .into_body()
            .into_reader()
            .take(ERROR_BODY_LIMIT)
            .read_to_string(&mut body);
        let err = EngineError::Status {
            status: status.as_u16(),
            message: error_message(&body, status.canonical_reason()),
        };
        tracing::error!(target: "dualbot", "completion request rejected: {}", err);
        let _ = tx.send(Err(err));
        return;
    }

    let reader = BufReader::new(response.into_body().into_reader());
    for line in reader.lines() {
        let decoded = line.map_err(EngineError::from).and_then(|l| decode_sse_line(&l));
        let item = match decoded {
            Ok(SseLine::Fragment(fragment)) => Ok(fragment),
            Ok(SseLine::Done) => return,
            Ok(SseLine::Skip) => continue,
            Err(err) => {
                tracing::error!(target: "dualbot", "streaming error: {}", err);
                let _ = tx.send(Err(err));
                return;
            }
        };
        if tx.send(item).is_err() {
            tracing::warn!(target: "dualbot", "stream receiver dropped; closing connection");
            return;
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// `{"error":{"message":..}}` when the api sent one, else the raw body, else
/// the status reason.
fn error_message(body: &str, reason: Option<&str>) -> String {
    if let Ok(ErrorBody { error }) = serde_json::from_str::<ErrorBody>(body) {
        return error.message;
    }
    let body = body.trim();
    if !body.is_empty() {
        return body.to_string();
    }
    reason.unwrap_or("no response body").to_string()
}
