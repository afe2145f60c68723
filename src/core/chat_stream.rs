use std::collections::VecDeque;
use std::pin::Pin;

use async_trait::async_trait;
use futures_util::stream::{self, Stream, StreamExt};
use memchr::memchr;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::api::{ErrorEnvelope, GenerateContentRequest, GenerateContentResponse};
use crate::core::reconciler::TurnId;
use crate::core::session::ChatSession;
use crate::utils::url::construct_api_url;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("no API key configured (set GEMINI_API_KEY)")]
    MissingApiKey,

    #[error("the session was reset; this handle is no longer valid")]
    StaleSession,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("unexpected stream payload: {0}")]
    Payload(String),
}

pub type BoxFragmentStream = Pin<Box<dyn Stream<Item = Result<String, StreamError>> + Send>>;

type CompletionHook = Box<dyn FnOnce(String) + Send>;

/// Pull-based sequence of text fragments for a single model turn.
///
/// The stream is finite and cannot be restarted: after the last fragment it
/// yields `None`, and after an error it yields that error exactly once and
/// then `None` forever. Fragments without text are skipped.
pub struct FragmentStream {
    inner: BoxFragmentStream,
    finished: bool,
    collected: String,
    on_complete: Option<CompletionHook>,
}

impl FragmentStream {
    pub fn new<S>(inner: S) -> Self
    where
        S: Stream<Item = Result<String, StreamError>> + Send + 'static,
    {
        Self {
            inner: Box::pin(inner),
            finished: false,
            collected: String::new(),
            on_complete: None,
        }
    }

    pub fn from_fragments<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Result<String, StreamError>>,
        I::IntoIter: Send + 'static,
    {
        Self::new(stream::iter(items))
    }

    /// Run `hook` with the full reply text once the stream ends cleanly.
    /// The hook is dropped without running if the stream errors.
    pub(crate) fn on_complete<F>(mut self, hook: F) -> Self
    where
        F: FnOnce(String) + Send + 'static,
    {
        self.on_complete = Some(Box::new(hook));
        self
    }

    pub async fn next_fragment(&mut self) -> Option<Result<String, StreamError>> {
        loop {
            if self.finished {
                return None;
            }

            match self.inner.next().await {
                Some(Ok(fragment)) if fragment.is_empty() => continue,
                Some(Ok(fragment)) => {
                    self.collected.push_str(&fragment);
                    return Some(Ok(fragment));
                }
                Some(Err(err)) => {
                    self.finished = true;
                    self.on_complete = None;
                    return Some(Err(err));
                }
                None => {
                    self.finished = true;
                    if let Some(hook) = self.on_complete.take() {
                        hook(std::mem::take(&mut self.collected));
                    }
                    return None;
                }
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

/// The seam between sessions and the network.
#[async_trait]
pub trait ModelTransport: Send + Sync {
    async fn open_stream(
        &self,
        model: &str,
        request: GenerateContentRequest,
    ) -> Result<FragmentStream, StreamError>;
}

/// Streams replies from the Gemini REST API over server-sent events.
pub struct GeminiTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl GeminiTransport {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key,
        }
    }

    fn stream_url(&self, model: &str) -> String {
        construct_api_url(
            &self.base_url,
            &format!("models/{model}:streamGenerateContent?alt=sse"),
        )
    }
}

#[async_trait]
impl ModelTransport for GeminiTransport {
    async fn open_stream(
        &self,
        model: &str,
        request: GenerateContentRequest,
    ) -> Result<FragmentStream, StreamError> {
        let api_key = self.api_key.as_deref().ok_or(StreamError::MissingApiKey)?;
        let url = self.stream_url(model);
        debug!(%url, turns = request.contents.len(), "opening stream");

        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(StreamError::Api {
                status: status.as_u16(),
                message: format_api_error(&error_text),
            });
        }

        Ok(FragmentStream::new(sse_fragments(response.bytes_stream())))
    }
}

fn extract_data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

/// Parse one `data:` payload into the text it carries.
fn parse_data_payload(payload: &str) -> Result<Option<String>, StreamError> {
    if payload.trim().is_empty() {
        return Ok(None);
    }

    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(payload) {
        return Err(StreamError::Api {
            status: envelope.error.code.unwrap_or(500),
            message: envelope.error.summary(),
        });
    }

    match serde_json::from_str::<GenerateContentResponse>(payload) {
        Ok(response) => Ok(response.text()),
        Err(_) => Err(StreamError::Payload(format_api_error(payload))),
    }
}

fn format_api_error(error_text: &str) -> String {
    let trimmed = error_text.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    match serde_json::from_str::<ErrorEnvelope>(trimmed) {
        Ok(envelope) => envelope.error.summary(),
        Err(_) => trimmed.split_whitespace().collect::<Vec<_>>().join(" "),
    }
}

struct SseState<S> {
    bytes: S,
    buffer: Vec<u8>,
    pending: VecDeque<Result<String, StreamError>>,
    exhausted: bool,
}

impl<S> SseState<S> {
    fn drain_complete_lines(&mut self) {
        while let Some(newline_pos) = memchr(b'\n', &self.buffer) {
            let line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            self.process_line(&line[..newline_pos]);
            if self.exhausted {
                return;
            }
        }
    }

    fn flush_tail(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let tail = std::mem::take(&mut self.buffer);
        self.process_line(&tail);
    }

    fn process_line(&mut self, raw: &[u8]) {
        let line = match std::str::from_utf8(raw) {
            Ok(s) => s.trim(),
            Err(e) => {
                warn!("invalid UTF-8 in stream: {e}");
                return;
            }
        };

        let Some(payload) = extract_data_payload(line) else {
            return;
        };

        match parse_data_payload(payload) {
            Ok(Some(text)) => self.pending.push_back(Ok(text)),
            Ok(None) => {}
            Err(err) => {
                self.pending.push_back(Err(err));
                self.exhausted = true;
            }
        }
    }
}

/// Turn an SSE byte stream into text fragments, in arrival order.
pub(crate) fn sse_fragments<S, B>(bytes: S) -> impl Stream<Item = Result<String, StreamError>> + Send
where
    S: Stream<Item = Result<B, reqwest::Error>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let state = SseState {
        bytes: Box::pin(bytes),
        buffer: Vec::new(),
        pending: VecDeque::new(),
        exhausted: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.exhausted {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    state.buffer.extend_from_slice(chunk.as_ref());
                    state.drain_complete_lines();
                }
                Some(Err(err)) => {
                    state.pending.push_back(Err(StreamError::Http(err)));
                    state.exhausted = true;
                }
                None => {
                    state.flush_tail();
                    state.exhausted = true;
                }
            }
        }
    })
}

#[derive(Debug)]
pub enum StreamMessage {
    Chunk(String),
    Error(StreamError),
    End,
}

pub struct StreamParams {
    pub session: ChatSession,
    pub prompt: String,
    pub turn: TurnId,
}

/// Runs each turn's stream on a background task and forwards its fragments,
/// tagged with the turn id, to the event loop.
#[derive(Clone)]
pub struct ChatStreamService {
    tx: mpsc::UnboundedSender<(StreamMessage, TurnId)>,
}

impl ChatStreamService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(StreamMessage, TurnId)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn spawn_stream(&self, params: StreamParams) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let StreamParams {
                session,
                prompt,
                turn,
            } = params;

            let mut stream = match session.send_stream(&prompt).await {
                Ok(stream) => stream,
                Err(err) => {
                    let _ = tx.send((StreamMessage::Error(err), turn));
                    return;
                }
            };

            while let Some(item) = stream.next_fragment().await {
                match item {
                    Ok(fragment) => {
                        let _ = tx.send((StreamMessage::Chunk(fragment), turn));
                    }
                    Err(err) => {
                        let _ = tx.send((StreamMessage::Error(err), turn));
                        return;
                    }
                }
            }

            let _ = tx.send((StreamMessage::End, turn));
        });
    }
}
