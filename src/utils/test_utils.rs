use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::api::GenerateContentRequest;
use crate::core::app::App;
use crate::core::chat_stream::{FragmentStream, ModelTransport, StreamError};
use crate::core::session::{SessionManager, SessionSettings};

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub model: String,
    pub request: GenerateContentRequest,
}

enum Script {
    Fragments(Vec<String>),
    FailAfter(Vec<String>, String),
    OpenFailure(String),
}

/// Transport double that replays queued scripts, one per opened stream, and
/// records every request it receives. Streams opened with nothing queued end
/// immediately without producing text.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<VecDeque<Script>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_fragments<I, S>(&self, fragments: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fragments = fragments.into_iter().map(Into::into).collect();
        self.scripts
            .lock()
            .unwrap()
            .push_back(Script::Fragments(fragments));
    }

    pub fn push_failure_after<I, S>(&self, fragments: I, error: &str)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fragments = fragments.into_iter().map(Into::into).collect();
        self.scripts
            .lock()
            .unwrap()
            .push_back(Script::FailAfter(fragments, error.to_string()));
    }

    pub fn push_open_failure(&self, error: &str) {
        self.scripts
            .lock()
            .unwrap()
            .push_back(Script::OpenFailure(error.to_string()));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelTransport for ScriptedTransport {
    async fn open_stream(
        &self,
        model: &str,
        request: GenerateContentRequest,
    ) -> Result<FragmentStream, StreamError> {
        self.calls.lock().unwrap().push(RecordedCall {
            model: model.to_string(),
            request,
        });

        let script = self.scripts.lock().unwrap().pop_front();
        match script {
            None => Ok(FragmentStream::from_fragments(
                Vec::<Result<String, StreamError>>::new(),
            )),
            Some(Script::Fragments(fragments)) => Ok(FragmentStream::from_fragments(
                fragments.into_iter().map(Ok::<String, StreamError>).collect::<Vec<_>>(),
            )),
            Some(Script::FailAfter(fragments, error)) => {
                let mut items: Vec<Result<String, StreamError>> =
                    fragments.into_iter().map(Ok).collect();
                items.push(Err(StreamError::Payload(error)));
                Ok(FragmentStream::from_fragments(items))
            }
            Some(Script::OpenFailure(error)) => Err(StreamError::Api {
                status: 503,
                message: error,
            }),
        }
    }
}

/// Pull a stream to its end, returning the fragments seen before it stopped.
pub async fn drain(mut stream: FragmentStream) -> Vec<String> {
    let mut fragments = Vec::new();
    while let Some(item) = stream.next_fragment().await {
        match item {
            Ok(fragment) => fragments.push(fragment),
            Err(_) => break,
        }
    }
    fragments
}

pub fn test_settings() -> SessionSettings {
    SessionSettings {
        model: "test-model".to_string(),
        system_instruction: "You are a test.".to_string(),
    }
}

pub fn create_test_app_with(transport: Arc<ScriptedTransport>) -> App {
    App::new(SessionManager::new(test_settings(), transport))
}

pub fn create_test_app() -> App {
    create_test_app_with(Arc::new(ScriptedTransport::new()))
}
