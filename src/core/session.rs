//! Remote conversational context and its reset lifecycle.
//!
//! The Gemini API is stateless: a "chat" is the turn history replayed with
//! every request. A [`ChatSession`] owns that history together with the model
//! identifier and system instruction it was created with. The
//! [`SessionManager`] hands out the current session and replaces it wholesale
//! on reset; handles to a replaced session refuse to send.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

use crate::api::{Content, GenerateContentRequest};
use crate::core::chat_stream::{FragmentStream, ModelTransport, StreamError};
use crate::core::message::Role;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub model: String,
    pub system_instruction: String,
}

#[derive(Clone)]
pub struct ChatSession {
    generation: u64,
    live_generation: Arc<AtomicU64>,
    settings: Arc<SessionSettings>,
    history: Arc<Mutex<Vec<Content>>>,
    transport: Arc<dyn ModelTransport>,
}

impl ChatSession {
    pub fn model(&self) -> &str {
        &self.settings.model
    }

    pub fn system_instruction(&self) -> &str {
        &self.settings.system_instruction
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True once the owning manager has created a newer session.
    pub fn is_stale(&self) -> bool {
        self.live_generation.load(Ordering::Acquire) != self.generation
    }

    /// Number of completed exchanges recorded in this context.
    pub fn turn_count(&self) -> usize {
        self.history_snapshot().len() / 2
    }

    fn history_snapshot(&self) -> Vec<Content> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Issue one user turn. The returned stream records the exchange in this
    /// session's history when it finishes cleanly; failed turns leave the
    /// history untouched.
    pub async fn send_stream(&self, text: &str) -> Result<FragmentStream, StreamError> {
        if self.is_stale() {
            return Err(StreamError::StaleSession);
        }

        let user_turn = Content::text(Role::User, text);
        let mut contents = self.history_snapshot();
        contents.push(user_turn.clone());

        let request = GenerateContentRequest {
            contents,
            system_instruction: Some(Content::system(self.settings.system_instruction.clone())),
        };

        debug!(
            generation = self.generation,
            model = %self.settings.model,
            "sending turn"
        );
        let stream = self.transport.open_stream(&self.settings.model, request).await?;

        let history = Arc::clone(&self.history);
        let live_generation = Arc::clone(&self.live_generation);
        let generation = self.generation;
        Ok(stream.on_complete(move |reply| {
            if live_generation.load(Ordering::Acquire) != generation {
                return;
            }
            // The API rejects empty text parts, so a reply with no text
            // drops the whole exchange from the replayed history.
            if reply.is_empty() {
                debug!(generation, "not recording exchange with an empty reply");
                return;
            }
            let mut history = history.lock().unwrap_or_else(PoisonError::into_inner);
            history.push(user_turn);
            history.push(Content::text(Role::Model, reply));
        }))
    }
}

pub struct SessionManager {
    settings: Arc<SessionSettings>,
    transport: Arc<dyn ModelTransport>,
    live_generation: Arc<AtomicU64>,
    current: ChatSession,
}

impl SessionManager {
    pub fn new(settings: SessionSettings, transport: Arc<dyn ModelTransport>) -> Self {
        let settings = Arc::new(settings);
        let live_generation = Arc::new(AtomicU64::new(0));
        let current = Self::build(&settings, &transport, &live_generation);
        Self {
            settings,
            transport,
            live_generation,
            current,
        }
    }

    fn build(
        settings: &Arc<SessionSettings>,
        transport: &Arc<dyn ModelTransport>,
        live_generation: &Arc<AtomicU64>,
    ) -> ChatSession {
        let generation = live_generation.fetch_add(1, Ordering::AcqRel) + 1;
        ChatSession {
            generation,
            live_generation: Arc::clone(live_generation),
            settings: Arc::clone(settings),
            history: Arc::new(Mutex::new(Vec::new())),
            transport: Arc::clone(transport),
        }
    }

    /// Establish a fresh context, invalidating every handle issued before.
    pub fn create(&mut self) -> &ChatSession {
        self.current = Self::build(&self.settings, &self.transport, &self.live_generation);
        debug!(generation = self.current.generation, "created chat session");
        &self.current
    }

    /// Abandon the remote conversational memory. The local transcript is the
    /// caller's to clear.
    pub fn reset(&mut self) -> &ChatSession {
        self.create()
    }

    pub fn current(&self) -> &ChatSession {
        &self.current
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::{drain, ScriptedTransport};

    fn manager(transport: &Arc<ScriptedTransport>) -> SessionManager {
        SessionManager::new(
            SessionSettings {
                model: "test-model".into(),
                system_instruction: "Be brief.".into(),
            },
            transport.clone(),
        )
    }

    #[tokio::test]
    async fn request_carries_model_and_system_instruction() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_fragments(["ok"]);
        let sessions = manager(&transport);

        drain(sessions.current().send_stream("Hello").await.expect("open")).await;

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].model, "test-model");
        assert_eq!(
            calls[0].request.system_instruction,
            Some(Content::system("Be brief."))
        );
        assert_eq!(calls[0].request.contents, vec![Content::text(Role::User, "Hello")]);
    }

    #[tokio::test]
    async fn completed_turns_are_replayed_on_the_next_request() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_fragments(["Hi", " there!"]);
        transport.push_fragments(["Fine."]);
        let sessions = manager(&transport);
        let session = sessions.current().clone();

        drain(session.send_stream("Hello").await.expect("open")).await;
        assert_eq!(session.turn_count(), 1);
        drain(session.send_stream("How are you?").await.expect("open")).await;

        let calls = transport.calls();
        assert_eq!(
            calls[1].request.contents,
            vec![
                Content::text(Role::User, "Hello"),
                Content::text(Role::Model, "Hi there!"),
                Content::text(Role::User, "How are you?"),
            ]
        );
    }

    #[tokio::test]
    async fn failed_turns_are_not_recorded() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_failure_after(["Par"], "connection reset");
        let sessions = manager(&transport);
        let session = sessions.current().clone();

        drain(session.send_stream("Hello").await.expect("open")).await;
        assert_eq!(session.turn_count(), 0);
    }

    #[tokio::test]
    async fn empty_replies_are_not_replayed() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_fragments(Vec::<String>::new());
        transport.push_fragments(["ok"]);
        let sessions = manager(&transport);
        let session = sessions.current().clone();

        drain(session.send_stream("first").await.expect("open")).await;
        assert_eq!(session.turn_count(), 0);
        drain(session.send_stream("second").await.expect("open")).await;

        let calls = transport.calls();
        assert_eq!(calls[1].request.contents, vec![Content::text(Role::User, "second")]);
        assert!(calls[1]
            .request
            .contents
            .iter()
            .flat_map(|content| &content.parts)
            .all(|part| !part.text.is_empty()));
        assert_eq!(session.turn_count(), 1);
    }

    #[tokio::test]
    async fn reset_starts_from_an_empty_context() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_fragments(["first"]);
        transport.push_fragments(["second"]);
        let mut sessions = manager(&transport);

        drain(sessions.current().send_stream("one").await.expect("open")).await;
        sessions.reset();
        drain(sessions.current().send_stream("two").await.expect("open")).await;

        let calls = transport.calls();
        assert_eq!(calls[1].request.contents, vec![Content::text(Role::User, "two")]);
        assert_eq!(sessions.current().turn_count(), 1);
    }

    #[tokio::test]
    async fn stale_handles_refuse_to_send() {
        let transport = Arc::new(ScriptedTransport::new());
        let mut sessions = manager(&transport);
        let old = sessions.current().clone();
        sessions.reset();

        assert!(old.is_stale());
        assert!(!sessions.current().is_stale());
        assert!(sessions.current().generation() > old.generation());
        let result = old.send_stream("hello").await;
        assert!(matches!(result, Err(StreamError::StaleSession)));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn stream_finishing_after_reset_does_not_touch_new_context() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_fragments(["late"]);
        let mut sessions = manager(&transport);
        let old = sessions.current().clone();

        let stream = old.send_stream("hello").await.expect("open");
        sessions.reset();
        drain(stream).await;

        assert_eq!(old.turn_count(), 0);
        assert_eq!(sessions.current().turn_count(), 0);
    }
}
