//! Top-level application state driven by the chat loop.
//!
//! [`App`] owns the session manager, the reconciler (and through it the
//! transcript), and the UI state. All mutation happens through
//! [`apply_action`] on the event-loop task; side effects that need the
//! network come back out as [`AppCommand`]s for the loop to execute.

use crate::core::conversation::ConversationStore;
use crate::core::reconciler::Reconciler;
use crate::core::session::SessionManager;

pub mod actions;
pub mod ui_state;

pub use actions::{apply_action, apply_actions, AppAction, AppCommand};
pub use ui_state::{UiMode, UiState};

pub struct App {
    pub sessions: SessionManager,
    pub reconciler: Reconciler,
    pub ui: UiState,
}

impl App {
    pub fn new(sessions: SessionManager) -> Self {
        Self {
            sessions,
            reconciler: Reconciler::new(),
            ui: UiState::new(),
        }
    }

    pub fn transcript(&self) -> &ConversationStore {
        self.reconciler.store()
    }

    pub fn model(&self) -> &str {
        self.sessions.current().model()
    }

    pub fn is_busy(&self) -> bool {
        self.reconciler.is_busy()
    }

    /// Whether the send affordance is enabled.
    pub fn can_send(&self) -> bool {
        !self.is_busy() && self.ui.has_input()
    }

    /// Discard the transcript and the remote context together so the log never
    /// refers to turns the model no longer remembers.
    pub fn reset_conversation(&mut self) {
        self.reconciler.reset();
        self.sessions.reset();
        self.ui.follow_output();
        self.ui.clear_status();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::create_test_app;

    #[test]
    fn send_is_disabled_for_blank_input_and_while_busy() {
        let mut app = create_test_app();
        assert!(!app.can_send());

        app.ui.set_input_text("hello");
        assert!(app.can_send());

        app.reconciler.submit("in flight").expect("accepted");
        assert!(!app.can_send());
    }

    #[test]
    fn reset_clears_transcript_and_replaces_session() {
        let mut app = create_test_app();
        app.reconciler.submit("hello").expect("accepted");
        let before = app.sessions.current().generation();

        app.reset_conversation();

        assert!(app.transcript().is_empty());
        assert!(!app.is_busy());
        assert!(app.sessions.current().generation() > before);
        assert_eq!(app.model(), "test-model");
    }
}
