//! Folds a live fragment stream into the transcript, one turn at a time.
//!
//! A turn moves `Idle -> Streaming -> Idle`. [`Reconciler::submit`] appends
//! the user message and the empty model placeholder in one synchronous step,
//! before any network activity, so no intermediate sending state is ever
//! observable. Fragments then overwrite the placeholder with
//! everything accumulated so far; completion clears its streaming flag, and
//! failure leaves it untouched and appends a fixed notice instead.
//!
//! Events carry the [`TurnId`] they belong to. Events for anything other than
//! the active turn are dropped, which is what keeps a stream abandoned by a
//! reset from writing into the fresh transcript.

use std::fmt;

use tracing::{debug, warn};

use crate::core::chat_stream::{FragmentStream, StreamError};
use crate::core::constants::FAILURE_NOTICE;
use crate::core::conversation::ConversationStore;
use crate::core::message::{Message, MessageId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TurnId(u64);

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "turn-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TurnState {
    #[default]
    Idle,
    Streaming {
        turn: TurnId,
        placeholder: MessageId,
        accumulated: String,
    },
}

impl TurnState {
    pub fn turn(&self) -> Option<TurnId> {
        match self {
            TurnState::Idle => None,
            TurnState::Streaming { turn, .. } => Some(*turn),
        }
    }
}

/// What the caller needs to open the stream for an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTurn {
    pub turn: TurnId,
    pub prompt: String,
    pub placeholder: MessageId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed,
    Failed,
}

#[derive(Debug, Default)]
pub struct Reconciler {
    store: ConversationStore,
    state: TurnState,
    next_turn: u64,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn state(&self) -> &TurnState {
        &self.state
    }

    pub fn is_busy(&self) -> bool {
        !matches!(self.state, TurnState::Idle)
    }

    pub fn active_turn(&self) -> Option<TurnId> {
        self.state.turn()
    }

    /// The placeholder currently receiving fragments, if any.
    pub fn streaming_message(&self) -> Option<&MessageId> {
        match &self.state {
            TurnState::Streaming { placeholder, .. } => Some(placeholder),
            _ => None,
        }
    }

    /// Start a turn for `input`. Returns `None`, leaving everything untouched,
    /// when the trimmed input is empty or another turn is still running.
    pub fn submit(&mut self, input: &str) -> Option<PendingTurn> {
        let prompt = input.trim();
        if prompt.is_empty() {
            debug!("ignoring empty submission");
            return None;
        }
        if self.is_busy() {
            debug!(active = ?self.active_turn(), "ignoring submission while a turn is running");
            return None;
        }

        self.next_turn += 1;
        let turn = TurnId(self.next_turn);

        self.store.append(Message::user(prompt));

        let placeholder = Message::model_placeholder();
        let placeholder_id = placeholder.id.clone();
        self.store.append(placeholder);
        self.state = TurnState::Streaming {
            turn,
            placeholder: placeholder_id.clone(),
            accumulated: String::new(),
        };

        debug!(%turn, "turn started");
        Some(PendingTurn {
            turn,
            prompt: prompt.to_string(),
            placeholder: placeholder_id,
        })
    }

    /// Fold one fragment into the active placeholder. The placeholder's
    /// content is replaced with the full accumulated text, never appended to.
    pub fn apply_fragment(&mut self, turn: TurnId, fragment: &str) -> bool {
        let TurnState::Streaming {
            turn: active,
            placeholder,
            accumulated,
        } = &mut self.state
        else {
            return false;
        };
        if *active != turn {
            return false;
        }

        accumulated.push_str(fragment);
        let content = accumulated.clone();
        self.store
            .update(placeholder, move |message| message.content = content)
    }

    pub fn complete(&mut self, turn: TurnId) -> Option<TurnOutcome> {
        if self.active_turn() != Some(turn) {
            return None;
        }

        if let TurnState::Streaming { placeholder, .. } = std::mem::take(&mut self.state) {
            self.store
                .update(&placeholder, |message| message.is_streaming = false);
        }
        debug!(%turn, "turn completed");
        Some(TurnOutcome::Completed)
    }

    /// End the active turn with the failure notice. The placeholder keeps
    /// whatever it had accumulated and its streaming flag.
    pub fn fail(&mut self, turn: TurnId, error: &StreamError) -> Option<TurnOutcome> {
        if self.active_turn() != Some(turn) {
            return None;
        }

        warn!(%turn, "chat stream failed: {error}");
        self.state = TurnState::Idle;
        self.store.append(Message::model(FAILURE_NOTICE));
        Some(TurnOutcome::Failed)
    }

    /// Drop the transcript and abandon any running turn.
    pub fn reset(&mut self) {
        if let Some(turn) = self.active_turn() {
            debug!(%turn, "abandoning turn on reset");
        }
        self.state = TurnState::Idle;
        self.store.clear();
    }

    /// Pull `stream` to its end on the current task, folding every fragment
    /// into the turn. `on_fragment` sees each fragment after it is applied.
    pub async fn drive<F>(
        &mut self,
        turn: TurnId,
        mut stream: FragmentStream,
        mut on_fragment: F,
    ) -> TurnOutcome
    where
        F: FnMut(&str),
    {
        while let Some(item) = stream.next_fragment().await {
            match item {
                Ok(fragment) => {
                    self.apply_fragment(turn, &fragment);
                    on_fragment(&fragment);
                }
                Err(err) => return self.fail(turn, &err).unwrap_or(TurnOutcome::Failed),
            }
        }
        self.complete(turn).unwrap_or(TurnOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::Role;

    fn contents(reconciler: &Reconciler) -> Vec<(Role, String, bool)> {
        reconciler
            .store()
            .messages()
            .iter()
            .map(|m| (m.role, m.content.clone(), m.is_streaming))
            .collect()
    }

    #[test]
    fn submit_appends_user_message_then_placeholder() {
        let mut reconciler = Reconciler::new();
        let turn = reconciler.submit("  Hello \n").expect("accepted");

        assert_eq!(turn.prompt, "Hello");
        assert_eq!(
            contents(&reconciler),
            vec![
                (Role::User, "Hello".to_string(), false),
                (Role::Model, String::new(), true),
            ]
        );
        assert_eq!(reconciler.streaming_message(), Some(&turn.placeholder));
        assert!(reconciler.is_busy());
    }

    #[test]
    fn submit_leaves_the_turn_streaming_into_its_placeholder() {
        let mut reconciler = Reconciler::new();
        assert_eq!(reconciler.state(), &TurnState::Idle);

        let pending = reconciler.submit("Hello").expect("accepted");
        assert_eq!(
            reconciler.state(),
            &TurnState::Streaming {
                turn: pending.turn,
                placeholder: pending.placeholder.clone(),
                accumulated: String::new(),
            }
        );
        assert_eq!(reconciler.streaming_message(), Some(&pending.placeholder));

        reconciler.complete(pending.turn).expect("active turn");
        assert_eq!(reconciler.state(), &TurnState::Idle);
    }

    #[test]
    fn blank_input_is_rejected_without_side_effects() {
        let mut reconciler = Reconciler::new();
        for input in ["", "   ", "\n\t  \n"] {
            assert!(reconciler.submit(input).is_none());
        }
        assert!(reconciler.store().is_empty());
        assert_eq!(reconciler.state(), &TurnState::Idle);
    }

    #[test]
    fn second_submission_while_busy_is_rejected() {
        let mut reconciler = Reconciler::new();
        reconciler.submit("first").expect("accepted");
        let len = reconciler.store().len();

        assert!(reconciler.submit("second").is_none());
        assert_eq!(reconciler.store().len(), len);
        let users = reconciler
            .store()
            .messages()
            .iter()
            .filter(|m| m.is_user())
            .count();
        assert_eq!(users, 1);
    }

    #[test]
    fn fragments_replace_content_with_running_concatenation() {
        let mut reconciler = Reconciler::new();
        let turn = reconciler.submit("Hello").expect("accepted");
        let fragments = ["Hi", " there", "!", " How", " can I help?"];

        let mut expected = String::new();
        for fragment in fragments {
            expected.push_str(fragment);
            assert!(reconciler.apply_fragment(turn.turn, fragment));
            let placeholder = reconciler.store().get(&turn.placeholder).expect("placeholder");
            assert_eq!(placeholder.content, expected);
            assert!(placeholder.is_streaming);
        }

        assert_eq!(reconciler.complete(turn.turn), Some(TurnOutcome::Completed));
        let placeholder = reconciler.store().get(&turn.placeholder).expect("placeholder");
        assert_eq!(placeholder.content, "Hi there! How can I help?");
        assert!(!placeholder.is_streaming);
        assert!(!reconciler.is_busy());
    }

    #[test]
    fn completion_without_fragments_leaves_empty_reply() {
        let mut reconciler = Reconciler::new();
        let turn = reconciler.submit("Hello").expect("accepted");
        reconciler.complete(turn.turn);

        assert_eq!(
            contents(&reconciler),
            vec![
                (Role::User, "Hello".to_string(), false),
                (Role::Model, String::new(), false),
            ]
        );
    }

    #[test]
    fn failure_keeps_placeholder_and_appends_notice() {
        let mut reconciler = Reconciler::new();
        let turn = reconciler.submit("Hello").expect("accepted");
        reconciler.apply_fragment(turn.turn, "Par");

        let outcome = reconciler.fail(turn.turn, &StreamError::Payload("reset".into()));

        assert_eq!(outcome, Some(TurnOutcome::Failed));
        assert_eq!(
            contents(&reconciler),
            vec![
                (Role::User, "Hello".to_string(), false),
                (Role::Model, "Par".to_string(), true),
                (Role::Model, FAILURE_NOTICE.to_string(), false),
            ]
        );
        assert!(!reconciler.is_busy());
        assert!(reconciler.submit("again").is_some());
    }

    #[test]
    fn events_for_other_turns_are_ignored() {
        let mut reconciler = Reconciler::new();
        let first = reconciler.submit("one").expect("accepted");
        reconciler.complete(first.turn);
        let second = reconciler.submit("two").expect("accepted");

        assert!(!reconciler.apply_fragment(first.turn, "stale"));
        assert_eq!(reconciler.complete(first.turn), None);
        assert_eq!(
            reconciler.fail(first.turn, &StreamError::StaleSession),
            None
        );
        assert_eq!(reconciler.active_turn(), Some(second.turn));
        assert_eq!(reconciler.store().len(), 4);
    }

    #[test]
    fn reset_clears_log_and_abandons_turn() {
        let mut reconciler = Reconciler::new();
        let turn = reconciler.submit("Hello").expect("accepted");
        reconciler.apply_fragment(turn.turn, "Hi");

        reconciler.reset();
        assert!(reconciler.store().is_empty());
        assert!(!reconciler.is_busy());

        assert!(!reconciler.apply_fragment(turn.turn, " there"));
        assert_eq!(reconciler.complete(turn.turn), None);
        assert!(reconciler.store().is_empty());
    }

    #[tokio::test]
    async fn drive_folds_stream_and_reports_each_fragment() {
        let mut reconciler = Reconciler::new();
        let turn = reconciler.submit("Hello").expect("accepted");
        let stream = FragmentStream::from_fragments(vec![
            Ok("Hi".to_string()),
            Ok(" there!".to_string()),
        ]);

        let mut seen = Vec::new();
        let outcome = reconciler
            .drive(turn.turn, stream, |fragment| seen.push(fragment.to_string()))
            .await;

        assert_eq!(outcome, TurnOutcome::Completed);
        assert_eq!(seen, vec!["Hi", " there!"]);
        let reply = reconciler.store().get(&turn.placeholder).expect("placeholder");
        assert_eq!(reply.content, "Hi there!");
        assert!(!reply.is_streaming);
    }

    #[tokio::test]
    async fn drive_stops_at_first_error() {
        let mut reconciler = Reconciler::new();
        let turn = reconciler.submit("Hello").expect("accepted");
        let stream = FragmentStream::from_fragments(vec![
            Ok("Par".to_string()),
            Err(StreamError::Payload("cut".into())),
        ]);

        let outcome = reconciler.drive(turn.turn, stream, |_| {}).await;

        assert_eq!(outcome, TurnOutcome::Failed);
        let last = reconciler.store().last().expect("notice");
        assert_eq!(last.content, FAILURE_NOTICE);
        assert!(reconciler.store().get(&turn.placeholder).expect("kept").is_streaming);
    }
}
