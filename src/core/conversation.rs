//! Append-only transcript of the current conversation.

use crate::core::message::{Message, MessageId};

/// Ordered message log. Insertion order is display order; messages are never
/// removed individually or reordered, only mutated in place by id or dropped
/// all at once by [`ConversationStore::clear`].
#[derive(Debug, Default)]
pub struct ConversationStore {
    messages: Vec<Message>,
    revision: u64,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
        self.touch();
    }

    /// Apply `f` to the message with identifier `id`. Returns `false` without
    /// touching anything when no message matches.
    pub fn update<F>(&mut self, id: &MessageId, f: F) -> bool
    where
        F: FnOnce(&mut Message),
    {
        match self.messages.iter_mut().find(|msg| &msg.id == id) {
            Some(message) => {
                f(message);
                self.touch();
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.touch();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|msg| &msg.id == id)
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Monotonic counter bumped by every mutation; views compare it against the
    /// value they last rendered to decide whether a redraw is due.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}
