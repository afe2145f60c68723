use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }

    pub fn is_user(self) -> bool {
        self == Role::User
    }

    pub fn is_model(self) -> bool {
        self == Role::Model
    }
}

/// Transcript-unique message identifier of the form `<unix-millis>-<sequence>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId(String);

static NEXT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

impl MessageId {
    /// Allocate a fresh identifier. The sequence component is process-wide and
    /// monotonic, so two ids minted in the same millisecond still differ.
    pub fn generate() -> Self {
        let sequence = NEXT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Self(format!("{}-{}", Utc::now().timestamp_millis(), sequence))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub is_streaming: bool,
}

impl Message {
    /// A finished user turn; its content never changes afterwards.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content, false)
    }

    /// An empty model turn that the reconciler fills in as fragments arrive.
    pub fn model_placeholder() -> Self {
        Self::new(Role::Model, String::new(), true)
    }

    /// A finished model turn, used for notices that are not streamed.
    pub fn model(content: impl Into<String>) -> Self {
        Self::new(Role::Model, content, false)
    }

    fn new(role: Role, content: impl Into<String>, is_streaming: bool) -> Self {
        Self {
            id: MessageId::generate(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            is_streaming,
        }
    }

    pub fn is_user(&self) -> bool {
        self.role.is_user()
    }

    pub fn is_model(&self) -> bool {
        self.role.is_model()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        let ids: Vec<MessageId> = (0..64).map(|_| MessageId::generate()).collect();
        for (i, id) in ids.iter().enumerate() {
            assert!(!ids[i + 1..].contains(id), "duplicate id {id}");
        }
    }

    #[test]
    fn constructors_set_streaming_flags() {
        let user = Message::user("hi");
        assert!(user.is_user());
        assert!(!user.is_streaming);
        assert_eq!(user.content, "hi");

        let placeholder = Message::model_placeholder();
        assert!(placeholder.is_model());
        assert!(placeholder.is_streaming);
        assert!(placeholder.content.is_empty());

        let notice = Message::model("oops");
        assert!(!notice.is_streaming);
    }
}
