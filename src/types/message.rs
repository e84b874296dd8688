use serde::{Deserialize, Serialize};

use crate::types::Role;

/// One role-tagged entry in a conversation.
///
/// Messages are immutable once built; the transcript only ever appends them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// The author of the message.
    pub role: Role,

    /// The text of the message.
    pub content: String,
}

impl Message {
    /// Create a new `Message` with the given role and content.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

impl From<&str> for Message {
    fn from(content: &str) -> Self {
        Self::user(content)
    }
}

impl From<String> for Message {
    fn from(content: String) -> Self {
        Self::user(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn wire_shape() {
        let message = Message::system("you are a helpful assistant.");
        assert_eq!(
            to_value(&message).unwrap(),
            json!({
                "role": "system",
                "content": "you are a helpful assistant."
            })
        );
    }

    #[test]
    fn drafts_default_to_user() {
        let message: Message = "Where is my order?".into();
        assert_eq!(message.role, Role::User);
        let message: Message = String::from("And the refund?").into();
        assert_eq!(message, Message::user("And the refund?"));
    }
}
