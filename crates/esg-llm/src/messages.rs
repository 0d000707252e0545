//! Conversation messages
//!
//! Every call in the pipeline is plain text: a single user turn for chat,
//! and user/assistant/user for the two-turn Qwen research exchange.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    /// Wire name shared by DashScope and Gemini
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Trimmed content, `None` when blank
    pub fn text(&self) -> Option<&str> {
        Some(self.content.trim()).filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_is_trimmed() {
        let msg = Message::user("  请继续  ");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.text(), Some("请继续"));
    }

    #[test]
    fn test_blank_text() {
        assert_eq!(Message::assistant("  \n ").text(), None);
    }

    #[test]
    fn test_role_wire_names() {
        let json = serde_json::to_value(Message::system("规则")).unwrap();
        assert_eq!(json["role"], Role::System.as_str());

        let back: Message = serde_json::from_value(json).unwrap();
        assert_eq!(back, Message::new(Role::System, "规则"));
    }
}
