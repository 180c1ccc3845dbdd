//! 会话记录：只追加的 user/assistant 消息序列
//!
//! 与短期记忆不同，这里不剪枝、不改写：每轮对话恰好追加一条 user 与一条 assistant。

use serde::{Deserialize, Serialize};

/// 消息角色：会话记录里只有 user 与 assistant
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// 单条消息
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// 会话记录，最旧在前
#[derive(Clone, Debug, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::assistant("hi")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }

    #[test]
    fn test_only_user_and_assistant_roles() {
        assert!(serde_json::from_str::<Role>(r#""user""#).is_ok());
        assert!(serde_json::from_str::<Role>(r#""system""#).is_err());
    }

    #[test]
    fn test_appends_keep_order() {
        let mut t = Transcript::new();
        t.push_user("q1");
        t.push_assistant("a1");
        t.push_user("q2");
        let roles: Vec<Role> = t.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User]);
        assert_eq!(t.messages().last().map(|m| m.content.as_str()), Some("q2"));
    }
}
