//! Chat messages sent to a model provider.
//!
//! The agent renders its whole prompt into a single user message; providers
//! map [`Role`] onto their own wire representation.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
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

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let value = serde_json::to_value(Message::user("Find invoices for Alice Johnson")).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"role": "user", "content": "Find invoices for Alice Johnson"})
        );
    }

    #[test]
    fn test_role_round_trips_from_lowercase() {
        let msg: Message = serde_json::from_str(r#"{"role":"assistant","content":"ok"}"#).unwrap();
        assert_eq!(msg, Message::assistant("ok"));
    }
}
