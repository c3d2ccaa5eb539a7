use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::turn::TurnId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One visible transcript entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub turn: Option<TurnId>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>, turn: Option<TurnId>) -> Self {
        Self {
            role,
            content: content.into(),
            turn,
            timestamp: Utc::now(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content, None)
    }

    pub fn user(content: impl Into<String>, turn: TurnId) -> Self {
        Self::new(Role::User, content, Some(turn))
    }

    pub fn assistant(content: impl Into<String>, turn: TurnId) -> Self {
        Self::new(Role::Assistant, content, Some(turn))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serialization() {
        let msg = Message::assistant("Calculation result: 345", TurnId::new(2));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["turn"], 2);

        let system = serde_json::to_value(Message::system("reset")).unwrap();
        assert!(system.get("turn").is_none());
    }
}
