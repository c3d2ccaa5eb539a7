use thiserror::Error;

use crate::approval::{ApprovalId, ApprovalStatus};

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid transition for approval {id}: {from} -> {to}")]
    InvalidTransition {
        id: ApprovalId,
        from: ApprovalStatus,
        to: ApprovalStatus,
    },

    #[error("Approval not found: {0}")]
    NotFound(ApprovalId),

    #[error("{0}")]
    Action(String),

    #[error("Tool error: {tool} - {message}")]
    Tool { tool: String, message: String },

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    pub fn invalid_transition(id: ApprovalId, from: ApprovalStatus, to: ApprovalStatus) -> Self {
        Self::InvalidTransition { id, from, to }
    }

    pub fn action(message: impl Into<String>) -> Self {
        Self::Action(message.into())
    }

    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn agent(message: impl Into<String>) -> Self {
        Self::Agent(message.into())
    }

    /// True for errors caused by a UI acting on an entry that has already
    /// moved on (double click, cleared entry). Callers treat these as no-ops.
    pub fn is_stale(&self) -> bool {
        matches!(self, Error::InvalidTransition { .. } | Error::NotFound(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::invalid_transition(
            ApprovalId::new(3),
            ApprovalStatus::Executed,
            ApprovalStatus::Approved,
        );
        let text = err.to_string();
        assert!(text.contains("#3"));
        assert!(text.contains("executed -> approved"));

        let err = Error::tool("calculator", "bad input");
        assert_eq!(err.to_string(), "Tool error: calculator - bad input");
    }

    #[test]
    fn test_is_stale() {
        assert!(Error::NotFound(ApprovalId::new(0)).is_stale());
        assert!(Error::invalid_transition(
            ApprovalId::new(0),
            ApprovalStatus::Denied,
            ApprovalStatus::Approved
        )
        .is_stale());
        assert!(!Error::action("boom").is_stale());
        assert!(!Error::agent("offline").is_stale());
    }
}
