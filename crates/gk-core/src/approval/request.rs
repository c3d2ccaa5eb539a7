//! Approval request records and their lifecycle states.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::turn::TurnId;

/// Identifier of an approval request. Allocated in creation order and never
/// reused within a session, so it doubles as the display order key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApprovalId(u64);

impl ApprovalId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ApprovalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl std::str::FromStr for ApprovalId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().trim_start_matches('#').parse().map(Self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Denied,
    Executed,
    Error,
}

impl ApprovalStatus {
    /// `Denied`, `Executed` and `Error` accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ApprovalStatus::Denied | ApprovalStatus::Executed | ApprovalStatus::Error
        )
    }

    /// Forward-only graph: pending -> {approved, denied}, approved -> {executed, error}.
    pub fn can_transition_to(self, next: ApprovalStatus) -> bool {
        matches!(
            (self, next),
            (ApprovalStatus::Pending, ApprovalStatus::Approved)
                | (ApprovalStatus::Pending, ApprovalStatus::Denied)
                | (ApprovalStatus::Approved, ApprovalStatus::Executed)
                | (ApprovalStatus::Approved, ApprovalStatus::Error)
        )
    }
}

impl std::fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApprovalStatus::Pending => write!(f, "pending"),
            ApprovalStatus::Approved => write!(f, "approved"),
            ApprovalStatus::Denied => write!(f, "denied"),
            ApprovalStatus::Executed => write!(f, "executed"),
            ApprovalStatus::Error => write!(f, "error"),
        }
    }
}

/// A human decision on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approved,
    Denied,
}

impl From<Decision> for ApprovalStatus {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Approved => ApprovalStatus::Approved,
            Decision::Denied => ApprovalStatus::Denied,
        }
    }
}

/// Snapshot of one gated tool invocation.
///
/// The deferred action itself stays inside the store; this view is what the
/// UI renders and what statistics are computed over.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: ApprovalId,
    pub description: String,
    pub status: ApprovalStatus,
    /// Output of the action. Only set once the request is `Executed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    /// Failure message. Only set once the request is `Error`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Turn that created the request.
    pub turn: TurnId,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl ApprovalRequest {
    pub fn is_pending(&self) -> bool {
        self.status == ApprovalStatus::Pending
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Per-status counts for the statistics panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub approved: usize,
    pub denied: usize,
    pub executed: usize,
    pub error: usize,
}

impl StatusCounts {
    pub fn add(&mut self, status: ApprovalStatus) {
        match status {
            ApprovalStatus::Pending => self.pending += 1,
            ApprovalStatus::Approved => self.approved += 1,
            ApprovalStatus::Denied => self.denied += 1,
            ApprovalStatus::Executed => self.executed += 1,
            ApprovalStatus::Error => self.error += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.approved + self.denied + self.executed + self.error
    }

    /// Entries removable by `clear_processed`.
    pub fn processed(&self) -> usize {
        self.denied + self.executed + self.error
    }
}
