//! gk-core: Approval gating for agent tool calls
//!
//! This crate holds the human-in-the-loop approval workflow used by the
//! gatekeep CLI: a session-scoped approval store, the non-blocking gate that
//! sensitive tools call, and the reconciler that decides what each redraw
//! shows and applies the user's decisions.

pub mod approval;
pub mod error;
pub mod message;
pub mod session;
pub mod tool;
pub mod turn;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use approval::{
    classify_risk, Action, ApprovalGate, ApprovalId, ApprovalPanel, ApprovalRequest,
    ApprovalStatus, ApprovalStore, Decision, DecisionReport, PendingCard, RerunReconciler,
    Resolution, RiskLevel, StatusCounts,
};
pub use error::Error;
pub use message::{Message, Role};
pub use session::{AgentExecutor, Session, TurnOutcome};
pub use tool::{
    PropertySchema, Tool, ToolDefinition, ToolInfo, ToolOutput, ToolParameters, ToolRegistry,
};
pub use turn::{FinalAnswer, Outcome, TurnId, TurnLedger};

pub type Result<T> = std::result::Result<T, Error>;
