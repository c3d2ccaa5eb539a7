//! Human-in-the-loop approval of sensitive tool calls.
//!
//! - [`ApprovalStore`]: session record of every request and its status
//! - [`ApprovalGate`]: non-blocking interception point used by tools
//! - [`RerunReconciler`]: per-redraw visibility and decision handling

mod action;
pub mod gate;
mod reconciler;
mod request;
mod risk;
mod store;

pub use action::Action;
pub use gate::{is_placeholder, placeholder, ApprovalGate, DENIED_TEXT};
pub use reconciler::{ApprovalPanel, DecisionReport, PendingCard, RerunReconciler, Resolution};
pub use request::{ApprovalId, ApprovalRequest, ApprovalStatus, Decision, StatusCounts};
pub use risk::{classify_risk, RiskLevel};
pub use store::ApprovalStore;
