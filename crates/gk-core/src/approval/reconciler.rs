//! Per-redraw reconciliation of approval state.
//!
//! The UI keeps no event loop of its own: every redraw is a fresh pass over
//! the store. Only the store and the two flags held here survive between
//! redraws. The flags let a fresh request trigger the panel early, but any
//! nonzero pending count always shows it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use super::gate::ApprovalGate;
use super::request::{ApprovalId, ApprovalRequest, Decision, StatusCounts};
use super::risk::{classify_risk, RiskLevel};
use super::store::ApprovalStore;
use crate::error::Error;
use crate::turn::{FinalAnswer, Outcome, TurnId, TurnLedger};

/// One pending request as rendered on an approval card.
#[derive(Debug, Clone, Serialize)]
pub struct PendingCard {
    pub id: ApprovalId,
    pub description: String,
    pub risk: RiskLevel,
    pub created_at: DateTime<Utc>,
}

impl From<&ApprovalRequest> for PendingCard {
    fn from(request: &ApprovalRequest) -> Self {
        Self {
            id: request.id,
            description: request.description.clone(),
            risk: classify_risk(&request.description),
            created_at: request.created_at,
        }
    }
}

/// What a single redraw should display.
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalPanel {
    /// Whether the approval section is shown at all.
    pub visible: bool,
    /// Set when this redraw surfaced requests the previous one had not.
    pub newly_raised: bool,
    pub pending: Vec<PendingCard>,
    pub processed: Vec<ApprovalRequest>,
    pub counts: StatusCounts,
}

/// Result of one decision on one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Executed { id: ApprovalId, result: String },
    Failed { id: ApprovalId, error: String },
    Denied { id: ApprovalId },
    /// The request was gone or already decided; nothing changed.
    Stale { id: ApprovalId, reason: String },
}

impl Resolution {
    pub fn id(&self) -> ApprovalId {
        match self {
            Resolution::Executed { id, .. }
            | Resolution::Failed { id, .. }
            | Resolution::Denied { id }
            | Resolution::Stale { id, .. } => *id,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, Resolution::Stale { .. })
    }

    fn outcome(&self) -> Option<Outcome> {
        match self {
            Resolution::Executed { result, .. } => Some(Outcome::Executed(result.clone())),
            Resolution::Failed { error, .. } => Some(Outcome::Failed(error.clone())),
            Resolution::Denied { .. } => Some(Outcome::Denied),
            Resolution::Stale { .. } => None,
        }
    }
}

/// Everything a decision changed: per-request results plus any turn answers
/// that became complete.
#[derive(Debug, Clone, Default)]
pub struct DecisionReport {
    pub resolutions: Vec<Resolution>,
    pub released: Vec<FinalAnswer>,
}

/// Redraw-durable approval state for one session.
pub struct RerunReconciler {
    gate: ApprovalGate,
    store: Arc<ApprovalStore>,
    pending_at_last_check: usize,
    force_show: bool,
    ledger: TurnLedger,
}

impl RerunReconciler {
    pub fn new(gate: ApprovalGate) -> Self {
        let store = gate.store().clone();
        Self {
            gate,
            store,
            pending_at_last_check: 0,
            force_show: false,
            ledger: TurnLedger::new(),
        }
    }

    pub fn store(&self) -> &Arc<ApprovalStore> {
        &self.store
    }

    pub fn pending_at_last_check(&self) -> usize {
        self.pending_at_last_check
    }

    pub fn force_show(&self) -> bool {
        self.force_show
    }

    /// Called by the turn driver right after a turn created requests.
    pub fn note_new_pending(&mut self) {
        self.force_show = true;
        debug!("force_show raised");
    }

    /// Whether the approval section must be visible on this redraw.
    pub fn should_show_approvals(&self) -> bool {
        self.store.pending_count() > 0 || self.force_show || self.store.has_new_pending()
    }

    /// Run one redraw pass.
    pub fn redraw(&mut self) -> ApprovalPanel {
        if self.store.take_new_pending() {
            self.force_show = true;
        }

        let pending = self.store.list_pending();
        let current_pending = pending.len();
        let newly_raised = current_pending > self.pending_at_last_check || self.force_show;

        if newly_raised {
            debug!(
                current_pending,
                last = self.pending_at_last_check,
                force_show = self.force_show,
                "Approval panel raised"
            );
        }
        self.force_show = false;

        let all = self.store.list(None);
        let mut counts = StatusCounts::default();
        for request in &all {
            counts.add(request.status);
        }

        let panel = ApprovalPanel {
            // A pending entry is always shown, whatever the flags say.
            visible: current_pending > 0 || newly_raised,
            newly_raised,
            pending: pending.iter().map(PendingCard::from).collect(),
            processed: all.into_iter().filter(|r| r.is_terminal()).collect(),
            counts,
        };

        // Updated after the panel is built so a request created mid-pass is
        // never attributed to "already seen".
        self.pending_at_last_check = current_pending;
        panel
    }

    /// Hold a finished turn's answer until its requests are decided.
    /// Returns every answer that is complete right now.
    pub fn hold_turn(&mut self, turn: TurnId, draft: impl Into<String>) -> Vec<FinalAnswer> {
        let requests = self.store.list_turn(turn);
        if !requests.is_empty() {
            self.note_new_pending();
        }
        match self.ledger.hold(turn, draft, &requests) {
            Some(answer) => vec![answer],
            // Requests may already be terminal if decided mid-turn.
            None => self.ledger.release_ready(&self.store),
        }
    }

    pub fn awaiting_turns(&self) -> Vec<TurnId> {
        self.ledger.awaiting()
    }

    /// Approve and execute one request.
    pub fn approve(&mut self, id: ApprovalId) -> DecisionReport {
        let resolution = self.approve_one(id);
        self.finish(vec![resolution])
    }

    /// Deny one request. Its action is dropped unexecuted.
    pub fn deny(&mut self, id: ApprovalId) -> DecisionReport {
        let resolution = self.deny_one(id);
        self.finish(vec![resolution])
    }

    /// Approve every pending request in id order. A failing action only
    /// affects its own entry.
    pub fn approve_all(&mut self) -> DecisionReport {
        let resolutions = self
            .pending_ids()
            .into_iter()
            .map(|id| self.approve_one(id))
            .collect();
        self.finish(resolutions)
    }

    /// Deny every pending request in id order.
    pub fn deny_all(&mut self) -> DecisionReport {
        let resolutions = self
            .pending_ids()
            .into_iter()
            .map(|id| self.deny_one(id))
            .collect();
        self.finish(resolutions)
    }

    /// Forget all flags and held turns (full session reset).
    pub fn reset(&mut self) {
        self.pending_at_last_check = 0;
        self.force_show = false;
        self.ledger.clear();
    }

    fn pending_ids(&self) -> Vec<ApprovalId> {
        self.store.list_pending().into_iter().map(|r| r.id).collect()
    }

    fn approve_one(&self, id: ApprovalId) -> Resolution {
        if let Err(err) = self.store.resolve(id, Decision::Approved) {
            return stale(id, err);
        }
        info!(id = %id, "Approval granted");

        match self.gate.execute_approved(id) {
            Ok(result) => Resolution::Executed { id, result },
            Err(Error::Action(error)) => Resolution::Failed { id, error },
            Err(err) => stale(id, err),
        }
    }

    fn deny_one(&self, id: ApprovalId) -> Resolution {
        match self.store.resolve(id, Decision::Denied) {
            Ok(()) => {
                info!(id = %id, "Approval denied");
                Resolution::Denied { id }
            }
            Err(err) => stale(id, err),
        }
    }

    fn finish(&mut self, resolutions: Vec<Resolution>) -> DecisionReport {
        for resolution in &resolutions {
            if let Some(outcome) = resolution.outcome() {
                self.ledger.record(resolution.id(), outcome);
            }
        }
        let released = self.ledger.release_ready(&self.store);
        DecisionReport {
            resolutions,
            released,
        }
    }
}

fn stale(id: ApprovalId, err: Error) -> Resolution {
    debug!(id = %id, error = %err, "Ignoring stale approval action");
    Resolution::Stale {
        id,
        reason: err.to_string(),
    }
}
