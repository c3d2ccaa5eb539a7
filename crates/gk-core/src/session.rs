//! One conversation session: the state that survives between redraws.
//!
//! Everything the UI rebuilds on each redraw is derived from this struct.
//! The store, the reconciler flags and the transcript live here; nothing is
//! reached through globals.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::approval::{
    ApprovalGate, ApprovalId, ApprovalPanel, ApprovalStatus, ApprovalStore, DecisionReport,
    RerunReconciler,
};
use crate::error::Error;
use crate::message::Message;
use crate::tool::ToolRegistry;
use crate::turn::{FinalAnswer, TurnId};

/// The agent that turns a user message into an answer, calling tools on the
/// way. Gated tools hand it placeholders instead of results.
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    fn name(&self) -> &str;

    async fn run_turn(&self, input: &str, tools: &ToolRegistry) -> Result<String, Error>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The answer was appended to the transcript.
    Answered(String),
    /// The answer is held until the turn's approvals are decided.
    AwaitingApproval { turn: TurnId, pending: usize },
}

pub struct Session {
    gate: ApprovalGate,
    reconciler: RerunReconciler,
    tools: ToolRegistry,
    transcript: Vec<Message>,
}

impl Session {
    pub fn new(gate: ApprovalGate, tools: ToolRegistry) -> Self {
        Self {
            reconciler: RerunReconciler::new(gate.clone()),
            gate,
            tools,
            transcript: Vec::new(),
        }
    }

    pub fn gate(&self) -> &ApprovalGate {
        &self.gate
    }

    pub fn store(&self) -> &Arc<ApprovalStore> {
        self.gate.store()
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn reconciler(&self) -> &RerunReconciler {
        &self.reconciler
    }

    /// Flip approval mode. A change is noted in the transcript; requests
    /// already pending stay pending.
    pub fn set_approval_enabled(&mut self, enabled: bool) {
        if self.gate.is_enabled() == enabled {
            return;
        }
        self.gate.set_enabled(enabled);
        let state = if enabled { "on" } else { "off" };
        self.transcript.push(Message::system(format!("Approval mode {}", state)));
    }

    /// Run one user turn through `executor`.
    ///
    /// An executor failure still holds any requests the turn created, so
    /// their decisions have somewhere to land.
    pub async fn run_turn(
        &mut self,
        executor: &dyn AgentExecutor,
        input: &str,
    ) -> Result<TurnOutcome, Error> {
        let turn = self.store().begin_turn();
        self.transcript.push(Message::user(input, turn));
        debug!(turn = %turn, agent = executor.name(), "Turn started");

        let (draft, failure) = match executor.run_turn(input, &self.tools).await {
            Ok(answer) => (answer, None),
            Err(err) => {
                if self.store().list_turn(turn).is_empty() {
                    return Err(err);
                }
                (err.to_string(), Some(err))
            }
        };

        let released = self.reconciler.hold_turn(turn, draft);
        let own = released
            .iter()
            .find(|a| a.turn == turn)
            .map(|a| a.content.clone());
        self.append(released);

        if let Some(err) = failure {
            return Err(err);
        }

        Ok(match own {
            Some(answer) => TurnOutcome::Answered(answer),
            None => {
                let pending = self
                    .store()
                    .list_turn(turn)
                    .iter()
                    .filter(|r| r.status == ApprovalStatus::Pending)
                    .count();
                info!(turn = %turn, pending, "Turn awaiting approval");
                TurnOutcome::AwaitingApproval { turn, pending }
            }
        })
    }

    pub fn should_show_approvals(&self) -> bool {
        self.reconciler.should_show_approvals()
    }

    pub fn redraw(&mut self) -> ApprovalPanel {
        self.reconciler.redraw()
    }

    pub fn approve(&mut self, id: ApprovalId) -> DecisionReport {
        let report = self.reconciler.approve(id);
        self.append(report.released.clone());
        report
    }

    pub fn deny(&mut self, id: ApprovalId) -> DecisionReport {
        let report = self.reconciler.deny(id);
        self.append(report.released.clone());
        report
    }

    pub fn approve_all(&mut self) -> DecisionReport {
        let report = self.reconciler.approve_all();
        self.append(report.released.clone());
        report
    }

    pub fn deny_all(&mut self) -> DecisionReport {
        let report = self.reconciler.deny_all();
        self.append(report.released.clone());
        report
    }

    pub fn clear_processed(&mut self) -> usize {
        self.store().clear_processed()
    }

    pub fn awaiting_turns(&self) -> Vec<TurnId> {
        self.reconciler.awaiting_turns()
    }

    /// Drop all approvals, held answers and transcript.
    pub fn reset(&mut self) {
        self.store().reset();
        self.reconciler.reset();
        self.transcript.clear();
        info!("Session reset");
    }

    fn append(&mut self, answers: Vec<FinalAnswer>) {
        for answer in answers {
            self.transcript.push(Message::assistant(answer.content, answer.turn));
        }
    }
}
