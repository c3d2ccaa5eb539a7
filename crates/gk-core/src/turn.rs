//! Turns and their held-back answers.
//!
//! A turn's answer is shown only once every approval request it created has
//! reached a terminal state. Turns that created no requests are answered
//! immediately.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::approval::gate::{failure_text, placeholder, DENIED_TEXT};
use crate::approval::{ApprovalId, ApprovalRequest, ApprovalStatus, ApprovalStore};
use crate::error::Error;

/// One user-message-to-final-answer cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TurnId(u64);

impl TurnId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for TurnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a gated request ended, as seen by the turn that created it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "lowercase")]
pub enum Outcome {
    Executed(String),
    Denied,
    Failed(String),
    /// The request disappeared from the store before its outcome was seen.
    Vanished,
}

impl Outcome {
    /// Outcome of a terminal request; `None` while still undecided.
    pub fn from_request(request: &ApprovalRequest) -> Option<Self> {
        match request.status {
            ApprovalStatus::Executed => Some(Outcome::Executed(
                request.result.clone().unwrap_or_default(),
            )),
            ApprovalStatus::Denied => Some(Outcome::Denied),
            ApprovalStatus::Error => Some(Outcome::Failed(
                request.error.clone().unwrap_or_else(|| "unknown error".to_string()),
            )),
            ApprovalStatus::Pending | ApprovalStatus::Approved => None,
        }
    }

    /// Text substituted into the answer in place of the tool result.
    pub fn text(&self) -> String {
        match self {
            Outcome::Executed(result) => result.clone(),
            Outcome::Denied => DENIED_TEXT.to_string(),
            Outcome::Failed(reason) => failure_text(reason),
            Outcome::Vanished => "Operation no longer available".to_string(),
        }
    }
}

/// A completed turn answer ready for the transcript.
#[derive(Debug, Clone)]
pub struct FinalAnswer {
    pub turn: TurnId,
    pub content: String,
    pub outcomes: Vec<(ApprovalId, Outcome)>,
}

struct HeldTurn {
    draft: String,
    requests: Vec<(ApprovalId, String)>,
    outcomes: HashMap<ApprovalId, Outcome>,
}

impl HeldTurn {
    fn compose(&self, turn: TurnId, outcomes: Vec<(ApprovalId, Outcome)>) -> FinalAnswer {
        let mut content = self.draft.clone();
        let mut unquoted = Vec::new();

        for ((id, description), (_, outcome)) in self.requests.iter().zip(outcomes.iter()) {
            let pending_text = placeholder(*id, description);
            if content.contains(&pending_text) {
                content = content.replace(&pending_text, &outcome.text());
            } else {
                unquoted.push(format!("- {}: {}", description, outcome.text()));
            }
        }

        if !unquoted.is_empty() {
            if !content.trim().is_empty() {
                content.push_str("\n\n");
            }
            content.push_str(&unquoted.join("\n"));
        }

        FinalAnswer {
            turn,
            content,
            outcomes,
        }
    }
}

/// Answers waiting on approval decisions, keyed by turn.
#[derive(Default)]
pub struct TurnLedger {
    held: BTreeMap<TurnId, HeldTurn>,
}

impl TurnLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold `draft` until every request in `requests` is terminal. Returns
    /// the answer straight away when the turn gated nothing.
    pub fn hold(
        &mut self,
        turn: TurnId,
        draft: impl Into<String>,
        requests: &[ApprovalRequest],
    ) -> Option<FinalAnswer> {
        let draft = draft.into();
        if requests.is_empty() {
            return Some(FinalAnswer {
                turn,
                content: draft,
                outcomes: Vec::new(),
            });
        }

        debug!(turn = %turn, requests = requests.len(), "Holding turn answer");
        self.held.insert(
            turn,
            HeldTurn {
                draft,
                requests: requests
                    .iter()
                    .map(|r| (r.id, r.description.clone()))
                    .collect(),
                outcomes: HashMap::new(),
            },
        );
        None
    }

    /// Remember how `id` ended so the answer survives `clear_processed`.
    pub fn record(&mut self, id: ApprovalId, outcome: Outcome) {
        if let Some(turn) = self
            .held
            .values_mut()
            .find(|t| t.requests.iter().any(|(rid, _)| *rid == id))
        {
            turn.outcomes.insert(id, outcome);
        }
    }

    /// Release every held turn whose requests have all ended, in turn order.
    pub fn release_ready(&mut self, store: &ApprovalStore) -> Vec<FinalAnswer> {
        let mut ready = Vec::new();

        for (turn, held) in &self.held {
            let mut outcomes = Vec::with_capacity(held.requests.len());
            for (id, _) in &held.requests {
                let outcome = match held.outcomes.get(id) {
                    Some(outcome) => Some(outcome.clone()),
                    None => match store.get(*id) {
                        Ok(request) => Outcome::from_request(&request),
                        Err(Error::NotFound(_)) => Some(Outcome::Vanished),
                        Err(_) => None,
                    },
                };
                match outcome {
                    Some(outcome) => outcomes.push((*id, outcome)),
                    None => break,
                }
            }
            if outcomes.len() == held.requests.len() {
                ready.push(held.compose(*turn, outcomes));
            }
        }

        for answer in &ready {
            self.held.remove(&answer.turn);
            debug!(turn = %answer.turn, "Releasing turn answer");
        }
        ready
    }

    /// Turns still waiting on at least one decision.
    pub fn awaiting(&self) -> Vec<TurnId> {
        self.held.keys().copied().collect()
    }

    pub fn is_waiting(&self, turn: TurnId) -> bool {
        self.held.contains_key(&turn)
    }

    pub fn clear(&mut self) {
        self.held.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::{Action, Decision};

    fn gated(store: &ApprovalStore, description: &str) -> (ApprovalRequest, String) {
        let id = store.create(description, Action::infallible(|| "ok".to_string()));
        (store.get(id).unwrap(), placeholder(id, description))
    }

    #[test]
    fn test_turn_without_requests_is_immediate() {
        let mut ledger = TurnLedger::new();
        let answer = ledger.hold(TurnId::new(1), "It is noon.", &[]).unwrap();
        assert_eq!(answer.content, "It is noon.");
        assert!(ledger.awaiting().is_empty());
    }

    #[test]
    fn test_released_only_when_all_terminal() {
        let store = ApprovalStore::new();
        let turn = store.begin_turn();
        let (a, ph_a) = gated(&store, "Calculate: 1 + 1");
        let (b, ph_b) = gated(&store, "Calculate: 2 + 2");

        let mut ledger = TurnLedger::new();
        let draft = format!("First: {}\nSecond: {}", ph_a, ph_b);
        assert!(ledger.hold(turn, draft, &[a.clone(), b.clone()]).is_none());

        store.resolve(a.id, Decision::Approved).unwrap();
        store.mark_executed(a.id, "Calculation result: 2").unwrap();
        assert!(ledger.release_ready(&store).is_empty());
        assert!(ledger.is_waiting(turn));

        store.resolve(b.id, Decision::Denied).unwrap();
        let released = ledger.release_ready(&store);
        assert_eq!(released.len(), 1);
        assert_eq!(
            released[0].content,
            "First: Calculation result: 2\nSecond: Operation denied by user"
        );
        assert!(!ledger.is_waiting(turn));
    }

    #[test]
    fn test_unquoted_outcomes_are_appended() {
        let store = ApprovalStore::new();
        let turn = store.begin_turn();
        let (a, _) = gated(&store, "File read: a.txt");

        let mut ledger = TurnLedger::new();
        ledger.hold(turn, "Reading the file for you.", &[a.clone()]);
        store.resolve(a.id, Decision::Approved).unwrap();
        store.mark_error(a.id, "no such file").unwrap();

        let released = ledger.release_ready(&store);
        assert_eq!(
            released[0].content,
            "Reading the file for you.\n\n- File read: a.txt: Operation failed: no such file"
        );
    }

    #[test]
    fn test_recorded_outcome_survives_clear() {
        let store = ApprovalStore::new();
        let turn = store.begin_turn();
        let (a, ph_a) = gated(&store, "Calculate: 3 * 3");
        let (b, _) = gated(&store, "Calculate: 4 * 4");

        let mut ledger = TurnLedger::new();
        ledger.hold(turn, ph_a, &[a.clone(), b.clone()]);

        store.resolve(a.id, Decision::Approved).unwrap();
        store.mark_executed(a.id, "9").unwrap();
        ledger.record(a.id, Outcome::Executed("9".to_string()));
        store.clear_processed();

        store.resolve(b.id, Decision::Denied).unwrap();
        let released = ledger.release_ready(&store);
        assert!(released[0].content.starts_with("9"));
    }

    #[test]
    fn test_missing_request_counts_as_vanished() {
        let store = ApprovalStore::new();
        let turn = store.begin_turn();
        let (a, _) = gated(&store, "Calculate: 5");

        let mut ledger = TurnLedger::new();
        ledger.hold(turn, "", &[a]);
        store.reset();

        let released = ledger.release_ready(&store);
        assert_eq!(released[0].outcomes[0].1, Outcome::Vanished);
    }
}
