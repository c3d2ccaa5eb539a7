//! Session-scoped registry of approval requests.
//!
//! The store is pure data: it records decisions and results but never runs
//! an action itself. Every mutation is a single check-then-set under one
//! lock acquisition, so a reentrant or repeated UI callback can never move
//! an entry backwards or hand out its action twice.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::action::Action;
use super::request::{ApprovalId, ApprovalRequest, ApprovalStatus, Decision, StatusCounts};
use crate::error::Error;
use crate::turn::TurnId;

struct Entry {
    request: ApprovalRequest,
    action: Option<Action>,
}

#[derive(Default)]
struct Inner {
    entries: BTreeMap<ApprovalId, Entry>,
    next_id: u64,
    current_turn: u64,
    new_pending: bool,
}

impl Inner {
    fn entry_mut(&mut self, id: ApprovalId) -> Result<&mut Entry, Error> {
        self.entries.get_mut(&id).ok_or(Error::NotFound(id))
    }

    /// Move `id` to `next` if the lifecycle graph allows it.
    fn transition(&mut self, id: ApprovalId, next: ApprovalStatus) -> Result<&mut Entry, Error> {
        let entry = self.entry_mut(id)?;
        let current = entry.request.status;
        if !current.can_transition_to(next) {
            return Err(Error::invalid_transition(id, current, next));
        }
        entry.request.status = next;
        entry.request.resolved_at = Some(Utc::now());
        Ok(entry)
    }
}

/// Approval requests for one session, ordered by id.
#[derive(Default)]
pub struct ApprovalStore {
    inner: Mutex<Inner>,
}

impl ApprovalStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new pending request and raise the "new pending" flag.
    pub fn create(&self, description: impl Into<String>, action: Action) -> ApprovalId {
        let mut inner = self.lock();
        let id = ApprovalId::new(inner.next_id);
        inner.next_id += 1;

        let request = ApprovalRequest {
            id,
            description: description.into(),
            status: ApprovalStatus::Pending,
            result: None,
            error: None,
            turn: TurnId::new(inner.current_turn),
            created_at: Utc::now(),
            resolved_at: None,
        };
        debug!(
            id = %id,
            description = %request.description,
            turn = %request.turn,
            "Approval request created"
        );

        inner.entries.insert(
            id,
            Entry {
                request,
                action: Some(action),
            },
        );
        inner.new_pending = true;
        id
    }

    pub fn get(&self, id: ApprovalId) -> Result<ApprovalRequest, Error> {
        self.lock()
            .entries
            .get(&id)
            .map(|e| e.request.clone())
            .ok_or(Error::NotFound(id))
    }

    /// Requests in id order, optionally restricted to one status.
    pub fn list(&self, status: Option<ApprovalStatus>) -> Vec<ApprovalRequest> {
        self.lock()
            .entries
            .values()
            .filter(|e| status.map_or(true, |s| e.request.status == s))
            .map(|e| e.request.clone())
            .collect()
    }

    pub fn list_pending(&self) -> Vec<ApprovalRequest> {
        self.list(Some(ApprovalStatus::Pending))
    }

    /// Requests created during `turn`, in id order.
    pub fn list_turn(&self, turn: TurnId) -> Vec<ApprovalRequest> {
        self.lock()
            .entries
            .values()
            .filter(|e| e.request.turn == turn)
            .map(|e| e.request.clone())
            .collect()
    }

    pub fn pending_count(&self) -> usize {
        self.lock()
            .entries
            .values()
            .filter(|e| e.request.is_pending())
            .count()
    }

    pub fn counts(&self) -> StatusCounts {
        let inner = self.lock();
        let mut counts = StatusCounts::default();
        for entry in inner.entries.values() {
            counts.add(entry.request.status);
        }
        counts
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Age of the oldest request still awaiting a decision.
    pub fn oldest_pending_age(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.lock()
            .entries
            .values()
            .find(|e| e.request.is_pending())
            .map(|e| now - e.request.created_at)
    }

    /// Record the human decision. Fails unless the request is `Pending`.
    /// Approving does not execute anything.
    pub fn resolve(&self, id: ApprovalId, decision: Decision) -> Result<(), Error> {
        let mut inner = self.lock();
        let entry = inner.transition(id, decision.into())?;
        if decision == Decision::Denied {
            entry.action = None;
        }
        debug!(id = %id, ?decision, "Approval resolved");
        Ok(())
    }

    /// Hand out the deferred action of an approved request. Succeeds at most
    /// once per request.
    pub fn take_action(&self, id: ApprovalId) -> Result<Action, Error> {
        let mut inner = self.lock();
        let entry = inner.entry_mut(id)?;
        if entry.request.status != ApprovalStatus::Approved {
            return Err(Error::invalid_transition(
                id,
                entry.request.status,
                ApprovalStatus::Executed,
            ));
        }
        // An approved entry without an action is mid-execution elsewhere.
        entry.action.take().ok_or_else(|| {
            Error::invalid_transition(id, ApprovalStatus::Approved, ApprovalStatus::Approved)
        })
    }

    pub fn mark_executed(&self, id: ApprovalId, result: impl Into<String>) -> Result<(), Error> {
        let mut inner = self.lock();
        let entry = inner.transition(id, ApprovalStatus::Executed)?;
        entry.request.result = Some(result.into());
        entry.action = None;
        Ok(())
    }

    pub fn mark_error(&self, id: ApprovalId, error: impl Into<String>) -> Result<(), Error> {
        let mut inner = self.lock();
        let entry = inner.transition(id, ApprovalStatus::Error)?;
        entry.request.error = Some(error.into());
        entry.action = None;
        Ok(())
    }

    /// Remove every terminal entry. Pending and approved entries stay.
    pub fn clear_processed(&self) -> usize {
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner.entries.retain(|_, e| !e.request.is_terminal());
        let removed = before - inner.entries.len();
        debug!(removed, "Cleared processed approvals");
        removed
    }

    /// Start a new turn; requests created from now on are tagged with it.
    pub fn begin_turn(&self) -> TurnId {
        let mut inner = self.lock();
        inner.current_turn += 1;
        TurnId::new(inner.current_turn)
    }

    pub fn current_turn(&self) -> TurnId {
        TurnId::new(self.lock().current_turn)
    }

    /// Whether a request was created since the flag was last taken.
    pub fn has_new_pending(&self) -> bool {
        self.lock().new_pending
    }

    /// Read and clear the "new pending" flag.
    pub fn take_new_pending(&self) -> bool {
        std::mem::take(&mut self.lock().new_pending)
    }

    /// Drop every entry and flag. Id and turn counters keep advancing so a
    /// stale UI control can never address a new request.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.new_pending = false;
        debug!("Approval store reset");
    }
}
