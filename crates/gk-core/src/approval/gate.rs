//! The interception point sensitive tools call instead of running directly.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::action::Action;
use super::request::ApprovalId;
use super::store::ApprovalStore;
use crate::error::Error;

const PLACEHOLDER_PREFIX: &str = "APPROVAL_REQUIRED:";

/// Pending text handed back to the agent in place of a gated tool's result.
pub fn placeholder(id: ApprovalId, description: &str) -> String {
    format!(
        "{} {} has been submitted for approval (ID: {}). \
         Tell the user it is waiting in the approval section; do not retry it.",
        PLACEHOLDER_PREFIX,
        description,
        id.value()
    )
}

/// Whether a tool result is an approval placeholder rather than real output.
pub fn is_placeholder(text: &str) -> bool {
    text.starts_with(PLACEHOLDER_PREFIX)
}

/// User-visible text for an action that failed.
pub fn failure_text(reason: &str) -> String {
    format!("Operation failed: {}", reason)
}

/// User-visible text for an action the user rejected.
pub const DENIED_TEXT: &str = "Operation denied by user";

/// Non-blocking approval gate shared by every sensitive tool in a session.
///
/// With approval disabled the action runs inline. With approval enabled the
/// action is parked in the store and a placeholder returns immediately; the
/// calling turn never waits on a human.
#[derive(Clone)]
pub struct ApprovalGate {
    store: Arc<ApprovalStore>,
    enabled: Arc<AtomicBool>,
}

impl ApprovalGate {
    pub fn new(store: Arc<ApprovalStore>, enabled: bool) -> Self {
        Self {
            store,
            enabled: Arc::new(AtomicBool::new(enabled)),
        }
    }

    pub fn store(&self) -> &Arc<ApprovalStore> {
        &self.store
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        let previous = self.enabled.swap(enabled, Ordering::SeqCst);
        if previous != enabled {
            info!(enabled, "Approval mode changed");
        }
    }

    /// Run `action` now, or register it for approval and return a placeholder.
    pub fn request(&self, description: impl Into<String>, action: Action) -> String {
        let description = description.into();

        if !self.is_enabled() {
            debug!(%description, "Approval disabled, executing inline");
            return match action.run() {
                Ok(output) => output,
                Err(err) => {
                    warn!(%description, error = %err, "Inline action failed");
                    failure_text(&err.to_string())
                }
            };
        }

        let id = self.store.create(description.clone(), action);
        info!(id = %id, %description, "Tool call submitted for approval");
        placeholder(id, &description)
    }

    /// Execute an approved request's action and record the outcome.
    ///
    /// Action failures are recorded with `mark_error` and returned as
    /// `Error::Action`; they never leave the request half-finished.
    pub fn execute_approved(&self, id: ApprovalId) -> Result<String, Error> {
        let action = self.store.take_action(id)?;
        match action.run() {
            Ok(output) => {
                self.store.mark_executed(id, output.clone())?;
                info!(id = %id, "Approved action executed");
                Ok(output)
            }
            Err(err) => {
                let reason = err.to_string();
                self.store.mark_error(id, reason.clone())?;
                warn!(id = %id, error = %reason, "Approved action failed");
                Err(Error::Action(reason))
            }
        }
    }
}
