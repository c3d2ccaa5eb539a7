//! Test utilities shared across the workspace.
//! Only compiled when running tests or with the `testing` feature.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::approval::{Action, ApprovalGate};
use crate::error::Error;
use crate::session::AgentExecutor;
use crate::tool::ToolRegistry;

/// Counts how many of its actions actually ran.
#[derive(Clone, Default)]
pub struct ActionCounter {
    calls: Arc<AtomicUsize>,
}

impl ActionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// An action that bumps the counter and returns `result`.
    pub fn action(&self, result: Result<&str, &str>) -> Action {
        let calls = self.calls.clone();
        let result = result.map(str::to_string).map_err(str::to_string);
        Action::new(move || {
            calls.fetch_add(1, Ordering::SeqCst);
            result.map_err(Error::action)
        })
    }

    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// One step of a scripted agent turn.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Plain answer text.
    Say(String),
    /// Call the gate; the gate's return value becomes part of the answer.
    Gated {
        description: String,
        result: Result<String, String>,
    },
    /// Fail the turn at this point.
    Fail(String),
}

/// A mock agent executor that plays back pre-configured turns.
pub struct ScriptedExecutor {
    gate: ApprovalGate,
    turns: Mutex<VecDeque<Vec<ScriptStep>>>,
    counter: ActionCounter,
    /// Inputs received (for assertion).
    pub inputs: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    pub fn new(gate: ApprovalGate) -> Self {
        Self {
            gate,
            turns: Mutex::new(VecDeque::new()),
            counter: ActionCounter::new(),
            inputs: Mutex::new(Vec::new()),
        }
    }

    /// Queue a turn. Turns are played in FIFO order.
    pub fn queue_turn(&self, steps: Vec<ScriptStep>) {
        self.turns.lock().unwrap().push_back(steps);
    }

    pub fn queue_answer(&self, text: &str) {
        self.queue_turn(vec![ScriptStep::Say(text.to_string())]);
    }

    pub fn queue_gated(&self, description: &str, result: Result<&str, &str>) {
        self.queue_turn(vec![gated(description, result)]);
    }

    pub fn queue_failure(&self, message: &str) {
        self.queue_turn(vec![ScriptStep::Fail(message.to_string())]);
    }

    /// Number of gated actions that actually executed.
    pub fn executions(&self) -> usize {
        self.counter.count()
    }
}

/// Shorthand for a gated step.
pub fn gated(description: &str, result: Result<&str, &str>) -> ScriptStep {
    ScriptStep::Gated {
        description: description.to_string(),
        result: result.map(str::to_string).map_err(str::to_string),
    }
}

#[async_trait]
impl AgentExecutor for ScriptedExecutor {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn run_turn(&self, input: &str, _tools: &ToolRegistry) -> Result<String, Error> {
        self.inputs.lock().unwrap().push(input.to_string());
        let steps = self
            .turns
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::agent("No scripted turn queued"))?;

        let mut lines = Vec::new();
        for step in steps {
            match step {
                ScriptStep::Say(text) => lines.push(text),
                ScriptStep::Gated {
                    description,
                    result,
                } => {
                    let action = self.counter.action(result.as_deref().map_err(|e| e.as_str()));
                    lines.push(self.gate.request(description, action));
                }
                ScriptStep::Fail(message) => return Err(Error::agent(message)),
            }
        }
        Ok(lines.join("\n"))
    }
}
