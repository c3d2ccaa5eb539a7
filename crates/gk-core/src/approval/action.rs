//! Deferred tool actions.

use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::error::Error;

type ActionFn = Box<dyn FnOnce() -> Result<String, Error> + Send>;

/// A zero-argument deferred computation closed over a tool's real
/// parameters. Consumed on `run`, so it can only ever execute once.
pub struct Action {
    inner: ActionFn,
}

impl Action {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> Result<String, Error> + Send + 'static,
    {
        Self { inner: Box::new(f) }
    }

    /// Wrap a closure that cannot fail.
    pub fn infallible<F>(f: F) -> Self
    where
        F: FnOnce() -> String + Send + 'static,
    {
        Self::new(move || Ok(f()))
    }

    /// Run the action. Errors and panics both come back as `Error::Action`.
    pub fn run(self) -> Result<String, Error> {
        match catch_unwind(AssertUnwindSafe(self.inner)) {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(Error::Action(message))) => Err(Error::Action(message)),
            Ok(Err(err)) => Err(Error::action(err.to_string())),
            Err(panic) => Err(Error::action(panic_message(panic.as_ref()))),
        }
    }
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Action(..)")
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("action panicked: {}", s)
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("action panicked: {}", s)
    } else {
        "action panicked".to_string()
    }
}
