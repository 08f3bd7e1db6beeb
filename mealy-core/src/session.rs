//! Resumable step-by-step execution.

use crate::engine::{Cursor, ExecutionResult, Halt};
use crate::error::CoreError;
use crate::machine::Machine;
use crate::state::State;
use serde::Serialize;

/// A steppable run of a machine over one input.
///
/// The session borrows the machine, so the machine cannot be modified while
/// the session is alive. Dropping the session cancels the run.
#[derive(Debug, Clone)]
pub struct Session<'m> {
    cursor: Cursor<'m>,
    input: String,
}

/// Observable progress of a session, suitable for rendering between steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    /// The session has halted and will not advance further.
    pub done: bool,
    /// Label of the current state.
    pub state: String,
    /// Output so far.
    pub output: String,
    /// Transitions taken so far.
    pub transitions: usize,
    /// Byte offset of the next unconsumed input.
    pub position: usize,
    /// Empty while running; the halt message once done.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<String>>,
}

impl<'m> Session<'m> {
    fn new(machine: &'m Machine, input: String, record_history: bool) -> Result<Self, CoreError> {
        Ok(Self {
            cursor: Cursor::new(machine, record_history)?,
            input,
        })
    }

    /// Takes at most one transition.
    ///
    /// Returns `Ok(true)` if a transition was taken. Returns `Ok(false)` when
    /// the input is exhausted (halt message "End Of Input") or no transition
    /// matches; the session is then done and further calls are no-ops.
    pub fn step(&mut self) -> Result<bool, CoreError> {
        self.cursor.advance(&self.input)
    }

    /// Steps until the session is done and returns the final result.
    pub fn run_to_end(mut self) -> Result<ExecutionResult, CoreError> {
        while self.step()? {}
        Ok(self.cursor.into_result())
    }

    pub fn is_done(&self) -> bool {
        self.cursor.halt().is_some()
    }

    /// Returns true once done with all input consumed in an Accept state.
    pub fn accepted(&self) -> bool {
        self.cursor.accepted()
    }

    pub fn state(&self) -> &'m State {
        self.cursor.state()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Byte offset of the next unconsumed input.
    pub fn position(&self) -> usize {
        self.cursor.position()
    }

    /// Input not yet consumed.
    pub fn remaining(&self) -> &str {
        &self.input[self.cursor.position()..]
    }

    pub fn output(&self) -> &str {
        self.cursor.output()
    }

    pub fn transitions(&self) -> usize {
        self.cursor.transitions()
    }

    pub fn history(&self) -> Option<&[String]> {
        self.cursor.history()
    }

    pub fn halt(&self) -> Option<&Halt> {
        self.cursor.halt()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            done: self.is_done(),
            state: self.state().label.clone(),
            output: self.output().to_string(),
            transitions: self.transitions(),
            position: self.position(),
            message: self.halt().map(|h| h.to_string()).unwrap_or_default(),
            history: self.history().map(|h| h.to_vec()),
        }
    }
}

impl Machine {
    /// Starts a step session at the Start state.
    ///
    /// Fails with [`CoreError::NoStartState`] if there is none.
    pub fn session(
        &self,
        input: impl Into<String>,
        record_history: bool,
    ) -> Result<Session<'_>, CoreError> {
        Session::new(self, input.into(), record_history)
    }

    /// Validates, then starts a step session.
    pub fn session_checked(
        &self,
        input: impl Into<String>,
        record_history: bool,
    ) -> Result<Session<'_>, CoreError> {
        let validation = self.validate();
        if !validation.is_ok() {
            return Err(CoreError::InvalidMachine(validation));
        }
        self.session(input, record_history)
    }
}
