//! Execution engine: runs a machine over an input string.
//!
//! Matching rule: at the current state, transitions are tried in declaration
//! order and the first whose match token is a prefix of the remaining input
//! is taken. This is first-match, not longest-match. When nothing matches
//! the run halts stuck without consuming input.
//!
//! Batch runs ([`Machine::execute`]) and step sessions (`Machine::session`)
//! drive the same `Cursor`, so both produce the same final state, output,
//! transition count and history.

use crate::error::CoreError;
use crate::machine::Machine;
use crate::state::State;
use serde::Serialize;
use std::fmt;

/// Why a run stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Halt {
    /// All input was consumed.
    EndOfInput,
    /// No transition matched the remaining input.
    Stuck {
        /// Unconsumed input.
        remaining: String,
        /// Match tokens of the state that was current.
        attempted: Vec<String>,
    },
}

impl Halt {
    pub fn is_stuck(&self) -> bool {
        matches!(self, Halt::Stuck { .. })
    }
}

impl fmt::Display for Halt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Halt::EndOfInput => write!(f, "End Of Input"),
            Halt::Stuck {
                remaining,
                attempted,
            } => {
                let tokens: Vec<String> = attempted.iter().map(|t| format!("\"{}\"", t)).collect();
                write!(
                    f,
                    "No inputs from string \"{}\" matching [{}]",
                    remaining,
                    tokens.join(",")
                )
            }
        }
    }
}

/// Result of running a machine to completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    /// Final state is an Accept state and all input was consumed.
    pub accepted: bool,
    /// Label of the final state.
    pub final_state: String,
    /// Concatenated emit tokens.
    pub output: String,
    /// Number of transitions taken.
    pub transitions: usize,
    /// Why the run stopped.
    pub halt: Halt,
    /// Human-readable form of `halt`.
    pub message: String,
    /// Visited labels, starting with the Start state, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<String>>,
}

/// Returns the index of the first transition of `state` matching `rest`.
///
/// Empty match tokens never match, so every taken transition consumes input.
pub fn match_transition(state: &State, rest: &str) -> Option<usize> {
    state
        .transitions()
        .iter()
        .position(|t| !t.input.is_empty() && rest.starts_with(t.input.as_str()))
}

/// Mutable execution position over a read-only machine.
///
/// The input itself is passed to each [`Cursor::advance`] call so that
/// sessions can own their input while borrowing the machine.
#[derive(Debug, Clone)]
pub(crate) struct Cursor<'m> {
    machine: &'m Machine,
    state: &'m State,
    pos: usize,
    output: String,
    transitions: usize,
    history: Option<Vec<String>>,
    halt: Option<Halt>,
}

impl<'m> Cursor<'m> {
    /// Creates a cursor at the machine's Start state.
    pub(crate) fn new(machine: &'m Machine, record_history: bool) -> Result<Self, CoreError> {
        let state = machine
            .start_label()
            .and_then(|label| machine.get_state(label))
            .ok_or(CoreError::NoStartState)?;

        Ok(Self {
            machine,
            state,
            pos: 0,
            output: String::new(),
            transitions: 0,
            history: record_history.then(|| vec![state.label.clone()]),
            halt: None,
        })
    }

    /// Applies the matching rule once.
    ///
    /// Returns `Ok(true)` if a transition was taken. Returns `Ok(false)` once
    /// the run has halted; further calls change nothing.
    pub(crate) fn advance(&mut self, input: &str) -> Result<bool, CoreError> {
        if self.halt.is_some() {
            return Ok(false);
        }

        let rest = &input[self.pos..];
        if rest.is_empty() {
            self.halt = Some(Halt::EndOfInput);
            return Ok(false);
        }

        let state = self.state;
        let Some(index) = match_transition(state, rest) else {
            tracing::debug!(
                "Stuck in state '{}' at offset {}: no input matches \"{}\"",
                state.label,
                self.pos,
                rest
            );
            self.halt = Some(Halt::Stuck {
                remaining: rest.to_string(),
                attempted: state.transitions().iter().map(|t| t.input.clone()).collect(),
            });
            return Ok(false);
        };

        let transition = &state.transitions()[index];
        let next = self
            .machine
            .get_state(&transition.target)
            .ok_or_else(|| CoreError::UnknownState {
                label: transition.target.clone(),
            })?;

        if let Some(emit) = state.table.emit(index) {
            self.output.push_str(emit);
        }
        self.pos += transition.input.len();
        self.transitions += 1;
        if let Some(history) = &mut self.history {
            history.push(next.label.clone());
        }

        tracing::trace!(
            "{} --{}--> {} (offset {})",
            state.label,
            transition.input,
            next.label,
            self.pos
        );

        self.state = next;
        Ok(true)
    }

    pub(crate) fn state(&self) -> &'m State {
        self.state
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn output(&self) -> &str {
        &self.output
    }

    pub(crate) fn transitions(&self) -> usize {
        self.transitions
    }

    pub(crate) fn history(&self) -> Option<&[String]> {
        self.history.as_deref()
    }

    pub(crate) fn halt(&self) -> Option<&Halt> {
        self.halt.as_ref()
    }

    /// Accepted only after a clean finish in an Accept state.
    pub(crate) fn accepted(&self) -> bool {
        self.halt == Some(Halt::EndOfInput) && self.state.is_accept()
    }

    /// Consumes the cursor into a result. Must only be called once halted.
    pub(crate) fn into_result(self) -> ExecutionResult {
        let accepted = self.accepted();
        let halt = self.halt.unwrap_or(Halt::EndOfInput);
        ExecutionResult {
            accepted,
            final_state: self.state.label.clone(),
            output: self.output,
            transitions: self.transitions,
            message: halt.to_string(),
            halt,
            history: self.history,
        }
    }
}

impl Machine {
    /// Runs the machine over `input` until it is consumed or no transition
    /// matches.
    ///
    /// The machine should have passed [`Machine::validate`]. Without a Start
    /// state this fails with [`CoreError::NoStartState`]; reaching a missing
    /// target fails with [`CoreError::UnknownState`].
    pub fn execute(&self, input: &str, record_history: bool) -> Result<ExecutionResult, CoreError> {
        let mut cursor = Cursor::new(self, record_history)?;
        while cursor.advance(input)? {}
        Ok(cursor.into_result())
    }

    /// Validates, then runs. Fails with [`CoreError::InvalidMachine`] if
    /// validation does not pass.
    pub fn execute_checked(
        &self,
        input: &str,
        record_history: bool,
    ) -> Result<ExecutionResult, CoreError> {
        let validation = self.validate();
        if !validation.is_ok() {
            return Err(CoreError::InvalidMachine(validation));
        }
        self.execute(input, record_history)
    }
}
