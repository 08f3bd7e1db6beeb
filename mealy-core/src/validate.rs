//! Structural validation and lints.

use crate::machine::Machine;
use crate::state::{is_valid_emit, is_valid_input, is_valid_label};
use serde::Serialize;
use std::fmt;

/// Outcome of [`Machine::validate`].
///
/// Only the first violation found is reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum Validation {
    /// Structurally sound.
    Ok,
    /// No Start state.
    NoStart,
    /// A second Start state was found.
    MultipleStart { state: String },
    /// No Accept state.
    NoAccept,
    /// A transition targets a label that is not in the machine.
    UnknownTarget { state: String, target: String },
    /// The emit column does not line up with the transitions.
    Unbalanced { state: String },
    /// The state has no outgoing transitions.
    NoTransitions { state: String },
    /// A match or emit token cannot be written in the text format.
    InvalidToken { state: String, token: String },
    /// The label cannot be written in the text format.
    InvalidLabel { state: String },
}

impl Validation {
    pub fn is_ok(&self) -> bool {
        matches!(self, Validation::Ok)
    }

    /// Numeric code, stable across releases.
    pub fn code(&self) -> u8 {
        match self {
            Validation::Ok => 0,
            Validation::NoStart => 1,
            Validation::MultipleStart { .. } => 2,
            Validation::NoAccept => 3,
            Validation::UnknownTarget { .. } => 4,
            Validation::Unbalanced { .. } => 5,
            Validation::NoTransitions { .. } => 6,
            Validation::InvalidToken { .. } => 7,
            Validation::InvalidLabel { .. } => 8,
        }
    }
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validation::Ok => write!(f, "OK"),
            Validation::NoStart => write!(f, "No starting state found"),
            Validation::MultipleStart { state } => {
                write!(f, "More than one starting state found ({})", state)
            }
            Validation::NoAccept => write!(f, "No accepting state"),
            Validation::UnknownTarget { state, target } => {
                write!(f, "State {}: unknown connecting state {}", state, target)
            }
            Validation::Unbalanced { state } => {
                write!(f, "State {}: unbalanced inputs/outputs/conns", state)
            }
            Validation::NoTransitions { state } => write!(f, "State {}: takes no inputs", state),
            Validation::InvalidToken { state, token } => {
                write!(f, "State {}: invalid token \"{}\"", state, token)
            }
            Validation::InvalidLabel { state } => write!(f, "Invalid state label \"{}\"", state),
        }
    }
}

/// A non-fatal finding about a machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Lint {
    /// `input` can never be taken because the earlier `shadowed_by` token is
    /// a prefix of it and always matches first.
    ShadowedTransition {
        state: String,
        input: String,
        shadowed_by: String,
    },
}

impl fmt::Display for Lint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lint::ShadowedTransition {
                state,
                input,
                shadowed_by,
            } => write!(
                f,
                "State {}: input \"{}\" is unreachable, \"{}\" always matches first",
                state, input, shadowed_by
            ),
        }
    }
}

impl Machine {
    /// Checks structural well-formedness.
    ///
    /// States are scanned in iteration order. Per state the checks are:
    /// label, duplicate Start, unbalanced emit column, no transitions,
    /// tokens, unknown target. Missing Start and missing Accept are reported
    /// after the scan.
    ///
    /// A machine that passes serializes to text that parses back to an
    /// equal machine.
    pub fn validate(&self) -> Validation {
        let mut met_start = false;
        let mut met_accept = false;

        for state in self.states() {
            if !is_valid_label(&state.label) {
                return Validation::InvalidLabel {
                    state: state.label.clone(),
                };
            }

            if state.is_start() {
                if met_start {
                    return Validation::MultipleStart {
                        state: state.label.clone(),
                    };
                }
                met_start = true;
            } else if state.is_accept() {
                met_accept = true;
            }

            if !state.table.is_balanced() {
                return Validation::Unbalanced {
                    state: state.label.clone(),
                };
            }

            if state.table.is_empty() {
                return Validation::NoTransitions {
                    state: state.label.clone(),
                };
            }

            let bad_input = state
                .transitions()
                .iter()
                .map(|t| t.input.as_str())
                .find(|token| !is_valid_input(token));
            let bad_emit = state
                .table
                .emits()
                .and_then(|emits| emits.iter().map(String::as_str).find(|e| !is_valid_emit(e)));
            if let Some(token) = bad_input.or(bad_emit) {
                return Validation::InvalidToken {
                    state: state.label.clone(),
                    token: token.to_string(),
                };
            }

            if let Some(t) = state.transitions().iter().find(|t| !self.has_state(&t.target)) {
                return Validation::UnknownTarget {
                    state: state.label.clone(),
                    target: t.target.clone(),
                };
            }
        }

        if !met_start {
            return Validation::NoStart;
        }
        if !met_accept {
            return Validation::NoAccept;
        }

        Validation::Ok
    }

    /// Reports transitions that can never be taken.
    pub fn lint(&self) -> Vec<Lint> {
        let mut lints = Vec::new();

        for state in self.states() {
            let transitions = state.transitions();
            for (i, t) in transitions.iter().enumerate() {
                if t.input.is_empty() {
                    continue;
                }

                let shadow = transitions[..i]
                    .iter()
                    .find(|earlier| !earlier.input.is_empty() && t.input.starts_with(&earlier.input));
                if let Some(earlier) = shadow {
                    lints.push(Lint::ShadowedTransition {
                        state: state.label.clone(),
                        input: t.input.clone(),
                        shadowed_by: earlier.input.clone(),
                    });
                }
            }
        }

        lints
    }
}
