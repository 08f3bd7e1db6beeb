//! State model types.
//!
//! A state is a labelled node with a [`Role`] and an ordered transition
//! table. Transition order is significant: execution takes the first
//! transition whose match token prefixes the remaining input.
//!
//! Output tracking is a property of the table, not of each transition. A
//! [`TransitionTable::Emitting`] table carries one emit token per
//! transition (possibly empty); a [`TransitionTable::Plain`] table carries
//! none.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};

/// Returns true if `c` may appear in a state label.
pub fn is_label_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '$' || c == '_'
}

/// Returns true if `label` is a non-empty run of label characters.
pub fn is_valid_label(label: &str) -> bool {
    !label.is_empty() && label.chars().all(is_label_char)
}

/// Returns true if `c` ends a token in the text format.
///
/// Match tokens also end at `|`; emit tokens may contain it.
pub fn is_token_separator(c: char) -> bool {
    c.is_whitespace() || c == ','
}

/// Returns true if `token` can be written and read back as a match token.
pub fn is_valid_input(token: &str) -> bool {
    !token.is_empty() && !token.chars().any(|c| is_token_separator(c) || c == '|')
}

/// Returns true if `token` can be written and read back as an emit token.
/// The empty token is allowed.
pub fn is_valid_emit(token: &str) -> bool {
    !token.chars().any(is_token_separator)
}

/// Role of a state within its machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Ordinary state.
    #[default]
    None,
    /// Entry point of the machine.
    Start,
    /// Valid termination state.
    Accept,
}

impl Role {
    /// Keyword used inside the `[...]` role block, if any.
    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            Role::None => None,
            Role::Start => Some("START"),
            Role::Accept => Some("ACCEPT"),
        }
    }
}

/// A single transition: on `input`, move to `target`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// Token that must prefix the remaining input.
    pub input: String,
    /// Label of the next state.
    pub target: String,
}

impl Transition {
    pub fn new(input: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            target: target.into(),
        }
    }
}

/// Ordered transitions of a state, with or without emit tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionTable {
    /// No output is produced by this state.
    Plain(Vec<Transition>),
    /// `emits[i]` is appended to the output when `transitions[i]` is taken.
    Emitting {
        transitions: Vec<Transition>,
        emits: Vec<String>,
    },
}

impl Default for TransitionTable {
    fn default() -> Self {
        TransitionTable::Plain(Vec::new())
    }
}

impl TransitionTable {
    /// Returns the transitions in declaration order.
    pub fn transitions(&self) -> &[Transition] {
        match self {
            TransitionTable::Plain(transitions) => transitions,
            TransitionTable::Emitting { transitions, .. } => transitions,
        }
    }

    /// Returns the emit token for transition `index`, if this table emits.
    pub fn emit(&self, index: usize) -> Option<&str> {
        match self {
            TransitionTable::Plain(_) => None,
            TransitionTable::Emitting { emits, .. } => emits.get(index).map(String::as_str),
        }
    }

    /// Returns the emit column, if this table emits.
    pub fn emits(&self) -> Option<&[String]> {
        match self {
            TransitionTable::Plain(_) => None,
            TransitionTable::Emitting { emits, .. } => Some(emits),
        }
    }

    pub fn is_emitting(&self) -> bool {
        matches!(self, TransitionTable::Emitting { .. })
    }

    /// Returns false if the emit column does not line up with the transitions.
    pub fn is_balanced(&self) -> bool {
        match self {
            TransitionTable::Plain(_) => true,
            TransitionTable::Emitting { transitions, emits } => transitions.len() == emits.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.transitions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions().is_empty()
    }
}

/// A state in the machine.
///
/// Equality compares every field; identity within a machine is by label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    /// Unique label within the machine.
    pub label: String,
    /// Role of this state.
    pub role: Role,
    /// Ordered transition table.
    pub table: TransitionTable,
}

impl State {
    /// Creates a state that produces no output.
    pub fn new(label: impl Into<String>, role: Role, transitions: Vec<Transition>) -> Self {
        Self {
            label: label.into(),
            role,
            table: TransitionTable::Plain(transitions),
        }
    }

    /// Creates an output-tracking state.
    ///
    /// The emit column is stored as given; a length mismatch is reported by
    /// the validator rather than rejected here.
    pub fn with_output(
        label: impl Into<String>,
        role: Role,
        transitions: Vec<Transition>,
        emits: Vec<String>,
    ) -> Self {
        Self {
            label: label.into(),
            role,
            table: TransitionTable::Emitting { transitions, emits },
        }
    }

    pub fn transitions(&self) -> &[Transition] {
        self.table.transitions()
    }

    pub fn is_start(&self) -> bool {
        self.role == Role::Start
    }

    pub fn is_accept(&self) -> bool {
        self.role == Role::Accept
    }

    /// Returns the match tokens in declaration order.
    pub fn inputs(&self) -> Vec<&str> {
        self.transitions().iter().map(|t| t.input.as_str()).collect()
    }
}

/// Column-form state as produced by external editors.
///
/// `input[i]` leads to `conns[i]`; when present, `output[i]` is emitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawState {
    pub label: String,

    #[serde(default)]
    pub role: Role,

    #[serde(default)]
    pub input: Vec<String>,

    #[serde(default)]
    pub conns: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Vec<String>>,
}

impl TryFrom<RawState> for State {
    type Error = CoreError;

    fn try_from(raw: RawState) -> Result<Self, Self::Error> {
        if !is_valid_label(&raw.label) {
            return Err(CoreError::InvalidLabel { label: raw.label });
        }

        if raw.input.len() != raw.conns.len() {
            return Err(CoreError::Unbalanced { label: raw.label });
        }

        let transitions = raw
            .input
            .into_iter()
            .zip(raw.conns)
            .map(|(input, target)| Transition { input, target })
            .collect();

        Ok(match raw.output {
            Some(emits) => State::with_output(raw.label, raw.role, transitions, emits),
            None => State::new(raw.label, raw.role, transitions),
        })
    }
}

impl From<&State> for RawState {
    fn from(state: &State) -> Self {
        let transitions = state.transitions();
        Self {
            label: state.label.clone(),
            role: state.role,
            input: transitions.iter().map(|t| t.input.clone()).collect(),
            conns: transitions.iter().map(|t| t.target.clone()).collect(),
            output: state.table.emits().map(|e| e.to_vec()),
        }
    }
}
