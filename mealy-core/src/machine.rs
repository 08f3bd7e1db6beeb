//! Machine: an ordered collection of uniquely labelled states.
//!
//! Insertion order is preserved so serialization is deterministic and
//! "first Start state" has a stable meaning. Structural invariants (one
//! Start state, known targets, ...) are checked by [`Machine::validate`],
//! not on insertion.

use crate::codec;
use crate::error::CoreError;
use crate::state::{RawState, State};
use indexmap::IndexMap;

/// A finite-state transducer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Machine {
    states: IndexMap<String, State>,
}

impl Machine {
    /// Creates an empty machine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a document leniently; lines that fail to parse are skipped.
    pub fn parse(text: &str) -> Self {
        codec::parse_document(text)
    }

    /// Parses a document, failing on the first bad or duplicate line.
    pub fn parse_strict(text: &str) -> Result<Self, CoreError> {
        codec::parse_document_strict(text)
    }

    /// Builds a machine from column-form states.
    pub fn from_raw_states(raw: impl IntoIterator<Item = RawState>) -> Result<Self, CoreError> {
        let mut machine = Self::new();
        for raw_state in raw {
            machine.add_state(State::try_from(raw_state)?)?;
        }
        Ok(machine)
    }

    /// Builds a machine from a JSON array of column-form states.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let raw: Vec<RawState> = serde_json::from_str(json)?;
        Self::from_raw_states(raw)
    }

    /// Returns the machine as column-form states.
    pub fn to_raw_states(&self) -> Vec<RawState> {
        self.states.values().map(RawState::from).collect()
    }

    /// Returns the machine as a JSON array of column-form states.
    pub fn to_json(&self) -> Result<String, CoreError> {
        Ok(serde_json::to_string_pretty(&self.to_raw_states())?)
    }

    /// Adds a state. Fails if the label is already taken.
    pub fn add_state(&mut self, state: State) -> Result<(), CoreError> {
        if self.states.contains_key(&state.label) {
            return Err(CoreError::DuplicateState { label: state.label });
        }
        self.states.insert(state.label.clone(), state);
        Ok(())
    }

    /// Parses a single state line and adds it.
    ///
    /// A line that does not parse is reported as a parse error on line 1.
    pub fn add_state_from_str(&mut self, line: &str) -> Result<(), CoreError> {
        let state = codec::parse_state(line)
            .into_result()
            .map_err(|offset| CoreError::Parse { line: 1, offset })?;
        self.add_state(state)
    }

    /// Removes a state by label, keeping the order of the remaining states.
    pub fn remove_state(&mut self, label: &str) -> Option<State> {
        self.states.shift_remove(label)
    }

    pub fn has_state(&self, label: &str) -> bool {
        self.states.contains_key(label)
    }

    pub fn get_state(&self, label: &str) -> Option<&State> {
        self.states.get(label)
    }

    /// Returns the label of the first Start state in iteration order.
    pub fn start_label(&self) -> Option<&str> {
        self.states
            .values()
            .find(|s| s.is_start())
            .map(|s| s.label.as_str())
    }

    /// Iterates states in insertion order.
    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.states.values()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.states.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// CRC32C of the text form, as 8 hex digits.
    pub fn checksum(&self) -> String {
        format!("{:08x}", crc32c::crc32c(self.to_string().as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{Role, Transition};

    fn sample_machine() -> Machine {
        let mut machine = Machine::new();
        machine
            .add_state(State::new(
                "S0",
                Role::Start,
                vec![Transition::new("0", "S0"), Transition::new("1", "S1")],
            ))
            .unwrap();
        machine
            .add_state(State::new(
                "S1",
                Role::Accept,
                vec![Transition::new("0", "S1"), Transition::new("1", "S0")],
            ))
            .unwrap();
        machine
    }

    #[test]
    fn test_add_and_get_state() {
        let machine = sample_machine();
        assert_eq!(machine.len(), 2);
        assert!(machine.has_state("S0"));
        assert!(!machine.has_state("S2"));
        assert_eq!(machine.get_state("S1").unwrap().role, Role::Accept);
    }

    #[test]
    fn test_add_duplicate_state() {
        let mut machine = sample_machine();
        let result = machine.add_state(State::new("S0", Role::None, vec![]));
        assert!(matches!(result, Err(CoreError::DuplicateState { .. })));
        // Original state untouched.
        assert_eq!(machine.get_state("S0").unwrap().role, Role::Start);
    }

    #[test]
    fn test_remove_state_preserves_order() {
        let mut machine = sample_machine();
        machine
            .add_state(State::new("S2", Role::None, vec![]))
            .unwrap();

        let removed = machine.remove_state("S1").unwrap();
        assert_eq!(removed.label, "S1");
        assert!(machine.remove_state("S1").is_none());
        assert_eq!(machine.labels().collect::<Vec<_>>(), vec!["S0", "S2"]);
    }

    #[test]
    fn test_start_label() {
        let mut machine = sample_machine();
        assert_eq!(machine.start_label(), Some("S0"));

        machine.remove_state("S0");
        assert_eq!(machine.start_label(), None);
    }

    #[test]
    fn test_add_state_from_str() {
        let mut machine = Machine::new();
        machine.add_state_from_str("[START] A :: B: x").unwrap();
        assert_eq!(machine.start_label(), Some("A"));

        let err = machine.add_state_from_str("A B").unwrap_err();
        assert!(matches!(err, CoreError::Parse { offset: 2, .. }));
    }

    #[test]
    fn test_json_roundtrip() {
        let machine = sample_machine();
        let json = machine.to_json().unwrap();
        let restored = Machine::from_json(&json).unwrap();
        assert_eq!(restored, machine);
    }

    #[test]
    fn test_from_json_rejects_duplicates() {
        let json = r#"[{"label": "A"}, {"label": "A"}]"#;
        assert!(matches!(
            Machine::from_json(json),
            Err(CoreError::DuplicateState { .. })
        ));
    }

    #[test]
    fn test_checksum_follows_text_form() {
        let a = sample_machine();
        let b = Machine::parse(&a.to_string());
        assert_eq!(a.checksum(), b.checksum());
        assert_eq!(a.checksum().len(), 8);

        let mut c = sample_machine();
        c.remove_state("S1");
        assert_ne!(a.checksum(), c.checksum());
    }
}
