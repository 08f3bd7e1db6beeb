//! Property-based tests for parsing and execution.

use mealy_core::state::{is_valid_emit, is_valid_input};
use mealy_core::{Halt, Machine, ParseResult, Role, State, Transition, Validation};
use proptest::prelude::*;

type Clause = (String, usize, String);

/// Match tokens the text format can carry: printable, no whitespace, `,` or `|`.
const PRINTABLE_INPUT: &str = "[[^\\s,|]&&\\PC]{1,4}";
/// Emit tokens may also contain `|` and may be empty.
const PRINTABLE_EMIT: &str = "[[^\\s,]&&\\PC]{0,3}";
/// Anything, including separators and empty tokens.
const ANY_TOKEN: &str = "\\PC{0,4}";

prop_compose! {
    fn arbitrary_table(states: usize, inputs: &'static str, emits: &'static str)(
        clauses in prop::collection::vec((inputs, 0..states, emits), 1..5),
        emitting in any::<bool>(),
        accept in any::<bool>(),
    ) -> (Vec<Clause>, bool, bool) {
        (clauses, emitting, accept)
    }
}

prop_compose! {
    /// S0 starts, the last state accepts, every target exists and every
    /// state has transitions. Tokens are drawn from the given patterns.
    fn machine_with(inputs: &'static str, emits: &'static str)(count in 2..6usize)(
        tables in prop::collection::vec(arbitrary_table(count, inputs, emits), count)
    ) -> Machine {
        let count = tables.len();
        let mut machine = Machine::new();

        for (i, (clauses, emitting, accept)) in tables.into_iter().enumerate() {
            let role = if i == 0 {
                Role::Start
            } else if i == count - 1 || accept {
                Role::Accept
            } else {
                Role::None
            };

            let transitions = clauses
                .iter()
                .map(|(input, target, _)| Transition::new(input.clone(), format!("S{}", target)))
                .collect();
            let label = format!("S{}", i);

            let state = if emitting {
                let emits = clauses.into_iter().map(|(_, _, emit)| emit).collect();
                State::with_output(label, role, transitions, emits)
            } else {
                State::new(label, role, transitions)
            };
            machine.add_state(state).unwrap();
        }

        machine
    }
}

/// Small alphabet, so generated inputs actually drive transitions.
fn valid_machine() -> impl Strategy<Value = Machine> {
    machine_with("[ab]{1,3}", "[xy]{0,2}")
}

fn printable_machine() -> impl Strategy<Value = Machine> {
    machine_with(PRINTABLE_INPUT, PRINTABLE_EMIT)
}

proptest! {
    #[test]
    fn generated_machines_validate(machine in valid_machine()) {
        prop_assert!(machine.validate().is_ok());
    }

    #[test]
    fn text_roundtrip(machine in valid_machine()) {
        let text = machine.to_string();
        let parsed = Machine::parse_strict(&text).unwrap();
        prop_assert_eq!(&parsed, &machine);
        prop_assert_eq!(parsed.labels().collect::<Vec<_>>(), machine.labels().collect::<Vec<_>>());
        prop_assert_eq!(parsed.to_string(), text);
    }

    #[test]
    fn printable_tokens_validate_and_roundtrip(machine in printable_machine()) {
        prop_assert_eq!(machine.validate(), Validation::Ok);
        let parsed = Machine::parse_strict(&machine.to_string()).unwrap();
        prop_assert_eq!(&parsed, &machine);
        prop_assert_eq!(parsed.labels().collect::<Vec<_>>(), machine.labels().collect::<Vec<_>>());
    }

    #[test]
    fn validated_machines_roundtrip(machine in machine_with(ANY_TOKEN, ANY_TOKEN)) {
        match machine.validate() {
            Validation::Ok => {
                let parsed = Machine::parse(&machine.to_string());
                prop_assert_eq!(&parsed, &machine);
                prop_assert_eq!(parsed.labels().collect::<Vec<_>>(), machine.labels().collect::<Vec<_>>());
            }
            Validation::InvalidToken { token, .. } => {
                prop_assert!(!is_valid_input(&token) || !is_valid_emit(&token));
            }
            other => prop_assert!(false, "unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn json_roundtrip(machine in valid_machine()) {
        let json = machine.to_json().unwrap();
        prop_assert_eq!(Machine::from_json(&json).unwrap(), machine);
    }

    #[test]
    fn execution_terminates_and_consumes_input(
        machine in valid_machine(),
        input in "[abc]{0,24}",
    ) {
        let result = machine.execute(&input, true).unwrap();

        // Every transition consumes at least one character.
        prop_assert!(result.transitions <= input.len());
        prop_assert_eq!(result.history.as_ref().map(Vec::len), Some(result.transitions + 1));

        match &result.halt {
            Halt::EndOfInput => {
                let final_accepts = machine.get_state(&result.final_state).unwrap().is_accept();
                prop_assert_eq!(result.accepted, final_accepts);
            }
            Halt::Stuck { remaining, .. } => {
                prop_assert!(!result.accepted);
                prop_assert!(!remaining.is_empty());
                prop_assert!(input.ends_with(remaining.as_str()));
            }
        }
    }

    #[test]
    fn step_matches_batch(
        machine in valid_machine(),
        input in "[abc]{0,24}",
        history in any::<bool>(),
    ) {
        let batch = machine.execute(&input, history).unwrap();

        let mut session = machine.session(input.as_str(), history).unwrap();
        let mut steps = 0;
        while session.step().unwrap() {
            steps += 1;
            prop_assert_eq!(session.transitions(), steps);
            prop_assert!(!session.is_done());
        }
        prop_assert!(session.is_done());

        let snapshot = session.snapshot();
        prop_assert_eq!(&snapshot.state, &batch.final_state);
        prop_assert_eq!(&snapshot.output, &batch.output);
        prop_assert_eq!(snapshot.transitions, batch.transitions);
        prop_assert_eq!(&snapshot.history, &batch.history);
        prop_assert_eq!(&snapshot.message, &batch.message);
        prop_assert_eq!(session.accepted(), batch.accepted);
    }

    #[test]
    fn first_match_wins_over_longer_token(count in 1..20usize) {
        let machine = Machine::parse(
            "[START] S :: A: 1, B: 11\n[ACCEPT] A :: A: 1, B: 11\n[ACCEPT] B :: B: 1",
        );
        let input = "1".repeat(count);
        let result = machine.execute(&input, true).unwrap();

        prop_assert_eq!(result.transitions, count);
        prop_assert_eq!(result.final_state, "A");
        prop_assert!(!result.history.unwrap().iter().any(|label| label == "B"));
    }

    #[test]
    fn parser_never_panics(line in "\\PC{0,40}") {
        match mealy_core::parse_state(&line) {
            ParseResult::Parsed(state) => prop_assert!(!state.label.is_empty()),
            ParseResult::FailedAt(offset) => prop_assert!(offset <= line.chars().count()),
        }
    }

    #[test]
    fn lenient_parse_keeps_valid_lines(
        machine in valid_machine(),
        noise in prop::collection::vec("[ -~]{0,10}", 0..4),
    ) {
        let mut text = machine.to_string();
        for line in &noise {
            // Lines without "::" can never parse as a state.
            if !line.contains("::") {
                text.push('\n');
                text.push_str(line);
            }
        }

        let parsed = Machine::parse(&text);
        prop_assert_eq!(parsed, machine);
    }
}
