//! Line-oriented text format for states and machines.
//!
//! Each state occupies one line:
//!
//! ```text
//! [START] S0 :: S0: 0, S1: 1
//! [ACCEPT] S1 :: S1: 0|a, S0: 1|b
//! ```
//!
//! - `[...]` holds an optional role keyword (`START` or `ACCEPT`, any case).
//!   The block is omitted when the state has no role.
//! - The label is a run of ASCII letters, digits, `$` and `_`.
//! - `::` separates the label from a comma-separated list of clauses.
//! - Each clause is `target: token`, optionally followed by `|emit`. When the
//!   first clause carries an emit token every clause must carry one (it may
//!   be empty, as in `S0: 1|`).
//!
//! Whitespace is skipped between tokens but never inside one. A match token
//! ends at whitespace, `,` or `|`; an emit token ends at whitespace or `,`.
//! A clause not followed by a comma ends the list and the rest of the line
//! is ignored. Tokens that break these rules cannot be written; the validator
//! rejects machines holding them.
//!
//! A line that cannot be parsed yields the character offset at which the
//! parser stopped.

use crate::error::CoreError;
use crate::machine::Machine;
use crate::state::{is_label_char, is_token_separator, Role, State, Transition};
use std::fmt;

/// Outcome of parsing a single state line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseResult {
    /// The line described a complete state.
    Parsed(State),
    /// Parsing could not proceed past this character offset.
    FailedAt(usize),
}

impl ParseResult {
    /// Converts into a `Result`, with the failure offset as the error.
    pub fn into_result(self) -> Result<State, usize> {
        match self {
            ParseResult::Parsed(state) => Ok(state),
            ParseResult::FailedAt(offset) => Err(offset),
        }
    }

    pub fn is_parsed(&self) -> bool {
        matches!(self, ParseResult::Parsed(_))
    }
}

/// Parses one line of the text format into a state.
pub fn parse_state(line: &str) -> ParseResult {
    let mut parser = Parser::new(line);
    match parser.parse_state() {
        Ok(state) => ParseResult::Parsed(state),
        Err(pos) => ParseResult::FailedAt(parser.char_offset(pos)),
    }
}

/// Parses a document, skipping lines that do not parse.
///
/// Blank lines are ignored. When two lines share a label the first one wins.
pub fn parse_document(text: &str) -> Machine {
    let mut machine = Machine::new();

    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        match parse_state(line) {
            ParseResult::Parsed(state) => {
                if let Err(e) = machine.add_state(state) {
                    tracing::debug!("Skipping line {}: {}", index + 1, e);
                }
            }
            ParseResult::FailedAt(offset) => {
                tracing::debug!(
                    "Skipping line {}: parse failed at offset {}",
                    index + 1,
                    offset
                );
            }
        }
    }

    machine
}

/// Parses a document, failing on the first bad or duplicate line.
///
/// Line numbers in errors are 1-based. A repeated label fails with
/// [`CoreError::DuplicateLine`].
pub fn parse_document_strict(text: &str) -> Result<Machine, CoreError> {
    let mut machine = Machine::new();

    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        match parse_state(line) {
            ParseResult::Parsed(state) => {
                if machine.has_state(&state.label) {
                    return Err(CoreError::DuplicateLine {
                        line: index + 1,
                        label: state.label,
                    });
                }
                machine.add_state(state)?;
            }
            ParseResult::FailedAt(offset) => {
                return Err(CoreError::Parse {
                    line: index + 1,
                    offset,
                });
            }
        }
    }

    Ok(machine)
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(keyword) = self.role.keyword() {
            write!(f, "[{}] ", keyword)?;
        }
        write!(f, "{} ::", self.label)?;

        for (i, t) in self.transitions().iter().enumerate() {
            let sep = if i == 0 { " " } else { ", " };
            write!(f, "{}{}: {}", sep, t.target, t.input)?;
            if let Some(emit) = self.table.emit(i) {
                write!(f, "|{}", emit)?;
            }
        }

        Ok(())
    }
}

impl fmt::Display for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, state) in self.states().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", state)?;
        }
        Ok(())
    }
}

/// Hand-written scanner over a single line.
///
/// Positions are byte offsets into `input`; failures are reported as the
/// byte position reached and converted to a character offset by the caller.
struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn parse_state(&mut self) -> Result<State, usize> {
        self.skip_whitespace();

        let role = if self.peek_char() == Some('[') {
            self.pos += 1;
            self.parse_role()?
        } else {
            Role::None
        };

        self.skip_whitespace();
        let label = self.parse_label()?;

        self.skip_whitespace();
        if !self.peek_str("::") {
            return Err(self.pos);
        }
        self.pos += 2;
        self.skip_whitespace();

        let mut transitions = Vec::new();
        let mut emits: Option<Vec<String>> = None;

        while !self.at_end() {
            let target = self.parse_label()?;
            self.skip_whitespace();

            if self.peek_char() != Some(':') {
                return Err(self.pos);
            }
            self.pos += 1;
            self.skip_whitespace();

            let input = self.parse_token(true);
            if input.is_empty() {
                return Err(self.pos);
            }
            self.skip_whitespace();

            // The first clause decides whether this state emits output.
            let has_emit = self.peek_char() == Some('|');
            if transitions.is_empty() && has_emit {
                emits = Some(Vec::new());
            }
            match (&mut emits, has_emit) {
                (Some(list), true) => {
                    self.pos += 1;
                    list.push(self.parse_token(false).to_string());
                    self.skip_whitespace();
                }
                (None, false) => {}
                _ => return Err(self.pos),
            }

            transitions.push(Transition::new(input, target));

            if self.peek_char() != Some(',') {
                break;
            }
            self.pos += 1;
            self.skip_whitespace();
        }

        if !self.at_end() {
            tracing::trace!(
                "Ignoring trailing text after last clause: '{}'",
                &self.input[self.pos..]
            );
        }

        Ok(match emits {
            Some(emits) => State::with_output(label, role, transitions, emits),
            None => State::new(label, role, transitions),
        })
    }

    /// Parses the inside of a `[...]` block, the opening bracket consumed.
    fn parse_role(&mut self) -> Result<Role, usize> {
        let mut role = Role::None;

        loop {
            self.skip_whitespace();

            if self.peek_char() == Some(']') {
                self.pos += 1;
                return Ok(role);
            }

            let found = if self.peek_keyword("START") {
                Role::Start
            } else if self.peek_keyword("ACCEPT") {
                Role::Accept
            } else {
                return Err(self.pos);
            };

            // A state is never both START and ACCEPT.
            if role != Role::None {
                return Err(self.pos);
            }
            role = found;
            self.pos += found.keyword().map(str::len).unwrap_or(0);
        }
    }

    fn parse_label(&mut self) -> Result<String, usize> {
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if is_label_char(c) {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }

        if self.pos == start {
            return Err(self.pos);
        }
        Ok(self.input[start..self.pos].to_string())
    }

    /// Consumes a run of token characters, possibly empty.
    fn parse_token(&mut self, stop_at_pipe: bool) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if is_token_separator(c) || (stop_at_pipe && c == '|') {
                break;
            }
            self.pos += c.len_utf8();
        }
        &self.input[start..self.pos]
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_str(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        self.input[self.pos..]
            .get(..keyword.len())
            .map(|s| s.eq_ignore_ascii_case(keyword))
            .unwrap_or(false)
    }

    fn char_offset(&self, pos: usize) -> usize {
        self.input[..pos].chars().count()
    }
}
