//! # mealy-core
//!
//! Finite-state transducer engine for mealy.
//!
//! This crate provides:
//! - The state model: labelled states with roles and ordered transitions
//! - A line-oriented text format, with a hand-written parser and serializer
//! - Structural validation and lints
//! - Run-to-completion and step-by-step execution with optional output

pub mod codec;
pub mod engine;
pub mod error;
pub mod machine;
pub mod session;
pub mod state;
pub mod validate;

pub use codec::{parse_document, parse_document_strict, parse_state, ParseResult};
pub use engine::{match_transition, ExecutionResult, Halt};
pub use error::CoreError;
pub use machine::Machine;
pub use session::{Session, SessionSnapshot};
pub use state::{RawState, Role, State, Transition, TransitionTable};
pub use validate::{Lint, Validation};
