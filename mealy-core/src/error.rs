//! Core error types.

use crate::validate::Validation;
use thiserror::Error;

/// Errors from machine construction and execution.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("parse error on line {line} at offset {offset}")]
    Parse { line: usize, offset: usize },

    #[error("state already exists: {label}")]
    DuplicateState { label: String },

    #[error("duplicate state {label} on line {line}")]
    DuplicateLine { line: usize, label: String },

    #[error("invalid state label: '{label}'")]
    InvalidLabel { label: String },

    #[error("state {label}: input and connection lists differ in length")]
    Unbalanced { label: String },

    #[error("machine has no starting state")]
    NoStartState,

    #[error("unknown state: {label}")]
    UnknownState { label: String },

    #[error("invalid machine: {0}")]
    InvalidMachine(Validation),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Returns a stable error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::Parse { .. } => "PARSE_ERROR",
            CoreError::DuplicateState { .. } | CoreError::DuplicateLine { .. } => "DUPLICATE_STATE",
            CoreError::InvalidLabel { .. } => "INVALID_LABEL",
            CoreError::Unbalanced { .. } => "BAD_REQUEST",
            CoreError::NoStartState => "NO_START_STATE",
            CoreError::UnknownState { .. } => "UNKNOWN_STATE",
            CoreError::InvalidMachine(_) => "INVALID_MACHINE",
            CoreError::Json(_) => "BAD_REQUEST",
        }
    }
}
