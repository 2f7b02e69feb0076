//! Error types for netlist construction and queries

use crate::span::SourceSpan;
use thiserror::Error;

/// Result type for netlist operations
pub type Result<T> = std::result::Result<T, NetlistError>;

/// Errors raised by the netlist store.
///
/// All of these indicate a malformed elaborated design (or a bug in the pass
/// that produced it) and abort the compile.
#[derive(Debug, Error)]
pub enum NetlistError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse netlist: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown scope: {0}")]
    UnknownScope(String),

    #[error("Unknown signal: {0}")]
    UnknownSignal(String),

    #[error("Unknown event: {0}")]
    UnknownEvent(String),

    #[error("Duplicate name in scope {scope}: {name}")]
    DuplicateName { scope: String, name: String },

    #[error("Pin {pin} out of range for {object} ({count} pins)")]
    PinOutOfRange {
        object: String,
        pin: u32,
        count: u32,
    },

    #[error("Width mismatch connecting {left} ({left_width}) to {right} ({right_width})")]
    WidthMismatch {
        left: String,
        left_width: usize,
        right: String,
        right_width: usize,
    },

    #[error("Invalid number literal: {0}")]
    InvalidNumber(String),

    #[error("{span}: unable to bind name `{name}`")]
    UnresolvedName { name: String, span: SourceSpan },

    #[error("Reference to deleted object {0}")]
    DeadObject(String),

    #[error("Internal invariant violated: {0}")]
    Invariant(String),
}
