use strand_netlist::{NetlistError, SourceSpan};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DelayError>;

#[derive(Debug, Error)]
pub enum DelayError {
    /// A non-constant delay has no structural form to drive a net with
    #[error("Expression {expr} is not suitable for delay expression.")]
    NotSynthesizable { expr: String, span: SourceSpan },

    #[error("delay specification has a {slot} delay but no {missing} delay")]
    MissingSlot {
        slot: &'static str,
        missing: &'static str,
    },

    #[error(transparent)]
    Netlist(#[from] NetlistError),
}

impl DelayError {
    /// Fatal errors abort the compile; the rest are reported and the
    /// affected delay slot is left empty
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DelayError::NotSynthesizable { .. })
    }
}
