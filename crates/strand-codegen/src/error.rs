use strand_netlist::{NetlistError, SourceSpan};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CodegenError>;

#[derive(Debug, Error)]
pub enum CodegenError {
    #[error("Unsupported assignment: {reason}")]
    UnsupportedAssignment { reason: String, span: SourceSpan },

    #[error("Unable to draw statement type {kind}")]
    UnsupportedStatement { kind: String, span: Option<SourceSpan> },

    #[error("Unable to draw expression {expr}")]
    UnsupportedExpression { expr: String, span: SourceSpan },

    /// A `#delay` reached code generation without being resolved
    #[error("{span}: delay statement was never resolved")]
    UnresolvedDelay { span: SourceSpan },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Netlist(#[from] NetlistError),
}

impl CodegenError {
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            CodegenError::UnsupportedAssignment { .. }
                | CodegenError::UnsupportedStatement { .. }
                | CodegenError::UnsupportedExpression { .. }
        )
    }

    pub fn span(&self) -> Option<SourceSpan> {
        match self {
            CodegenError::UnsupportedAssignment { span, .. }
            | CodegenError::UnsupportedExpression { span, .. }
            | CodegenError::UnresolvedDelay { span } => Some(span.clone()),
            CodegenError::UnsupportedStatement { span, .. } => span.clone(),
            _ => None,
        }
    }
}
