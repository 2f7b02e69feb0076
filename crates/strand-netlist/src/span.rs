//! Source locations carried through the netlist for diagnostics

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Location of a construct in the HDL source
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceSpan {
    /// File path (if known)
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Line number (1-indexed, 0 when unknown)
    #[serde(default)]
    pub line: usize,
    /// Column number (1-indexed, 0 when unknown)
    #[serde(default)]
    pub column: usize,
}

impl SourceSpan {
    pub fn new(file: impl Into<PathBuf>, line: usize, column: usize) -> Self {
        Self {
            file: Some(file.into()),
            line,
            column,
        }
    }

    /// Span without any location information
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn is_known(&self) -> bool {
        self.line != 0
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let file = self
            .file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<unknown>".to_string());
        write!(f, "{}:{}:{}", file, self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_display() {
        let span = SourceSpan::new("top.v", 12, 5);
        assert_eq!(span.to_string(), "top.v:12:5");
        assert!(span.is_known());
        assert_eq!(SourceSpan::unknown().to_string(), "<unknown>:0:0");
    }
}
