//! Error types for the tangle core
//!
//! Errors carry the original line number and the offending text so a fault in
//! the generated module text can be traced back to the source document.

use crate::tangle::tags::Tag;
use std::fmt;

/// Why a line's indentation was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndentViolation {
    /// The marker line's leading whitespace is not a multiple of the indent unit.
    NotUnitMultiple { width: usize },
    /// A collected body line does not start with the active entity's indent.
    BodyMismatch { expected: String },
}

/// Errors that can occur while collecting procedures from a line stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TangleError {
    /// A procedure or example header failed the name/parameter grammar.
    MalformedHeader { line_no: usize, header: String },
    /// A line's indentation is structurally invalid.
    IndentationViolation {
        line_no: usize,
        line: String,
        reason: IndentViolation,
    },
    /// A tag arrived in a state that has no defined transition.
    UnexpectedTag {
        line_no: usize,
        tag: Tag,
        line: String,
    },
    /// A skip region was still open when the input ended.
    UnterminatedSkipRegion { start_line: usize },
}

impl fmt::Display for TangleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedHeader { line_no, header } => {
                write!(f, "malformed procedure header on line {line_no}: {header}")
            }
            Self::IndentationViolation {
                line_no,
                line,
                reason,
            } => match reason {
                IndentViolation::NotUnitMultiple { width } => write!(
                    f,
                    "indentation of {width} spaces on line {line_no} is not a multiple of the indent unit: {line}"
                ),
                IndentViolation::BodyMismatch { expected } => write!(
                    f,
                    "line {line_no} does not start with the procedure's indent ({} spaces): {line}",
                    expected.len()
                ),
            },
            Self::UnexpectedTag { line_no, tag, line } => {
                write!(f, "unexpected {tag} tag on line {line_no}: {line}")
            }
            Self::UnterminatedSkipRegion { start_line } => {
                write!(
                    f,
                    "skip region opened on line {start_line} was never closed; everything to the end of input was dropped"
                )
            }
        }
    }
}

impl std::error::Error for TangleError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_mentions_line_number() {
        let err = TangleError::MalformedHeader {
            line_no: 7,
            header: "foo(:".to_string(),
        };
        assert!(err.to_string().contains("line 7"));
        assert!(err.to_string().contains("foo(:"));
    }

    #[test]
    fn test_display_unexpected_tag() {
        let err = TangleError::UnexpectedTag {
            line_no: 3,
            tag: Tag::EndProc,
            line: "res".to_string(),
        };
        assert!(err.to_string().contains("END_PROC"));
    }
}
