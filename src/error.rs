use crate::node::ValueKind;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HyperlispError {
    #[error("line {line}: indentation of {spaces} spaces is not a two space step from the enclosing node")]
    Indentation { line: usize, spaces: usize },

    #[error("line {line}: {kind} not closed before end of input")]
    UnterminatedLiteral { line: usize, kind: LiteralKind },

    #[error("line {line}: block comment not closed before end of input")]
    UnterminatedComment { line: usize },

    #[error("line {line}: invalid escape sequence '\\{sequence}'")]
    InvalidEscape { line: usize, sequence: String },

    #[error("line {line}: single line string literal contains a line break")]
    LineBreakInLiteral { line: usize },

    #[error("line {line}: carriage return without a following line feed")]
    LoneCarriageReturn { line: usize },

    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    /// Raised for zero top-level nodes as well as for more than one.
    #[error("node payload must decode to exactly one top-level node, found {found}")]
    MultipleRoots { found: usize },

    #[error("cannot convert {from} '{text}' to {target}")]
    Conversion {
        from: String,
        text: String,
        target: ValueKind,
    },

    #[error("invalid path expression '{expression}': {reason}")]
    Expression { expression: String, reason: String },

    #[error("line {line}: {source}")]
    AtLine {
        line: usize,
        #[source]
        source: Box<HyperlispError>,
    },
}

impl HyperlispError {
    pub fn innermost(&self) -> &HyperlispError {
        match self {
            HyperlispError::AtLine { source, .. } => source.innermost(),
            other => other,
        }
    }

    pub(crate) fn at_line(self, line: usize) -> HyperlispError {
        match self {
            // already positioned by the lexer or a nested decode
            e @ HyperlispError::AtLine { .. } => e,
            e => HyperlispError::AtLine {
                line,
                source: Box::new(e),
            },
        }
    }

    pub(crate) fn syntax(line: usize, message: impl Into<String>) -> HyperlispError {
        HyperlispError::Syntax {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn expression(expression: &str, reason: impl Into<String>) -> HyperlispError {
        HyperlispError::Expression {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    SingleLine,
    MultiLine,
}

impl std::fmt::Display for LiteralKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LiteralKind::SingleLine => f.write_str("single line string literal"),
            LiteralKind::MultiLine => f.write_str("multi line string literal"),
        }
    }
}
