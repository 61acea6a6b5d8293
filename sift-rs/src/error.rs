//! Error type shared by every stage of the pipeline.
//!
//! | Variant | Raised by |
//! |---------|-----------|
//! | [`ExprError::Lex`] | malformed or oversized source text |
//! | [`ExprError::Parse`] | malformed grammar |
//! | [`ExprError::Security`] | forbidden patterns, identifiers, or writes |
//! | [`ExprError::Eval`] | division by zero, depth limit |
//!
//! Rate limiting has no variant: a throttled call yields `Value::Absent`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    #[error("lex error at position {position}: {message}")]
    Lex { message: String, position: usize },

    #[error("parse error at position {position}: {message}")]
    Parse { message: String, position: usize },

    #[error("security error: {0}")]
    Security(String),

    #[error("evaluation error: {0}")]
    Eval(String),
}

impl ExprError {
    pub(crate) fn lex(message: impl Into<String>, position: usize) -> Self {
        ExprError::Lex { message: message.into(), position }
    }

    pub(crate) fn parse(message: impl Into<String>, position: usize) -> Self {
        ExprError::Parse { message: message.into(), position }
    }

    /// Character offset into the source, when the error has one.
    pub fn position(&self) -> Option<usize> {
        match self {
            ExprError::Lex { position, .. } | ExprError::Parse { position, .. } => Some(*position),
            ExprError::Security(_) | ExprError::Eval(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_position() {
        let e = ExprError::lex("unterminated string", 4);
        assert_eq!(e.to_string(), "lex error at position 4: unterminated string");
        assert_eq!(e.position(), Some(4));
    }

    #[test]
    fn security_and_eval_have_no_position() {
        assert_eq!(ExprError::Security("x".into()).position(), None);
        assert_eq!(ExprError::Eval("division by zero".into()).to_string(), "evaluation error: division by zero");
    }
}
