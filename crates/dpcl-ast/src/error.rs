//! Decoding errors.
//!
//! All variants implement [`ErrorCode`] with the `AST_` prefix.
//! Every variant corresponds to a structural defect in the program
//! file; none of them is recoverable by retrying the same input.

use dpcl_types::{ErrorCode, Span};
use thiserror::Error;

/// Error produced while decoding a JSON value into the term model.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// No directive/term constructor matches the value's shape.
    #[error("{span}: unrecognized shape")]
    UnrecognizedShape { span: Span },

    /// A value had the wrong JSON type.
    #[error("{span}: expected {expected}")]
    ExpectedType { span: Span, expected: &'static str },

    /// A required field is missing.
    #[error("{span}: missing required field `{field}`")]
    MissingField { span: Span, field: &'static str },

    /// A name does not match the lowercase alphanumeric vocabulary.
    #[error("{span}: invalid name `{name}`")]
    InvalidName { span: Span, name: String },

    /// An event tag is not `#` followed by a valid name.
    #[error("{span}: invalid event tag `{tag}`")]
    InvalidTag { span: Span, tag: String },

    /// An unknown `position` keyword.
    #[error("{span}: unknown position `{position}`")]
    UnknownPosition { span: Span, position: String },

    /// A reactive rule without an `event` pattern.
    #[error("{span}: reactive rule requires an `event` pattern")]
    MissingRuleEvent { span: Span },

    /// The program root is not a JSON array.
    #[error("program root must be a JSON array of directives")]
    RootNotArray,
}

impl ParseError {
    /// The span the error points at, when it has one.
    #[must_use]
    pub fn span(&self) -> Option<&Span> {
        match self {
            Self::UnrecognizedShape { span }
            | Self::ExpectedType { span, .. }
            | Self::MissingField { span, .. }
            | Self::InvalidName { span, .. }
            | Self::InvalidTag { span, .. }
            | Self::UnknownPosition { span, .. }
            | Self::MissingRuleEvent { span } => Some(span),
            Self::RootNotArray => None,
        }
    }
}

impl ErrorCode for ParseError {
    fn code(&self) -> &'static str {
        match self {
            Self::UnrecognizedShape { .. } => "AST_UNRECOGNIZED_SHAPE",
            Self::ExpectedType { .. } => "AST_EXPECTED_TYPE",
            Self::MissingField { .. } => "AST_MISSING_FIELD",
            Self::InvalidName { .. } => "AST_INVALID_NAME",
            Self::InvalidTag { .. } => "AST_INVALID_TAG",
            Self::UnknownPosition { .. } => "AST_UNKNOWN_POSITION",
            Self::MissingRuleEvent { .. } => "AST_MISSING_RULE_EVENT",
            Self::RootNotArray => "AST_ROOT_NOT_ARRAY",
        }
    }

    fn is_recoverable(&self) -> bool {
        // The program file itself is malformed; retrying won't help.
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpcl_types::assert_error_codes;

    fn all_variants() -> Vec<ParseError> {
        let span = Span::directive(0);
        vec![
            ParseError::UnrecognizedShape { span: span.clone() },
            ParseError::ExpectedType {
                span: span.clone(),
                expected: "string",
            },
            ParseError::MissingField {
                span: span.clone(),
                field: "action",
            },
            ParseError::InvalidName {
                span: span.clone(),
                name: "Alice".into(),
            },
            ParseError::InvalidTag {
                span: span.clone(),
                tag: "borrow".into(),
            },
            ParseError::UnknownPosition {
                span: span.clone(),
                position: "permission".into(),
            },
            ParseError::MissingRuleEvent { span },
            ParseError::RootNotArray,
        ]
    }

    #[test]
    fn all_error_codes_valid() {
        assert_error_codes(&all_variants(), "AST_");
    }

    #[test]
    fn nothing_is_recoverable() {
        for err in all_variants() {
            assert!(!err.is_recoverable(), "{} should not be recoverable", err.code());
        }
    }

    #[test]
    fn messages_cite_span() {
        let err = ParseError::MissingField {
            span: Span::directive(4).child("consequence"),
            field: "plus",
        };
        let msg = err.to_string();
        assert!(msg.contains("directive 4"));
        assert!(msg.contains("/consequence"));
        assert!(msg.contains("plus"));
    }
}
