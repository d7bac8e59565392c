//! Engine errors.
//!
//! One error type for the whole runtime layer, implementing
//! [`ErrorCode`] with the `ENGINE_` prefix.
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`EngineError::Schema`] | `ENGINE_SCHEMA_ERROR` | No |
//! | [`EngineError::Name`] | `ENGINE_NAME_ERROR` | No |
//! | [`EngineError::Runtime`] | `ENGINE_RUNTIME_ERROR` | No |
//! | [`EngineError::CascadeOverflow`] | `ENGINE_CASCADE_OVERFLOW` | Yes |
//! | [`EngineError::Io`] | `ENGINE_IO_ERROR` | Yes |
//!
//! An action request that matches no power is NOT an error: the
//! cascade simply does nothing. Errors raised mid-cascade abort that
//! cascade; the world keeps the state it had before the offending
//! event was popped.

use dpcl_ast::ParseError;
use dpcl_types::ErrorCode;
use thiserror::Error;

/// Runtime-layer error.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// A directive failed structural validation.
    #[error("schema error: {0}")]
    Schema(#[from] ParseError),

    /// Unknown reference, reserved-name misuse, or duplicate alias.
    #[error("name error: {0}")]
    Name(String),

    /// An operation on the live world failed: `minus` of a non-live
    /// object, or `self`/`holder` used outside a binding context.
    #[error("runtime error: {0}")]
    Runtime(String),

    /// The cascade exceeded the configured step budget.
    #[error("cascade overflow: exceeded step budget of {budget}")]
    CascadeOverflow { budget: usize },

    /// A `load` or `import` target could not be read.
    #[error("io error: {0}")]
    Io(String),
}

impl EngineError {
    /// Shorthand for a [`EngineError::Name`] with a formatted message.
    #[must_use]
    pub fn name(msg: impl Into<String>) -> Self {
        Self::Name(msg.into())
    }

    /// Shorthand for a [`EngineError::Runtime`] with a formatted message.
    #[must_use]
    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }
}

impl ErrorCode for EngineError {
    fn code(&self) -> &'static str {
        match self {
            Self::Schema(_) => "ENGINE_SCHEMA_ERROR",
            Self::Name(_) => "ENGINE_NAME_ERROR",
            Self::Runtime(_) => "ENGINE_RUNTIME_ERROR",
            Self::CascadeOverflow { .. } => "ENGINE_CASCADE_OVERFLOW",
            Self::Io(_) => "ENGINE_IO_ERROR",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // The program or input is wrong; retrying won't help.
            Self::Schema(_) | Self::Name(_) | Self::Runtime(_) => false,
            // The user can raise the budget or fix the path.
            Self::CascadeOverflow { .. } | Self::Io(_) => true,
        }
    }
}
