//! Unified error interface for DPCL.
//!
//! This module provides the [`ErrorCode`] trait for standardized
//! error handling across the interpreter crates.
//!
//! # Design
//!
//! All DPCL error types implement [`ErrorCode`] to provide:
//!
//! - **Machine-readable codes**: for the shell and for tests
//! - **Recoverability info**: whether the user can fix and retry
//!
//! # Example
//!
//! ```
//! use dpcl_types::ErrorCode;
//!
//! #[derive(Debug)]
//! enum LoadError {
//!     MissingFile(String),
//!     DuplicateAlias(String),
//! }
//!
//! impl ErrorCode for LoadError {
//!     fn code(&self) -> &'static str {
//!         match self {
//!             Self::MissingFile(_) => "LOAD_MISSING_FILE",
//!             Self::DuplicateAlias(_) => "LOAD_DUPLICATE_ALIAS",
//!         }
//!     }
//!
//!     fn is_recoverable(&self) -> bool {
//!         matches!(self, Self::MissingFile(_))
//!     }
//! }
//!
//! let err = LoadError::MissingFile("library.json".into());
//! assert_eq!(err.code(), "LOAD_MISSING_FILE");
//! assert!(err.is_recoverable());
//! ```
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    ///
    /// # Format
    ///
    /// - `UPPER_SNAKE_CASE`
    /// - Prefixed with the owning layer (e.g. `"AST_"`, `"ENGINE_"`)
    /// - Stable across versions (API contract)
    fn code(&self) -> &'static str;

    /// Returns whether the error is recoverable.
    ///
    /// # Returns
    ///
    /// - `true`: the user can take corrective action (fix a path,
    ///   raise a budget) and retry the same input
    /// - `false`: the input itself is wrong and will fail again
    fn is_recoverable(&self) -> bool;
}

/// Validates that an error code follows DPCL conventions.
///
/// # Checks
///
/// 1. Code is `UPPER_SNAKE_CASE`
/// 2. Code starts with the expected prefix
/// 3. Code is not empty
///
/// # Panics
///
/// Panics with a descriptive message if validation fails. Intended
/// for use inside `#[test]` functions.
pub fn assert_error_code<E: ErrorCode>(err: &E, expected_prefix: &str) {
    let code = err.code();

    assert!(!code.is_empty(), "Error code must not be empty");

    assert!(
        code.starts_with(expected_prefix),
        "Error code '{}' must start with prefix '{}'",
        code,
        expected_prefix
    );

    assert!(
        is_upper_snake_case(code),
        "Error code '{}' must be UPPER_SNAKE_CASE",
        code
    );
}

/// Validates multiple error codes at once.
///
/// Use this to verify all variants of an error enum in one test.
pub fn assert_error_codes<E: ErrorCode>(errors: &[E], expected_prefix: &str) {
    for err in errors {
        assert_error_code(err, expected_prefix);
    }
}

/// Checks if a string is UPPER_SNAKE_CASE.
fn is_upper_snake_case(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }

    if s.starts_with('_') || s.ends_with('_') {
        return false;
    }

    if s.contains("__") {
        return false;
    }

    s.chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
