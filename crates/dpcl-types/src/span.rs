//! Source spans for diagnostics.
//!
//! Programs arrive as JSON directive arrays, so a span is not a
//! line/column pair but a directive index plus a JSON-pointer-style
//! path into that directive. Every AST term records the span it was
//! decoded from; load errors cite it verbatim.

use serde::{Deserialize, Serialize};

/// Location of a term within a directives array.
///
/// # Example
///
/// ```
/// use dpcl_types::Span;
///
/// let span = Span::directive(3).child("consequence").child("plus");
/// assert_eq!(format!("{span}"), "directive 3 at /consequence/plus");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Index of the directive in the program array.
    pub directive: usize,
    /// JSON-pointer path within the directive ("" for the directive
    /// itself).
    pub path: String,
}

impl Span {
    /// Span of a whole directive.
    #[must_use]
    pub fn directive(index: usize) -> Self {
        Self {
            directive: index,
            path: String::new(),
        }
    }

    /// Extends the path by one object key.
    #[must_use]
    pub fn child(&self, key: &str) -> Self {
        Self {
            directive: self.directive,
            path: format!("{}/{}", self.path, key),
        }
    }

    /// Extends the path by one array index.
    #[must_use]
    pub fn index(&self, i: usize) -> Self {
        Self {
            directive: self.directive,
            path: format!("{}/{}", self.path, i),
        }
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "directive {}", self.directive)
        } else {
            write!(f, "directive {} at {}", self.directive, self.path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_span_display() {
        assert_eq!(format!("{}", Span::directive(0)), "directive 0");
    }

    #[test]
    fn nested_span_display() {
        let span = Span::directive(2).child("content").index(1).child("action");
        assert_eq!(format!("{span}"), "directive 2 at /content/1/action");
    }

    #[test]
    fn child_does_not_mutate() {
        let root = Span::directive(1);
        let _leaf = root.child("holder");
        assert_eq!(root.path, "");
    }
}
