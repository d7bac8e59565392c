//! Object references and refinements.
//!
//! An object reference names something in the world without resolving
//! it: a bare name (an atomic entity, a parameter, an alias, or one of
//! the reserved keywords), a refined reference into a compound
//! template, or a scoped reference to a child of another object.
//! Resolution happens in the engine, against an environment.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::event::Event;

/// A refinement: a small ordered map from parameter names to terms.
///
/// Ordered (`BTreeMap`) so that two refinements with the same
/// key/value pairs compare and print identically; refinement
/// equality is what instance identity is built on.
pub type Refinement = BTreeMap<String, RefTerm>;

/// A value bound by a refinement key: an object or an event.
///
/// Object bindings are the common case (`{item: dracula}`); event
/// bindings occur when a template parameterizes over a trigger
/// (`{deadline: "#timeout"}`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RefTerm {
    /// An object reference.
    Object(ObjectRef),
    /// An event.
    Event(Event),
}

impl std::fmt::Display for RefTerm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Object(o) => write!(f, "{o}"),
            Self::Event(e) => write!(f, "{e}"),
        }
    }
}

/// An unresolved reference to an object.
///
/// # Example
///
/// ```
/// use dpcl_ast::{ObjectRef, RefTerm};
///
/// let bare = ObjectRef::name("alice");
/// assert_eq!(format!("{bare}"), "alice");
///
/// let refined = ObjectRef::Refined {
///     object: "borrowing".into(),
///     refinement: [("item".into(), RefTerm::Object(ObjectRef::name("dracula")))]
///         .into_iter()
///         .collect(),
///     alias: None,
/// };
/// assert_eq!(format!("{refined}"), "borrowing{item: dracula}");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectRef {
    /// A bare name: an atomic, a parameter, an alias, a reserved
    /// keyword, or the wildcard `*`.
    Name(String),
    /// A reference into a compound template, selecting the instance
    /// whose bindings match the refinement.
    Refined {
        object: String,
        refinement: Refinement,
        alias: Option<String>,
    },
    /// A child of another object, e.g. `{scope: d1, name: violated}`.
    Scoped {
        scope: Box<ObjectRef>,
        name: Box<ObjectRef>,
    },
}

impl ObjectRef {
    /// Builds a bare-name reference.
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    /// Returns the bare name if this is one.
    #[must_use]
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(n) => Some(n),
            _ => None,
        }
    }

    /// Returns `true` if this is the object wildcard `*`.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Name(n) if n == dpcl_types::name::WILDCARD)
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{name}"),
            Self::Refined {
                object, refinement, ..
            } => {
                write!(f, "{object}")?;
                write_refinement(f, refinement)
            }
            Self::Scoped { scope, name } => write!(f, "{scope}.{name}"),
        }
    }
}

/// Shared `{k: v, ...}` formatting for refined objects and events.
pub(crate) fn write_refinement(
    f: &mut std::fmt::Formatter<'_>,
    refinement: &Refinement,
) -> std::fmt::Result {
    write!(f, "{{")?;
    for (i, (key, term)) in refinement.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{key}: {term}")?;
    }
    write!(f, "}}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(key: &str, value: &str) -> Refinement {
        [(key.to_string(), RefTerm::Object(ObjectRef::name(value)))]
            .into_iter()
            .collect()
    }

    #[test]
    fn bare_name_display() {
        assert_eq!(format!("{}", ObjectRef::name("library")), "library");
    }

    #[test]
    fn wildcard_detection() {
        assert!(ObjectRef::name("*").is_wildcard());
        assert!(!ObjectRef::name("alice").is_wildcard());
    }

    #[test]
    fn refined_display_orders_keys() {
        let mut refinement = binding("lender", "library");
        refinement.extend(binding("borrower", "alice"));
        let obj = ObjectRef::Refined {
            object: "borrowing".into(),
            refinement,
            alias: None,
        };
        // BTreeMap iterates keys alphabetically regardless of insertion order.
        assert_eq!(
            format!("{obj}"),
            "borrowing{borrower: alice, lender: library}"
        );
    }

    #[test]
    fn scoped_display() {
        let obj = ObjectRef::Scoped {
            scope: Box::new(ObjectRef::name("d1")),
            name: Box::new(ObjectRef::name("violated")),
        };
        assert_eq!(format!("{obj}"), "d1.violated");
    }

    #[test]
    fn refinement_equality_ignores_insertion_order() {
        let mut a = binding("x", "foo");
        a.extend(binding("y", "bar"));
        let mut b = binding("y", "bar");
        b.extend(binding("x", "foo"));
        assert_eq!(a, b);
    }
}
