//! Boolean expressions.
//!
//! Used as transformational-rule conditions and as state-shaped
//! deontic triggers. Evaluation lives in the engine; this module is
//! only the shape.

use serde::{Deserialize, Serialize};

use crate::term::ObjectRef;

/// A boolean expression over the world state.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BoolExpr {
    /// A literal `true` or `false`.
    Literal(bool),
    /// A descriptor condition: whether `entity` has (or lacks)
    /// `descriptor`.
    Descriptor {
        entity: ObjectRef,
        descriptor: ObjectRef,
        has: bool,
    },
    /// Logical negation.
    Negate(Box<BoolExpr>),
    /// A bare reference, true iff it resolves to a live object.
    Ref(ObjectRef),
}

impl std::fmt::Display for BoolExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Literal(b) => write!(f, "{b}"),
            Self::Descriptor {
                entity,
                descriptor,
                has,
            } => {
                let verb = if *has { "has" } else { "lacks" };
                write!(f, "{entity} {verb} {descriptor}")
            }
            Self::Negate(inner) => write!(f, "not ({inner})"),
            Self::Ref(r) => write!(f, "{r}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_display() {
        assert_eq!(format!("{}", BoolExpr::Literal(true)), "true");
    }

    #[test]
    fn descriptor_display() {
        let expr = BoolExpr::Descriptor {
            entity: ObjectRef::name("alice"),
            descriptor: ObjectRef::name("fined"),
            has: false,
        };
        assert_eq!(format!("{expr}"), "alice lacks fined");
    }

    #[test]
    fn negation_display() {
        let expr = BoolExpr::Negate(Box::new(BoolExpr::Ref(ObjectRef::name("d1"))));
        assert_eq!(format!("{expr}"), "not (d1)");
    }
}
