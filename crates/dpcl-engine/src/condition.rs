//! Condition engine.
//!
//! Evaluates boolean expressions against the world. Evaluation is
//! total and pure: a reference that fails to resolve makes its
//! clause false, it never raises. Used by transformational-rule
//! conditions and state-shaped deontic triggers.

use dpcl_ast::BoolExpr;

use crate::world::{Env, World};

/// Evaluates `expr` in `env` against `world`.
///
/// A descriptor condition is true iff the entity resolves, the
/// descriptor resolves, and `has(entity, descriptor)` equals the
/// expected flag. A bare reference is true iff it resolves to a
/// live object.
#[must_use]
pub fn eval(world: &World, env: &Env, expr: &BoolExpr) -> bool {
    match expr {
        BoolExpr::Literal(b) => *b,
        BoolExpr::Descriptor {
            entity,
            descriptor,
            has,
        } => match (
            world.resolve_value(entity, env),
            world.resolve_value(descriptor, env),
        ) {
            (Ok(e), Ok(d)) => world.has(&e, &d) == *has,
            _ => false,
        },
        BoolExpr::Negate(inner) => !eval(world, env, inner),
        BoolExpr::Ref(reference) => world.resolves(reference, env),
    }
}
