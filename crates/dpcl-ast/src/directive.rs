//! Program directives.
//!
//! A program is a JSON array of directives; each directive either
//! declares something (atomics, frames, templates, rules), pulls in
//! another file (`import`), or fires an event at load time.

use dpcl_types::Span;
use serde::{Deserialize, Serialize};

use crate::event::Event;
use crate::frame::{DeonticFrame, PowerFrame, ReactiveRule, TransformationalRule};
use crate::term::ObjectRef;

/// A compound-frame template.
///
/// Templates are not executed at load time; the evaluator
/// instantiates them on demand when a `plus` event references them,
/// binding `params` to the refinement arguments and executing
/// `content` in the fresh instance scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompoundTemplate {
    pub name: String,
    pub params: Vec<String>,
    pub content: Vec<Directive>,
    /// Descriptors every instance gains on creation.
    pub initial_descriptors: Vec<ObjectRef>,
}

/// A statically declared object: a compound without parameters,
/// instantiated once at load and owned by the root program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectDecl {
    pub name: String,
    pub content: Vec<Directive>,
    pub initial_descriptors: Vec<ObjectRef>,
}

/// One directive with its source span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directive {
    pub kind: DirectiveKind,
    pub span: Span,
}

/// The closed set of directive kinds.
///
/// Every new directive kind is a new variant here; the loader and
/// evaluator match exhaustively, so forgetting a case is a compile
/// error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirectiveKind {
    /// `{"atomics": [..]}`: declares atomic entities.
    Atomics(Vec<String>),
    /// A top-level power frame.
    Power(PowerFrame),
    /// A top-level deontic frame.
    Deontic(DeonticFrame),
    /// A compound template (`object` + `params`).
    Compound(CompoundTemplate),
    /// A static object (`object` without `params`).
    Object(ObjectDecl),
    /// A reactive rule.
    Reactive(ReactiveRule),
    /// A transformational rule.
    Transformational(TransformationalRule),
    /// `{"import": name}`: textual inclusion of another file.
    Import { name: String, alias: Option<String> },
    /// A bare event, fired at load time.
    Occur(Event),
}

impl DirectiveKind {
    /// The alias declared by this directive, if any.
    #[must_use]
    pub fn alias(&self) -> Option<&str> {
        match self {
            Self::Power(p) => p.alias.as_deref(),
            Self::Deontic(d) => d.alias.as_deref(),
            Self::Reactive(r) => r.alias.as_deref(),
            Self::Transformational(t) => t.alias.as_deref(),
            Self::Import { alias, .. } => alias.as_deref(),
            _ => None,
        }
    }
}

/// A parsed program: the normalized directive list.
///
/// The AST is immutable after decoding; the loader reads it, the
/// world store copies what it needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub directives: Vec<Directive>,
}

impl Program {
    /// An empty program.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            directives: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_alias_lookup() {
        let kind = DirectiveKind::Reactive(ReactiveRule {
            event: Event::atomic("#a"),
            reaction: Box::new(Event::atomic("#b")),
            alias: Some("r1".into()),
        });
        assert_eq!(kind.alias(), Some("r1"));

        let kind = DirectiveKind::Atomics(vec!["alice".into()]);
        assert_eq!(kind.alias(), None);
    }

    #[test]
    fn empty_program() {
        assert!(Program::empty().directives.is_empty());
    }
}
