//! Term model for DPCL programs.
//!
//! This crate defines the normalized AST the loader and evaluator
//! work against, together with the structural JSON decoder that
//! produces it.
//!
//! # Term Families
//!
//! | Family | Variants |
//! |--------|----------|
//! | [`ObjectRef`] | bare name, refined, scoped |
//! | [`Event`] | atomic, refined, request, production, naming |
//! | [`BoolExpr`] | literal, descriptor condition, negation, reference |
//! | [`FrameLiteral`] | power, deontic, reactive, transformational |
//! | [`DirectiveKind`] | atomics, frames, templates, rules, import, event |
//!
//! Every family is a closed tagged enum; the engine matches
//! exhaustively, never by field absence.
//!
//! # Immutability
//!
//! The AST is immutable after decoding. The evaluator never rewrites
//! terms; it pairs them with environments instead.
//!
//! # Example
//!
//! ```
//! use dpcl_ast::{decode, DirectiveKind};
//! use serde_json::json;
//!
//! let program = decode::program(&json!([
//!     {"atomics": ["alice", "student"]},
//!     {
//!         "position": "power",
//!         "holder": "student",
//!         "action": "#register",
//!         "consequence": {"entity": "holder", "descriptor": "member", "gains": true}
//!     }
//! ]))
//! .expect("well-formed program");
//!
//! assert_eq!(program.directives.len(), 2);
//! assert!(matches!(program.directives[1].kind, DirectiveKind::Power(_)));
//! ```

mod boolean;
pub mod decode;
mod directive;
mod error;
mod event;
mod frame;
mod term;

pub use boolean::BoolExpr;
pub use directive::{CompoundTemplate, Directive, DirectiveKind, ObjectDecl, Program};
pub use error::ParseError;
pub use event::{Event, ProductionObject};
pub use frame::{
    Conclusion, DeonticFrame, DeonticPosition, FrameLiteral, PowerFrame, PowerPosition,
    ReactiveRule, TransformationalRule, Trigger,
};
pub use term::{ObjectRef, RefTerm, Refinement};
