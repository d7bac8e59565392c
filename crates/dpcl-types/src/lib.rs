//! Core types for the DPCL interpreter.
//!
//! This crate provides the foundational identifier and error types
//! shared by every layer of the interpreter.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                      SDK Layer                          │
//! ├─────────────────────────────────────────────────────────┤
//! │  dpcl-types  : ids, reserved names, ErrorCode  ◄── HERE │
//! │  dpcl-ast    : terms, events, directives, decoding      │
//! └─────────────────────────────────────────────────────────┘
//!                            ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │                    Runtime Layer                        │
//! ├─────────────────────────────────────────────────────────┤
//! │  dpcl-engine : loader, world store, unifier, evaluator  │
//! └─────────────────────────────────────────────────────────┘
//!                            ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │                    Frontend Layer                       │
//! ├─────────────────────────────────────────────────────────┤
//! │  dpcl-cli    : interactive shell                        │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! # Identifier Design
//!
//! All identifiers are deterministic arena indices:
//!
//! - **Replayable**: the same program and input stream mint the same
//!   ids every run, so tests can compare whole worlds
//! - **Orderable**: frame ids double as load order, which the
//!   evaluator's matching pass follows
//! - **Cheap**: `Copy` integers, no allocation
//!
//! # Example
//!
//! ```
//! use dpcl_types::{FrameId, InstanceId, name};
//!
//! let frame = FrameId::new(0);
//! let instance = InstanceId::new(0);
//! assert_eq!(format!("{frame}"), "frame:0");
//! assert_eq!(format!("{instance}"), "inst:0");
//!
//! assert!(name::is_reserved("self"));
//! assert!(name::is_valid_event_tag("#borrow"));
//! ```

mod error;
mod id;
pub mod name;
mod span;

pub use error::{assert_error_code, assert_error_codes, ErrorCode};
pub use id::{FrameId, InstanceId};
pub use span::Span;
