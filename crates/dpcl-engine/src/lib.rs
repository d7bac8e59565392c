//! Runtime layer of the DPCL interpreter.
//!
//! This crate turns decoded programs into a live institutional world
//! and drives it forward, one external input at a time.
//!
//! # Components
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`loader`] | import expansion, static validation, installation |
//! | [`world`] | atomics, descriptor relation, instances, frames |
//! | [`unify`] | matching action requests and event patterns |
//! | [`Engine`] | the cascade: queue, fixpoint, deontic triggers |
//! | [`condition`] | boolean expressions over the world |
//! | [`query`] | `show` pretty-printing |
//!
//! # Evaluation Model
//!
//! ```text
//!              ┌────────────────────────────────────────┐
//!   input ───► │  work queue                            │
//!              │    pop event                           │
//!              │      ├─ match powers      ─► enqueue   │
//!              │      ├─ match reactive    ─► enqueue   │
//!              │      ├─ apply to world                 │
//!              │      ├─ transformational fixpoint      │
//!              │      └─ deontic triggers               │
//!              │    … until empty (or budget exceeded)  │
//!              └────────────────────────────────────────┘
//! ```
//!
//! Single-threaded, synchronous, deterministic: the world store is
//! one owned value threaded through the evaluator, every collection
//! is ordered, and matching order is frame load order.
//!
//! # Example
//!
//! ```
//! use dpcl_engine::{Engine, EngineConfig};
//! use serde_json::json;
//!
//! let mut engine = Engine::new(EngineConfig::default().with_step_budget(1000));
//! engine
//!     .load_value(&json!([
//!         {"atomics": ["alice", "student", "member"]},
//!         {"entity": "alice", "descriptor": "student", "gains": true},
//!         {
//!             "position": "power",
//!             "holder": "student",
//!             "action": "#register",
//!             "consequence": {"entity": "holder", "descriptor": "member", "gains": true}
//!         }
//!     ]))
//!     .expect("program loads");
//!
//! engine
//!     .submit_value(&json!({"agent": "alice", "action": "#register"}))
//!     .expect("cascade drains");
//! assert!(engine.show("alice").expect("alice exists").contains("member"));
//! ```

pub mod condition;
mod config;
mod error;
mod eval;
pub mod loader;
pub mod query;
pub mod unify;
pub mod world;

pub use config::{EngineConfig, DEFAULT_STEP_BUDGET};
pub use error::EngineError;
pub use eval::Engine;
pub use world::{Binding, Bindings, Env, Value, World};
