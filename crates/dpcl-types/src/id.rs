//! Identifier types for DPCL.
//!
//! All identifiers are arena indices allocated by the world store.
//! They are plain integers, never random: for a fixed program and a
//! fixed input sequence, every frame and instance receives the same
//! id on every replay, which is what makes whole-world comparisons in
//! tests meaningful.

use serde::{Deserialize, Serialize};

/// Identifier for a live compound-frame instance.
///
/// Instances form a tree: each instance is owned either by the root
/// program or by the `plus` event of another instance. The id is an
/// index into the world's instance arena; destruction removes the
/// entry but never reuses the index within a session.
///
/// # Example
///
/// ```
/// use dpcl_types::InstanceId;
///
/// let a = InstanceId::new(0);
/// let b = InstanceId::new(1);
/// assert_ne!(a, b);
/// assert_eq!(a.raw(), 0);
/// assert_eq!(format!("{a}"), "inst:0");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct InstanceId(u64);

impl InstanceId {
    /// Wraps a raw arena index.
    ///
    /// Only the world store should mint fresh ids; everything else
    /// receives them from lookups.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw arena index.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "inst:{}", self.0)
    }
}

// NOTE: InstanceId intentionally does NOT implement Default.
// A default id would not be registered in the world store; use
// World::create_instance() to obtain one.

/// Identifier for a live frame (power, deontic, reactive or
/// transformational).
///
/// Frame ids are allocated in load/creation order, and the world
/// iterates frames in id order. That ordering is the load order the
/// evaluator's matching pass follows, so it must be stable and
/// reproducible.
///
/// # Example
///
/// ```
/// use dpcl_types::FrameId;
///
/// let f = FrameId::new(7);
/// assert_eq!(format!("{f}"), "frame:7");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct FrameId(u64);

impl FrameId {
    /// Wraps a raw arena index.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw arena index.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for FrameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "frame:{}", self.0)
    }
}

// NOTE: FrameId intentionally does NOT implement Default either; see
// InstanceId above.

// Tests are in lib.rs as integration tests for the public API.
