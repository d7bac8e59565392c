//! Frame and rule terms.
//!
//! Frames are the normative content of a program: powers enable
//! institutional actions, deontic frames track obligations, reactive
//! rules map events to transitions, and transformational rules assert
//! conclusions while their condition holds.

use serde::{Deserialize, Serialize};

use crate::boolean::BoolExpr;
use crate::event::Event;
use crate::term::ObjectRef;

/// Hohfeldian positions carried by a power frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerPosition {
    Power,
    Liability,
    Disability,
    Immunity,
}

impl PowerPosition {
    /// Parses a position keyword, returning `None` for non-power
    /// positions.
    #[must_use]
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "power" => Some(Self::Power),
            "liability" => Some(Self::Liability),
            "disability" => Some(Self::Disability),
            "immunity" => Some(Self::Immunity),
            _ => None,
        }
    }

    /// The position keyword as written in programs.
    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Power => "power",
            Self::Liability => "liability",
            Self::Disability => "disability",
            Self::Immunity => "immunity",
        }
    }
}

/// Hohfeldian positions carried by a deontic frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeonticPosition {
    Duty,
    Prohibition,
    Liberty,
    Claim,
    Protection,
    NoClaim,
}

impl DeonticPosition {
    /// Parses a position keyword, returning `None` for non-deontic
    /// positions.
    #[must_use]
    pub fn from_keyword(s: &str) -> Option<Self> {
        match s {
            "duty" => Some(Self::Duty),
            "prohibition" => Some(Self::Prohibition),
            "liberty" => Some(Self::Liberty),
            "claim" => Some(Self::Claim),
            "protection" => Some(Self::Protection),
            "no-claim" => Some(Self::NoClaim),
            _ => None,
        }
    }

    /// The position keyword as written in programs.
    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Duty => "duty",
            Self::Prohibition => "prohibition",
            Self::Liberty => "liberty",
            Self::Claim => "claim",
            Self::Protection => "protection",
            Self::NoClaim => "no-claim",
        }
    }
}

/// A power frame: when the holder performs the action, the
/// consequence fires.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PowerFrame {
    pub position: PowerPosition,
    /// Defaults to the wildcard `*` when the program omits it.
    pub holder: ObjectRef,
    /// An atomic, refined or wildcard event.
    pub action: Event,
    pub consequence: Box<Event>,
    pub alias: Option<String>,
}

impl std::fmt::Display for PowerFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {{holder: {}, action: {}, consequence: {}}}",
            self.position.keyword(),
            self.holder,
            self.action,
            self.consequence
        )
    }
}

/// A deontic trigger: fires on an event pattern, or when a boolean
/// expression becomes true.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Trigger {
    Event(Event),
    Condition(BoolExpr),
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Event(e) => write!(f, "{e}"),
            Self::Condition(c) => write!(f, "{c}"),
        }
    }
}

/// A deontic frame: an obligation binding the holder, with optional
/// violation/fulfillment/termination triggers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeonticFrame {
    pub position: DeonticPosition,
    pub holder: ObjectRef,
    pub counterparty: Option<ObjectRef>,
    pub action: Event,
    pub violation: Option<Trigger>,
    pub fulfillment: Option<Trigger>,
    pub termination: Option<Trigger>,
    pub alias: Option<String>,
}

impl std::fmt::Display for DeonticFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {{holder: {}, action: {}}}",
            self.position.keyword(),
            self.holder,
            self.action
        )
    }
}

/// A reactive rule: when the event pattern matches an observed
/// event, the reaction fires.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReactiveRule {
    pub event: Event,
    pub reaction: Box<Event>,
    pub alias: Option<String>,
}

impl std::fmt::Display for ReactiveRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} => {}", self.event, self.reaction)
    }
}

/// The conclusion asserted by a transformational rule.
///
/// Both shapes set `has(entity, descriptor)` to a flag; they differ
/// only in surface syntax (`gains` on naming events, `has` on
/// descriptor conditions).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Conclusion {
    Naming {
        entity: ObjectRef,
        descriptor: ObjectRef,
        gains: bool,
    },
    Holds {
        entity: ObjectRef,
        descriptor: ObjectRef,
        has: bool,
    },
}

impl Conclusion {
    /// Normalizes to `(entity, descriptor, target_state)`.
    #[must_use]
    pub fn as_assertion(&self) -> (&ObjectRef, &ObjectRef, bool) {
        match self {
            Self::Naming {
                entity,
                descriptor,
                gains,
            } => (entity, descriptor, *gains),
            Self::Holds {
                entity,
                descriptor,
                has,
            } => (entity, descriptor, *has),
        }
    }
}

impl std::fmt::Display for Conclusion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (entity, descriptor, state) = self.as_assertion();
        let verb = if state { "has" } else { "lacks" };
        write!(f, "{entity} {verb} {descriptor}")
    }
}

/// A transformational rule: while the condition is true, the
/// conclusion is asserted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransformationalRule {
    pub condition: BoolExpr,
    pub conclusion: Conclusion,
    pub alias: Option<String>,
}

impl std::fmt::Display for TransformationalRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.condition, self.conclusion)
    }
}

/// A frame literal: any of the four frame kinds, as it appears
/// inline in a `plus` event or in compound content.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FrameLiteral {
    Power(PowerFrame),
    Deontic(DeonticFrame),
    Reactive(ReactiveRule),
    Transformational(TransformationalRule),
}

impl FrameLiteral {
    /// Returns the frame's alias, if declared.
    #[must_use]
    pub fn alias(&self) -> Option<&str> {
        match self {
            Self::Power(p) => p.alias.as_deref(),
            Self::Deontic(d) => d.alias.as_deref(),
            Self::Reactive(r) => r.alias.as_deref(),
            Self::Transformational(t) => t.alias.as_deref(),
        }
    }
}

impl std::fmt::Display for FrameLiteral {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Power(p) => write!(f, "{p}"),
            Self::Deontic(d) => write!(f, "{d}"),
            Self::Reactive(r) => write!(f, "{r}"),
            Self::Transformational(t) => write!(f, "{t}"),
        }
    }
}
