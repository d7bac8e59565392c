//! Event terms.
//!
//! Events are what the evaluator's work queue carries: atomic world
//! events, refined events, agent-scoped action requests, production
//! events (frame/instance creation and destruction), and naming
//! events (descriptor gain/loss).

use serde::{Deserialize, Serialize};

use crate::frame::FrameLiteral;
use crate::term::{write_refinement, ObjectRef, Refinement};

/// An event term.
///
/// # Example
///
/// ```
/// use dpcl_ast::{Event, ObjectRef};
///
/// let timeout = Event::atomic("#timeout");
/// assert_eq!(format!("{timeout}"), "#timeout");
///
/// let request = Event::Request {
///     agent: ObjectRef::name("alice"),
///     action: Box::new(Event::atomic("#register")),
/// };
/// assert_eq!(format!("{request}"), "alice.#register");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Event {
    /// An atomic event, e.g. `#timeout`. The tag keeps its `#` prefix.
    Atomic { tag: String },
    /// A refined event, e.g. `#borrow{item: dracula}`.
    Refined {
        tag: String,
        refinement: Refinement,
        alias: Option<String>,
    },
    /// An action request from outside: an agent performing an action.
    Request {
        agent: ObjectRef,
        action: Box<Event>,
    },
    /// A production event: `plus` creates, `minus` destroys.
    Production { object: ProductionObject, gains: bool },
    /// A naming event: an entity gains or loses a descriptor.
    Naming {
        entity: ObjectRef,
        descriptor: ObjectRef,
        gains: bool,
    },
}

impl Event {
    /// Builds an atomic event from a `#`-prefixed tag.
    #[must_use]
    pub fn atomic(tag: impl Into<String>) -> Self {
        Self::Atomic { tag: tag.into() }
    }

    /// Returns the event tag for atomic and refined events.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::Atomic { tag } | Self::Refined { tag, .. } => Some(tag),
            _ => None,
        }
    }

    /// Returns `true` if this is the event wildcard `#*`.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Atomic { tag } if tag == dpcl_types::name::WILDCARD_EVENT)
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Atomic { tag } => write!(f, "{tag}"),
            Self::Refined {
                tag, refinement, ..
            } => {
                write!(f, "{tag}")?;
                write_refinement(f, refinement)
            }
            Self::Request { agent, action } => write!(f, "{agent}.{action}"),
            Self::Production { object, gains } => {
                write!(f, "{}{object}", if *gains { '+' } else { '-' })
            }
            Self::Naming {
                entity,
                descriptor,
                gains,
            } => {
                let verb = if *gains { "gains" } else { "loses" };
                write!(f, "{entity} {verb} {descriptor}")
            }
        }
    }
}

/// The operand of a production event.
///
/// `plus` may carry either a reference (to a compound template, a
/// live frame or `self`) or an inline frame literal that is added to
/// the world when the event applies.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProductionObject {
    /// A reference to resolve at apply time.
    Ref(ObjectRef),
    /// An inline frame literal.
    Frame(Box<FrameLiteral>),
}

impl std::fmt::Display for ProductionObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ref(r) => write!(f, "{r}"),
            Self::Frame(frame) => write!(f, "{frame}"),
        }
    }
}
