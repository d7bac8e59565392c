//! Refinement unification.
//!
//! Matching is deterministic and soft: a pattern either matches an
//! occurrence (possibly binding parameter names) or it does not;
//! resolution failures inside a pattern mean "no match", never an
//! error. There is no backtracking; the only variables are bare
//! names on the pattern side that do not resolve to anything, plus
//! the wildcards `*` and `#*`.

use dpcl_ast::{Event, ObjectRef, PowerFrame, RefTerm};
use dpcl_types::{name, FrameId, InstanceId};

use crate::world::{Binding, Bindings, Env, Value, World};

/// A resolved event, as the matching passes see it.
///
/// Occurrences are built from a pending event *before* it is
/// applied, so production subjects describe what the event will
/// create or destroy rather than pointing at post-state.
#[derive(Debug, Clone)]
pub enum Occurrence {
    /// An action: an agent performing `tag` with resolved arguments,
    /// or an agent-less world event (`agent: None`).
    Action {
        agent: Option<Value>,
        tag: String,
        args: Bindings,
    },
    /// A production event.
    Produced { subject: ProducedSubject, gains: bool },
    /// A naming event with both operands resolved.
    Named {
        entity: Value,
        descriptor: Value,
        gains: bool,
    },
}

impl Occurrence {
    /// Whether applying this occurrence changes the world. No-op
    /// events (re-adding a live instance, re-asserting a held
    /// descriptor) do not propagate to rules or triggers.
    #[must_use]
    pub fn changes_world(&self, world: &World) -> bool {
        match self {
            Self::Action { .. } => true,
            Self::Produced { subject, gains } => match subject {
                ProducedSubject::NewInstance { .. } | ProducedSubject::Literal => *gains,
                ProducedSubject::Instance(_) | ProducedSubject::Frame(_) => !*gains,
                ProducedSubject::Marker { .. } => true,
            },
            Self::Named {
                entity,
                descriptor,
                gains,
            } => world.has(entity, descriptor) != *gains,
        }
    }
}

/// What a production event produces or destroys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProducedSubject {
    /// `plus` of a compound reference with no matching live
    /// instance: a fresh instance will be created.
    NewInstance { template: String, bindings: Bindings },
    /// A live instance (`minus` destroys it; `plus` is a no-op).
    Instance(InstanceId),
    /// A live frame (`minus` removes it; `plus` is a no-op).
    Frame(FrameId),
    /// A scoped marker such as a duty's `violated` flag.
    Marker { frame: FrameId, member: String },
    /// An inline frame literal; carries no matchable identity.
    Literal,
}

/// Attempts to unify an action occurrence with a power frame.
///
/// Per the matching rules:
///
/// 1. The frame's holder must equal the agent, or be a descriptor
///    the agent holds (`has(agent, holder)`), or be the wildcard.
/// 2. The action tags must be equal (or the pattern is `#*`), and
///    every pattern refinement key must either resolve to a value
///    equal to the request's argument, or be a parameter name, which
///    is then bound to the argument.
///
/// Returns the environment the consequence should be instantiated
/// under: the frame owner's scope, `holder` bound to the agent, and
/// the accumulated parameter bindings.
#[must_use]
pub fn match_power(
    world: &World,
    frame_env: &Env,
    power: &PowerFrame,
    occurrence: &Occurrence,
) -> Option<Env> {
    let Occurrence::Action {
        agent: Some(agent),
        tag,
        args,
    } = occurrence
    else {
        return None;
    };

    // Start from the frame's captured bindings so that a frame added
    // as a literal mid-cascade keeps resolving the names it closed
    // over.
    let mut bindings = frame_env.bindings.clone();
    if !unify_action(world, frame_env, &mut bindings, &power.action, tag, args, true) {
        return None;
    }
    if !holder_matches(world, frame_env, &power.holder, agent) {
        return None;
    }

    Some(Env {
        instance: frame_env.instance,
        holder: Some(agent.clone()),
        bindings,
    })
}

/// Attempts to match an event pattern (a reactive rule's `event`, or
/// an event-shaped deontic trigger) against an occurrence.
///
/// Uses the same refinement discipline as power matching, extended
/// to production and naming events by structural comparison. The
/// `#*` wildcard does not participate here; it is power-action
/// only.
#[must_use]
pub fn match_pattern(
    world: &World,
    frame_env: &Env,
    pattern: &Event,
    occurrence: &Occurrence,
) -> Option<Env> {
    let mut bindings = frame_env.bindings.clone();
    let mut holder = None;

    let matched = match (pattern, occurrence) {
        (Event::Atomic { .. } | Event::Refined { .. }, Occurrence::Action { agent, tag, args }) => {
            holder.clone_from(agent);
            unify_action(world, frame_env, &mut bindings, pattern, tag, args, false)
        }
        (
            Event::Request { agent, action },
            Occurrence::Action {
                agent: Some(actual),
                tag,
                args,
            },
        ) => {
            holder = Some(actual.clone());
            unify_operand(world, frame_env, &mut bindings, agent, actual)
                && unify_action(world, frame_env, &mut bindings, action, tag, args, false)
        }
        (
            Event::Production { object, gains },
            Occurrence::Produced {
                subject,
                gains: actual_gains,
            },
        ) => gains == actual_gains && production_matches(world, frame_env, object, subject),
        (
            Event::Naming {
                entity,
                descriptor,
                gains,
            },
            Occurrence::Named {
                entity: actual_entity,
                descriptor: actual_descriptor,
                gains: actual_gains,
            },
        ) => {
            gains == actual_gains
                && unify_operand(world, frame_env, &mut bindings, entity, actual_entity)
                && unify_operand(
                    world,
                    frame_env,
                    &mut bindings,
                    descriptor,
                    actual_descriptor,
                )
        }
        _ => false,
    };

    if !matched {
        return None;
    }

    Some(Env {
        instance: frame_env.instance,
        holder,
        bindings,
    })
}

/// Unifies an action pattern (atomic or refined) against a resolved
/// action. `allow_wildcard` enables `#*`, which only power actions
/// may use.
fn unify_action(
    world: &World,
    env: &Env,
    bindings: &mut Bindings,
    pattern: &Event,
    tag: &str,
    args: &Bindings,
    allow_wildcard: bool,
) -> bool {
    match pattern {
        Event::Atomic { tag: expected } => {
            (allow_wildcard && expected == name::WILDCARD_EVENT) || expected == tag
        }
        Event::Refined {
            tag: expected,
            refinement,
            ..
        } => {
            if expected != tag {
                return false;
            }
            refinement.iter().all(|(key, term)| {
                let Some(actual) = args.get(key) else {
                    return false;
                };
                unify_term(world, env, bindings, key, term, actual)
            })
        }
        _ => false,
    }
}

/// Unifies one refinement term against a resolved argument.
fn unify_term(
    world: &World,
    env: &Env,
    bindings: &mut Bindings,
    key: &str,
    term: &RefTerm,
    actual: &Binding,
) -> bool {
    match term {
        RefTerm::Object(reference) => match actual {
            Binding::Value(value) => {
                if reference.is_wildcard() {
                    // `{target: *}` binds the key itself.
                    return record(bindings, key, value);
                }
                unify_operand(world, env, bindings, reference, value)
            }
            Binding::Event(_) => false,
        },
        // Event-valued terms compare structurally.
        RefTerm::Event(event) => matches!(actual, Binding::Event(e) if e == event),
    }
}

/// Unifies an object-reference pattern operand against a value.
///
/// A bare name that resolves must equal the value; a bare name that
/// does not resolve is a parameter and binds to it; the wildcard
/// matches anything.
fn unify_operand(
    world: &World,
    env: &Env,
    bindings: &mut Bindings,
    reference: &ObjectRef,
    actual: &Value,
) -> bool {
    if reference.is_wildcard() {
        return true;
    }

    let lookup_env = Env {
        instance: env.instance,
        holder: env.holder.clone(),
        bindings: bindings.clone(),
    };

    match world.resolve_value(reference, &lookup_env) {
        Ok(value) => value == *actual,
        Err(_) => match reference.as_name() {
            // An unresolvable bare name is a parameter: bind it.
            Some(param) if !name::is_reserved(param) => record(bindings, param, actual),
            _ => false,
        },
    }
}

/// Records a binding, failing on a contradictory rebind.
fn record(bindings: &mut Bindings, key: &str, value: &Value) -> bool {
    match bindings.get(key) {
        Some(Binding::Value(existing)) => existing == value,
        Some(Binding::Event(_)) => false,
        None => {
            bindings.insert(key.to_string(), Binding::Value(value.clone()));
            true
        }
    }
}

/// Holder check: wildcard, identity, or descriptor-holding.
fn holder_matches(world: &World, env: &Env, holder: &ObjectRef, agent: &Value) -> bool {
    if holder.is_wildcard() {
        return true;
    }
    match world.resolve_value(holder, env) {
        Ok(value) => value == *agent || world.has(agent, &value),
        Err(_) => false,
    }
}

/// Structural match of a production pattern against a produced
/// subject.
fn production_matches(
    world: &World,
    env: &Env,
    object: &dpcl_ast::ProductionObject,
    subject: &ProducedSubject,
) -> bool {
    let dpcl_ast::ProductionObject::Ref(reference) = object else {
        // A literal pattern has no identity to compare.
        return false;
    };

    match (reference, subject) {
        (
            ObjectRef::Refined {
                object: expected,
                refinement,
                ..
            },
            ProducedSubject::NewInstance { template, bindings },
        ) => {
            expected == template
                && world
                    .resolve_refinement(refinement, env)
                    .is_ok_and(|b| b == *bindings)
        }
        (
            ObjectRef::Refined {
                object: expected,
                refinement,
                ..
            },
            ProducedSubject::Instance(id),
        ) => {
            let Ok(expected_bindings) = world.resolve_refinement(refinement, env) else {
                return false;
            };
            world
                .instance(*id)
                .is_some_and(|i| i.template == *expected && i.bindings == expected_bindings)
        }
        (ObjectRef::Name(alias), ProducedSubject::Frame(id)) => {
            world.resolve_frame(alias, env) == Some(*id)
        }
        (ObjectRef::Name(n), ProducedSubject::Instance(id)) => world
            .resolve_value(&ObjectRef::name(n.clone()), env)
            .is_ok_and(|v| v == Value::Instance(*id)),
        (ObjectRef::Scoped { scope, name }, ProducedSubject::Marker { frame, member }) => {
            scope
                .as_name()
                .is_some_and(|alias| world.resolve_frame(alias, env) == Some(*frame))
                && name.as_name() == Some(member.as_str())
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dpcl_ast::{Event, PowerPosition, Refinement};

    fn simple_power(holder: &str, action: Event) -> PowerFrame {
        PowerFrame {
            position: PowerPosition::Power,
            holder: ObjectRef::name(holder),
            action,
            consequence: Box::new(Event::atomic("#done")),
            alias: None,
        }
    }

    fn action_occurrence(agent: &str, tag: &str, args: Bindings) -> Occurrence {
        Occurrence::Action {
            agent: Some(Value::atomic(agent)),
            tag: tag.into(),
            args,
        }
    }

    fn arg(key: &str, value: &str) -> Bindings {
        [(key.to_string(), Binding::Value(Value::atomic(value)))]
            .into_iter()
            .collect()
    }

    fn refined(tag: &str, key: &str, value: &str) -> Event {
        let refinement: Refinement = [(
            key.to_string(),
            RefTerm::Object(ObjectRef::name(value)),
        )]
        .into_iter()
        .collect();
        Event::Refined {
            tag: tag.into(),
            refinement,
            alias: None,
        }
    }

    fn world_with(atomics: &[&str]) -> World {
        let mut world = World::new();
        for a in atomics {
            world.declare_atomic(*a);
        }
        world
    }

    #[test]
    fn atomic_action_tags_must_match() {
        let world = world_with(&["alice"]);
        let power = simple_power("*", Event::atomic("#register"));

        let hit = action_occurrence("alice", "#register", Bindings::new());
        let miss = action_occurrence("alice", "#borrow", Bindings::new());

        assert!(match_power(&world, &Env::root(), &power, &hit).is_some());
        assert!(match_power(&world, &Env::root(), &power, &miss).is_none());
    }

    #[test]
    fn wildcard_action_matches_any_tag() {
        let world = world_with(&["alice"]);
        let power = simple_power("*", Event::atomic("#*"));
        let occ = action_occurrence("alice", "#anything", Bindings::new());
        assert!(match_power(&world, &Env::root(), &power, &occ).is_some());
    }

    #[test]
    fn holder_identity_match() {
        let world = world_with(&["alice", "bob"]);
        let power = simple_power("alice", Event::atomic("#x"));

        assert!(match_power(
            &world,
            &Env::root(),
            &power,
            &action_occurrence("alice", "#x", Bindings::new())
        )
        .is_some());
        assert!(match_power(
            &world,
            &Env::root(),
            &power,
            &action_occurrence("bob", "#x", Bindings::new())
        )
        .is_none());
    }

    #[test]
    fn holder_descriptor_match_requires_has() {
        let mut world = world_with(&["alice", "student"]);
        let power = simple_power("student", Event::atomic("#register"));
        let occ = action_occurrence("alice", "#register", Bindings::new());

        assert!(match_power(&world, &Env::root(), &power, &occ).is_none());

        world.assert_has(Value::atomic("alice"), Value::atomic("student"));
        let env = match_power(&world, &Env::root(), &power, &occ).expect("descriptor holder matches");
        assert_eq!(env.holder, Some(Value::atomic("alice")));
    }

    #[test]
    fn refined_action_binds_parameter() {
        let world = world_with(&["alice", "dracula"]);
        // `item` resolves to nothing, so it is a parameter.
        let power = simple_power("*", refined("#borrow", "item", "item"));
        let occ = action_occurrence("alice", "#borrow", arg("item", "dracula"));

        let env = match_power(&world, &Env::root(), &power, &occ).expect("parameter binds");
        assert_eq!(
            env.bindings.get("item"),
            Some(&Binding::Value(Value::atomic("dracula")))
        );
    }

    #[test]
    fn refined_action_checks_concrete_value() {
        let world = world_with(&["alice", "dracula", "carmilla"]);
        // `dracula` resolves, so the argument must equal it.
        let power = simple_power("*", refined("#borrow", "item", "dracula"));

        assert!(match_power(
            &world,
            &Env::root(),
            &power,
            &action_occurrence("alice", "#borrow", arg("item", "dracula"))
        )
        .is_some());
        assert!(match_power(
            &world,
            &Env::root(),
            &power,
            &action_occurrence("alice", "#borrow", arg("item", "carmilla"))
        )
        .is_none());
    }

    #[test]
    fn wildcard_refinement_binds_under_key() {
        let world = world_with(&["library", "alice"]);
        let power = simple_power("library", refined("#fine", "target", "*"));
        let occ = action_occurrence("library", "#fine", arg("target", "alice"));

        let env = match_power(&world, &Env::root(), &power, &occ).expect("wildcard binds key");
        assert_eq!(
            env.bindings.get("target"),
            Some(&Binding::Value(Value::atomic("alice")))
        );
    }

    #[test]
    fn missing_argument_fails() {
        let world = world_with(&["alice"]);
        let power = simple_power("*", refined("#borrow", "item", "item"));
        let occ = action_occurrence("alice", "#borrow", Bindings::new());
        assert!(match_power(&world, &Env::root(), &power, &occ).is_none());
    }

    #[test]
    fn agentless_events_do_not_enable_powers() {
        let world = world_with(&[]);
        let power = simple_power("*", Event::atomic("#timeout"));
        let occ = Occurrence::Action {
            agent: None,
            tag: "#timeout".into(),
            args: Bindings::new(),
        };
        assert!(match_power(&world, &Env::root(), &power, &occ).is_none());
    }

    #[test]
    fn pattern_wildcard_event_not_honored() {
        let world = world_with(&[]);
        let occ = Occurrence::Action {
            agent: None,
            tag: "#timeout".into(),
            args: Bindings::new(),
        };
        // `#*` is power-action only; as a reactive pattern it only
        // matches the literal `#*` tag, which cannot be fired.
        assert!(match_pattern(&world, &Env::root(), &Event::atomic("#*"), &occ).is_none());
        assert!(match_pattern(&world, &Env::root(), &Event::atomic("#timeout"), &occ).is_some());
    }

    #[test]
    fn naming_pattern_with_wildcard_entity() {
        let world = world_with(&["alice", "member"]);
        let pattern = Event::Naming {
            entity: ObjectRef::name("*"),
            descriptor: ObjectRef::name("member"),
            gains: true,
        };
        let hit = Occurrence::Named {
            entity: Value::atomic("alice"),
            descriptor: Value::atomic("member"),
            gains: true,
        };
        let wrong_polarity = Occurrence::Named {
            entity: Value::atomic("alice"),
            descriptor: Value::atomic("member"),
            gains: false,
        };
        assert!(match_pattern(&world, &Env::root(), &pattern, &hit).is_some());
        assert!(match_pattern(&world, &Env::root(), &pattern, &wrong_polarity).is_none());
    }

    #[test]
    fn no_op_naming_does_not_change_world() {
        let mut world = world_with(&["alice", "member"]);
        world.assert_has(Value::atomic("alice"), Value::atomic("member"));

        let redundant = Occurrence::Named {
            entity: Value::atomic("alice"),
            descriptor: Value::atomic("member"),
            gains: true,
        };
        let retraction = Occurrence::Named {
            entity: Value::atomic("alice"),
            descriptor: Value::atomic("member"),
            gains: false,
        };
        assert!(!redundant.changes_world(&world));
        assert!(retraction.changes_world(&world));
    }
}
