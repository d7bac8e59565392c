//! Cascade evaluator.
//!
//! The engine drives one external input at a time through a work
//! queue of pending events. Processing one event:
//!
//! 1. Resolve it into an [`Occurrence`].
//! 2. Enqueue the consequence of every matching power (load order).
//! 3. Enqueue the reaction of every matching reactive rule.
//! 4. Apply the event to the world.
//! 5. Run transformational rules to fixpoint.
//! 6. Check deontic triggers; retirements and violations take
//!    effect immediately.
//!
//! The cascade ends when the queue drains. A step budget bounds the
//! total number of dispatches; an error mid-event restores the world
//! to the state before that event was popped, then aborts the
//! cascade.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use dpcl_ast::{decode, Directive, Event, ObjectRef, PowerPosition, ProductionObject, Trigger};
use dpcl_types::{name, Span};
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::unify::{self, Occurrence, ProducedSubject};
use crate::world::{Bindings, Env, FrameDetail, Value, World};
use crate::{condition, loader};

/// One queued event, paired with the environment it fires in.
#[derive(Debug, Clone)]
struct Pending {
    event: Event,
    env: Env,
}

/// The DPCL engine: a world store plus the evaluator that drives it.
///
/// # Example
///
/// ```
/// use dpcl_engine::{Engine, EngineConfig};
/// use serde_json::json;
///
/// let mut engine = Engine::new(EngineConfig::default());
/// engine
///     .load_value(&json!([
///         {"atomics": ["alice", "student", "member"]},
///         {"entity": "alice", "descriptor": "student", "gains": true},
///         {
///             "position": "power",
///             "holder": "student",
///             "action": "#register",
///             "consequence": {"entity": "holder", "descriptor": "member", "gains": true}
///         }
///     ]))
///     .expect("program loads");
///
/// engine
///     .submit_value(&json!({"agent": "alice", "action": "#register"}))
///     .expect("request is processed");
///
/// let output = engine.show("alice").expect("alice exists");
/// assert!(output.contains("member"));
/// ```
#[derive(Debug, Clone)]
pub struct Engine {
    world: World,
    config: EngineConfig,
}

impl Engine {
    /// Creates an engine with an empty world.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            world: World::new(),
            config,
        }
    }

    /// Read access to the world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// The engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ─── loading ────────────────────────────────────────────────

    /// Loads a program file, replacing the current world on success.
    ///
    /// Imports are resolved against the file's own directory first,
    /// then the configured import directories.
    ///
    /// # Errors
    ///
    /// Io, schema or name errors from the loader, or any cascade
    /// error raised by load-time events. On error the previous world
    /// is kept untouched.
    pub fn load_file(&mut self, path: &Path) -> Result<(), EngineError> {
        let program = loader::read_program(path)?;
        let mut search: Vec<PathBuf> = Vec::new();
        if let Some(parent) = path.parent() {
            search.push(parent.to_path_buf());
        }
        search.extend(self.config.import_dirs.iter().cloned());
        self.install_program(program.directives, &search)
    }

    /// Loads a program from an already-parsed JSON value.
    pub fn load_value(&mut self, value: &serde_json::Value) -> Result<(), EngineError> {
        let program = decode::program(value)?;
        let search = self.config.import_dirs.clone();
        self.install_program(program.directives, &search)
    }

    fn install_program(
        &mut self,
        directives: Vec<Directive>,
        search: &[PathBuf],
    ) -> Result<(), EngineError> {
        let directives = loader::expand_imports(directives, search)?;
        loader::validate(&directives)?;

        // Build the new world on the side; the live one is replaced
        // only when installation and load-time events all succeed.
        let mut staged = Self::new(self.config.clone());
        let events = loader::install(&mut staged.world, &directives)?;
        for (event, env) in events {
            staged.run(event, env)?;
        }

        // Statically-true transformational rules take effect at load
        // even when the program fires no events.
        let mut steps = 0usize;
        staged.fixpoint(&mut steps)?;

        self.world = staged.world;
        debug!("program installed");
        Ok(())
    }

    // ─── input ──────────────────────────────────────────────────

    /// Feeds one external event and drains the cascade.
    pub fn submit(&mut self, event: Event) -> Result<(), EngineError> {
        self.run(event, Env::root())
    }

    /// Feeds one external event given as a JSON value.
    pub fn submit_value(&mut self, value: &serde_json::Value) -> Result<(), EngineError> {
        let event = decode::event(value, &Span::directive(0))?;
        self.submit(event)
    }

    /// Pretty-prints the object `target` names; see the query
    /// module.
    pub fn show(&self, target: &str) -> Result<String, EngineError> {
        crate::query::show(&self.world, target)
    }

    // ─── the cascade ────────────────────────────────────────────

    fn run(&mut self, event: Event, env: Env) -> Result<(), EngineError> {
        let mut queue = VecDeque::new();
        queue.push_back(Pending { event, env });
        self.cascade(&mut queue)
    }

    fn cascade(&mut self, queue: &mut VecDeque<Pending>) -> Result<(), EngineError> {
        let mut steps = 0usize;

        while let Some(pending) = queue.pop_front() {
            steps += 1;
            if steps > self.config.step_budget {
                return Err(EngineError::CascadeOverflow {
                    budget: self.config.step_budget,
                });
            }

            // One event is the rollback unit: on error the world
            // returns to the state before this pop.
            let checkpoint = self.world.clone();
            if let Err(e) = self.step(&pending, queue, &mut steps) {
                self.world = checkpoint;
                return Err(e);
            }
        }
        Ok(())
    }

    fn step(
        &mut self,
        pending: &Pending,
        queue: &mut VecDeque<Pending>,
        steps: &mut usize,
    ) -> Result<(), EngineError> {
        let occurrence = self.occurrence_of(pending)?;
        debug!(event = %pending.event, "dispatch");

        // No-op productions and namings do not propagate: re-adding
        // a live instance or re-asserting a held descriptor fires
        // nothing.
        let propagates = occurrence.changes_world(&self.world);

        if propagates {
            // Power consequences first, then reactive reactions,
            // both before application; matching order is load order.
            for id in self.world.frame_ids() {
                let Some(entry) = self.world.frame(id) else {
                    continue;
                };
                let FrameDetail::Power(power) = &entry.detail else {
                    continue;
                };
                if power.position != PowerPosition::Power {
                    continue;
                }
                if let Some(env) = unify::match_power(&self.world, &entry.env, power, &occurrence)
                {
                    debug!(frame = %id, "power matched");
                    queue.push_back(Pending {
                        event: (*power.consequence).clone(),
                        env,
                    });
                }
            }

            for id in self.world.frame_ids() {
                let Some(entry) = self.world.frame(id) else {
                    continue;
                };
                let FrameDetail::Reactive(rule) = &entry.detail else {
                    continue;
                };
                if let Some(env) =
                    unify::match_pattern(&self.world, &entry.env, &rule.event, &occurrence)
                {
                    debug!(frame = %id, "reactive rule fired");
                    queue.push_back(Pending {
                        event: (*rule.reaction).clone(),
                        env,
                    });
                }
            }
        }

        self.apply(pending, &occurrence, queue)?;
        self.fixpoint(steps)?;
        if propagates {
            self.check_deontic(&occurrence, queue);
        }
        Ok(())
    }

    // ─── occurrence resolution ──────────────────────────────────

    fn occurrence_of(&self, pending: &Pending) -> Result<Occurrence, EngineError> {
        let env = &pending.env;
        match &pending.event {
            Event::Atomic { tag } => {
                check_firable(tag)?;
                Ok(Occurrence::Action {
                    agent: None,
                    tag: tag.clone(),
                    args: Bindings::new(),
                })
            }
            Event::Refined {
                tag, refinement, ..
            } => {
                check_firable(tag)?;
                let args = self.world.resolve_refinement(refinement, env)?;
                Ok(Occurrence::Action {
                    agent: None,
                    tag: tag.clone(),
                    args,
                })
            }
            Event::Request { agent, action } => {
                let agent = self.world.resolve_value(agent, env)?;
                let (tag, args) = match action.as_ref() {
                    Event::Atomic { tag } => (tag.clone(), Bindings::new()),
                    Event::Refined {
                        tag, refinement, ..
                    } => (tag.clone(), self.world.resolve_refinement(refinement, env)?),
                    other => {
                        return Err(EngineError::runtime(format!(
                            "an action request needs an atomic or refined action, got `{other}`"
                        )))
                    }
                };
                check_firable(&tag)?;
                Ok(Occurrence::Action {
                    agent: Some(agent),
                    tag,
                    args,
                })
            }
            Event::Production { object, gains } => {
                let subject = self.production_subject(object, env, *gains)?;
                Ok(Occurrence::Produced {
                    subject,
                    gains: *gains,
                })
            }
            Event::Naming {
                entity,
                descriptor,
                gains,
            } => Ok(Occurrence::Named {
                entity: self.world.resolve_value(entity, env)?,
                descriptor: self.world.resolve_value(descriptor, env)?,
                gains: *gains,
            }),
        }
    }

    fn production_subject(
        &self,
        object: &ProductionObject,
        env: &Env,
        gains: bool,
    ) -> Result<ProducedSubject, EngineError> {
        let reference = match object {
            ProductionObject::Frame(_) => {
                if !gains {
                    return Err(EngineError::runtime(
                        "minus requires a reference, not a frame literal",
                    ));
                }
                return Ok(ProducedSubject::Literal);
            }
            ProductionObject::Ref(reference) => reference,
        };

        match reference {
            ObjectRef::Name(n) => {
                if n == name::SELF {
                    let id = env.instance.ok_or_else(|| {
                        EngineError::runtime("`self` used outside a compound instance")
                    })?;
                    return Ok(ProducedSubject::Instance(id));
                }
                if let Some(frame) = self.world.resolve_frame(n, env) {
                    return Ok(ProducedSubject::Frame(frame));
                }
                if let Some(template) = self.world.template(n) {
                    if template.params.is_empty() {
                        if let Some(existing) = self.world.find_instance(n, &Bindings::new()) {
                            return Ok(ProducedSubject::Instance(existing));
                        }
                        if gains {
                            return Ok(ProducedSubject::NewInstance {
                                template: n.clone(),
                                bindings: Bindings::new(),
                            });
                        }
                        return Err(EngineError::runtime(format!(
                            "minus of `{n}`: no live instance"
                        )));
                    }
                }
                match self.world.resolve_value(reference, env)? {
                    Value::Instance(id) => Ok(ProducedSubject::Instance(id)),
                    Value::Atomic(a) => Err(EngineError::runtime(format!(
                        "`{a}` is an atomic entity; production events need a frame or instance"
                    ))),
                }
            }
            ObjectRef::Refined {
                object: template,
                refinement,
                ..
            } => {
                let bindings = self.world.resolve_refinement(refinement, env)?;
                if let Some(existing) = self.world.find_instance(template, &bindings) {
                    return Ok(ProducedSubject::Instance(existing));
                }
                if gains {
                    if self.world.template(template).is_none() {
                        return Err(EngineError::name(format!(
                            "unknown template `{template}`"
                        )));
                    }
                    Ok(ProducedSubject::NewInstance {
                        template: template.clone(),
                        bindings,
                    })
                } else {
                    Err(EngineError::runtime(format!(
                        "minus of `{template}`: no matching live instance"
                    )))
                }
            }
            ObjectRef::Scoped { scope, name } => {
                let member = name.as_name().ok_or_else(|| {
                    EngineError::runtime("a scoped production subject needs a bare member name")
                })?;
                if let Some(alias) = scope.as_name() {
                    if let Some(frame) = self.world.resolve_frame(alias, env) {
                        return Ok(ProducedSubject::Marker {
                            frame,
                            member: member.to_string(),
                        });
                    }
                }
                Err(EngineError::runtime(format!(
                    "cannot resolve production subject `{scope}.{member}`"
                )))
            }
        }
    }

    // ─── application ────────────────────────────────────────────

    fn apply(
        &mut self,
        pending: &Pending,
        occurrence: &Occurrence,
        queue: &mut VecDeque<Pending>,
    ) -> Result<(), EngineError> {
        match occurrence {
            // Action requests have no direct side effect; they only
            // drive matching.
            Occurrence::Action { .. } => Ok(()),

            Occurrence::Named {
                entity,
                descriptor,
                gains,
            } => {
                if *gains {
                    self.world.assert_has(entity.clone(), descriptor.clone());
                } else {
                    self.world.retract_has(entity, descriptor);
                }
                Ok(())
            }

            Occurrence::Produced { subject, gains } => match subject {
                ProducedSubject::Literal => {
                    let Event::Production {
                        object: ProductionObject::Frame(literal),
                        ..
                    } = &pending.event
                    else {
                        return Err(EngineError::runtime(
                            "literal production without a frame literal",
                        ));
                    };
                    // The literal closes over the bindings of the
                    // consequence that produced it.
                    let env = Env {
                        instance: pending.env.instance,
                        holder: None,
                        bindings: pending.env.bindings.clone(),
                    };
                    self.world.add_frame((**literal).clone().into(), env)?;
                    Ok(())
                }
                ProducedSubject::NewInstance { template, bindings } => {
                    let mut events = Vec::new();
                    loader::instantiate(
                        &mut self.world,
                        template,
                        bindings.clone(),
                        pending.env.instance,
                        &mut events,
                    )?;
                    for (event, env) in events {
                        queue.push_back(Pending { event, env });
                    }
                    Ok(())
                }
                ProducedSubject::Instance(id) => {
                    if !gains {
                        self.world.destroy_instance(*id);
                    }
                    Ok(())
                }
                ProducedSubject::Frame(id) => {
                    if !gains {
                        self.world.remove_frame(*id);
                    }
                    Ok(())
                }
                // The violated flag was set when the trigger fired;
                // the marker event exists for rules to observe.
                ProducedSubject::Marker { .. } => Ok(()),
            },
        }
    }

    // ─── transformational fixpoint ──────────────────────────────

    fn fixpoint(&mut self, steps: &mut usize) -> Result<(), EngineError> {
        loop {
            let mut changed = false;

            for id in self.world.frame_ids() {
                let Some(entry) = self.world.frame(id) else {
                    continue;
                };
                let FrameDetail::Transformational(rule) = &entry.detail else {
                    continue;
                };
                let env = entry.env.clone();
                let rule = rule.clone();

                if !condition::eval(&self.world, &env, &rule.condition) {
                    continue;
                }

                let (entity_ref, descriptor_ref, target) = rule.conclusion.as_assertion();
                let entity = self.world.resolve_value(entity_ref, &env)?;
                let descriptor = self.world.resolve_value(descriptor_ref, &env)?;

                if self.world.has(&entity, &descriptor) != target {
                    *steps += 1;
                    if *steps > self.config.step_budget {
                        return Err(EngineError::CascadeOverflow {
                            budget: self.config.step_budget,
                        });
                    }
                    debug!(frame = %id, "transformational rule fired");
                    if target {
                        self.world.assert_has(entity, descriptor);
                    } else {
                        self.world.retract_has(&entity, &descriptor);
                    }
                    changed = true;
                }
            }

            if !changed {
                return Ok(());
            }
        }
    }

    // ─── deontic triggers ───────────────────────────────────────

    fn check_deontic(&mut self, occurrence: &Occurrence, queue: &mut VecDeque<Pending>) {
        for id in self.world.frame_ids() {
            let Some(entry) = self.world.frame(id) else {
                continue;
            };
            let FrameDetail::Deontic(state) = &entry.detail else {
                continue;
            };
            let env = entry.env.clone();
            let snapshot = state.clone();

            let fulfillment = self.trigger_result(
                snapshot.frame.fulfillment.as_ref(),
                &env,
                occurrence,
                snapshot.last_fulfillment,
            );
            let termination = self.trigger_result(
                snapshot.frame.termination.as_ref(),
                &env,
                occurrence,
                snapshot.last_termination,
            );

            // The first of fulfillment/termination retires the duty;
            // no further triggers are evaluated for it.
            if fulfillment.fired || termination.fired {
                debug!(frame = %id, "duty retired");
                self.world.remove_frame(id);
                continue;
            }

            let violation = self.trigger_result(
                snapshot.frame.violation.as_ref(),
                &env,
                occurrence,
                snapshot.last_violation,
            );
            let newly_violated = violation.fired && !snapshot.violated;

            if let Some(e) = self.world.frame_mut(id) {
                if let FrameDetail::Deontic(state) = &mut e.detail {
                    state.last_fulfillment = fulfillment.observed;
                    state.last_termination = termination.observed;
                    state.last_violation = violation.observed;
                    if newly_violated {
                        state.violated = true;
                    }
                }
            }

            if newly_violated {
                debug!(frame = %id, "violation");
                // Violation does not retire the frame; it surfaces
                // as a synthetic marker event that reactive rules
                // may observe, if the frame can be referenced.
                if let Some(alias) = snapshot.frame.alias {
                    queue.push_back(Pending {
                        event: Event::Production {
                            object: ProductionObject::Ref(ObjectRef::Scoped {
                                scope: Box::new(ObjectRef::Name(alias)),
                                name: Box::new(ObjectRef::name("violated")),
                            }),
                            gains: true,
                        },
                        env,
                    });
                }
            }
        }
    }

    fn trigger_result(
        &self,
        trigger: Option<&Trigger>,
        env: &Env,
        occurrence: &Occurrence,
        last: bool,
    ) -> TriggerResult {
        match trigger {
            None => TriggerResult {
                fired: false,
                observed: false,
            },
            Some(Trigger::Event(pattern)) => TriggerResult {
                fired: unify::match_pattern(&self.world, env, pattern, occurrence).is_some(),
                observed: false,
            },
            Some(Trigger::Condition(expr)) => {
                // Edge-triggered: fires on the false→true transition
                // of the post-fixpoint evaluation.
                let value = condition::eval(&self.world, env, expr);
                TriggerResult {
                    fired: value && !last,
                    observed: value,
                }
            }
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

/// Outcome of one trigger check.
struct TriggerResult {
    fired: bool,
    /// Post-fixpoint value of a boolean trigger (edge tracking);
    /// always `false` for event-shaped triggers.
    observed: bool,
}

fn check_firable(tag: &str) -> Result<(), EngineError> {
    if tag == name::WILDCARD_EVENT {
        return Err(EngineError::runtime(
            "the wildcard event `#*` cannot be fired",
        ));
    }
    Ok(())
}
