//! World store.
//!
//! The single mutable object of the interpreter: declared atomics,
//! the descriptor relation, live compound instances and live frames.
//! The evaluator owns a `World` exclusively for the duration of a
//! cascade; everything else reads it.
//!
//! # Determinism
//!
//! Every collection here is ordered (`BTreeMap`/`BTreeSet`/`Vec`),
//! ids are monotonic counters, and frame iteration order is id order,
//! which is creation order, which is load order. Replaying the
//! same input stream yields an identical world.

use std::collections::{BTreeMap, BTreeSet};

use dpcl_ast::{
    CompoundTemplate, DeonticFrame, Event, ObjectRef, PowerFrame, ReactiveRule,
    TransformationalRule,
};
use dpcl_types::{name, FrameId, InstanceId};
use tracing::debug;

use crate::error::EngineError;

/// A resolved object: an atomic entity or a live instance.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Value {
    Atomic(String),
    Instance(InstanceId),
}

impl Value {
    /// Builds an atomic value.
    #[must_use]
    pub fn atomic(name: impl Into<String>) -> Self {
        Self::Atomic(name.into())
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Atomic(n) => write!(f, "{n}"),
            Self::Instance(id) => write!(f, "{id}"),
        }
    }
}

/// A value bound to a parameter: an object or an event.
///
/// Event bindings cannot be used where an object is required; the
/// resolver reports a runtime error if a program tries.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Binding {
    Value(Value),
    Event(Event),
}

impl std::fmt::Display for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{v}"),
            Self::Event(e) => write!(f, "{e}"),
        }
    }
}

/// Parameter bindings of an instance, keyed by parameter name.
pub type Bindings = BTreeMap<String, Binding>;

/// The environment a term is resolved in: the enclosing instance
/// (binding `self` and, through its parent, `super`), the frame
/// holder (binding `holder`), and any unification bindings.
#[derive(Debug, Clone, Default)]
pub struct Env {
    pub instance: Option<InstanceId>,
    pub holder: Option<Value>,
    pub bindings: Bindings,
}

impl Env {
    /// The root environment: nothing bound.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// An environment inside `instance`, with nothing else bound.
    #[must_use]
    pub fn in_instance(instance: InstanceId) -> Self {
        Self {
            instance: Some(instance),
            ..Self::default()
        }
    }
}

/// Names visible in one scope: owned frames in creation order, frame
/// aliases, and named child objects.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    pub frames: Vec<FrameId>,
    pub aliases: BTreeMap<String, FrameId>,
    pub children: BTreeMap<String, InstanceId>,
}

/// A live instance of a compound template (or of a static object
/// declaration, which is a template without parameters).
#[derive(Debug, Clone)]
pub struct Instance {
    pub id: InstanceId,
    /// Template name this instance was created from.
    pub template: String,
    /// Global name, for statically declared objects.
    pub name: Option<String>,
    pub bindings: Bindings,
    /// Owning instance; `None` for instances owned by the root
    /// program.
    pub parent: Option<InstanceId>,
    /// Owned child instances, in creation order.
    pub owned: Vec<InstanceId>,
    pub scope: Scope,
}

/// Runtime state of a deontic frame: the AST plus trigger
/// bookkeeping.
#[derive(Debug, Clone)]
pub struct DeonticState {
    pub frame: DeonticFrame,
    /// Set when the violation trigger fires; never cleared while the
    /// frame lives.
    pub violated: bool,
    /// Last observed values of boolean-shaped triggers, for
    /// edge-triggering on false→true.
    pub last_violation: bool,
    pub last_fulfillment: bool,
    pub last_termination: bool,
}

impl DeonticState {
    #[must_use]
    pub fn new(frame: DeonticFrame) -> Self {
        Self {
            frame,
            violated: false,
            last_violation: false,
            last_fulfillment: false,
            last_termination: false,
        }
    }
}

/// The four live frame kinds.
#[derive(Debug, Clone)]
pub enum FrameDetail {
    Power(PowerFrame),
    Deontic(DeonticState),
    Reactive(ReactiveRule),
    Transformational(TransformationalRule),
}

/// A live frame: its kind plus the environment it was created in.
///
/// `env.instance` is the owning instance; `env.bindings` carries the
/// unification bindings that were in scope when a consequence added
/// this frame as a literal, so its own references keep resolving.
#[derive(Debug, Clone)]
pub struct FrameEntry {
    pub id: FrameId,
    pub env: Env,
    pub detail: FrameDetail,
}

impl FrameEntry {
    /// The instance that owns this frame (`None` = root).
    #[must_use]
    pub fn owner(&self) -> Option<InstanceId> {
        self.env.instance
    }

    /// The frame's alias, if declared.
    #[must_use]
    pub fn alias(&self) -> Option<&str> {
        match &self.detail {
            FrameDetail::Power(p) => p.alias.as_deref(),
            FrameDetail::Deontic(d) => d.frame.alias.as_deref(),
            FrameDetail::Reactive(r) => r.alias.as_deref(),
            FrameDetail::Transformational(t) => t.alias.as_deref(),
        }
    }
}

impl From<dpcl_ast::FrameLiteral> for FrameDetail {
    fn from(literal: dpcl_ast::FrameLiteral) -> Self {
        match literal {
            dpcl_ast::FrameLiteral::Power(p) => Self::Power(p),
            dpcl_ast::FrameLiteral::Deontic(d) => Self::Deontic(DeonticState::new(d)),
            dpcl_ast::FrameLiteral::Reactive(r) => Self::Reactive(r),
            dpcl_ast::FrameLiteral::Transformational(t) => Self::Transformational(t),
        }
    }
}

/// The world store.
#[derive(Debug, Clone, Default)]
pub struct World {
    atomics: BTreeSet<String>,
    has: BTreeSet<(Value, Value)>,
    templates: BTreeMap<String, CompoundTemplate>,
    instances: BTreeMap<InstanceId, Instance>,
    frames: BTreeMap<FrameId, FrameEntry>,
    root: Scope,
    next_instance: u64,
    next_frame: u64,
}

impl World {
    /// An empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ─── atomics ────────────────────────────────────────────────

    /// Declares an atomic entity. Redeclaration is a no-op.
    pub fn declare_atomic(&mut self, name: impl Into<String>) {
        self.atomics.insert(name.into());
    }

    /// Returns `true` if `name` is a declared atomic.
    #[must_use]
    pub fn is_atomic(&self, name: &str) -> bool {
        self.atomics.contains(name)
    }

    /// Declared atomics, in name order.
    pub fn atomics(&self) -> impl Iterator<Item = &str> {
        self.atomics.iter().map(String::as_str)
    }

    // ─── descriptor relation ────────────────────────────────────

    /// Returns `true` if `has(entity, descriptor)` holds.
    #[must_use]
    pub fn has(&self, entity: &Value, descriptor: &Value) -> bool {
        self.has
            .contains(&(entity.clone(), descriptor.clone()))
    }

    /// Adds `has(entity, descriptor)`. Returns `true` if the world
    /// changed (the relation is a set).
    pub fn assert_has(&mut self, entity: Value, descriptor: Value) -> bool {
        let changed = self.has.insert((entity.clone(), descriptor.clone()));
        if changed {
            debug!(entity = %entity, descriptor = %descriptor, "gains");
        }
        changed
    }

    /// Removes `has(entity, descriptor)`. Returns `true` if the
    /// world changed; removing a missing relation is a no-op.
    pub fn retract_has(&mut self, entity: &Value, descriptor: &Value) -> bool {
        let changed = self.has.remove(&(entity.clone(), descriptor.clone()));
        if changed {
            debug!(entity = %entity, descriptor = %descriptor, "loses");
        }
        changed
    }

    /// Descriptors of `entity`, in order.
    pub fn descriptors_of<'a>(&'a self, entity: &'a Value) -> impl Iterator<Item = &'a Value> {
        self.has
            .iter()
            .filter(move |(e, _)| e == entity)
            .map(|(_, d)| d)
    }

    /// Entities that carry `descriptor`, in order.
    pub fn referents_of<'a>(&'a self, descriptor: &'a Value) -> impl Iterator<Item = &'a Value> {
        self.has
            .iter()
            .filter(move |(_, d)| d == descriptor)
            .map(|(e, _)| e)
    }

    // ─── templates ──────────────────────────────────────────────

    /// Registers a compound template under its object name.
    pub fn add_template(&mut self, template: CompoundTemplate) {
        self.templates.insert(template.name.clone(), template);
    }

    /// Looks up a template by name.
    #[must_use]
    pub fn template(&self, name: &str) -> Option<&CompoundTemplate> {
        self.templates.get(name)
    }

    // ─── frames ─────────────────────────────────────────────────

    /// Adds a frame to the world, owned by `env.instance` (`None` =
    /// root) and carrying `env` as its resolution context.
    ///
    /// # Errors
    ///
    /// Returns a name error if the frame's alias is already taken in
    /// the owning scope.
    pub fn add_frame(&mut self, detail: FrameDetail, env: Env) -> Result<FrameId, EngineError> {
        let id = FrameId::new(self.next_frame);
        let owner = env.instance;
        let entry = FrameEntry { id, env, detail };

        if let Some(alias) = entry.alias().map(str::to_owned) {
            let scope = self.scope_mut(owner)?;
            if scope.aliases.contains_key(&alias) {
                return Err(EngineError::name(format!(
                    "alias `{alias}` already exists in this scope"
                )));
            }
            scope.aliases.insert(alias, id);
        }

        self.scope_mut(owner)?.frames.push(id);
        self.next_frame += 1;
        debug!(frame = %id, "frame added");
        self.frames.insert(id, entry);
        Ok(id)
    }

    /// Removes a frame. Removing a dead frame is a no-op.
    pub fn remove_frame(&mut self, id: FrameId) {
        let Some(entry) = self.frames.remove(&id) else {
            return;
        };
        debug!(frame = %id, "frame removed");
        if let Ok(scope) = self.scope_mut(entry.owner()) {
            scope.frames.retain(|f| *f != id);
            scope.aliases.retain(|_, f| *f != id);
        }
    }

    /// Returns the frame entry if it is live.
    #[must_use]
    pub fn frame(&self, id: FrameId) -> Option<&FrameEntry> {
        self.frames.get(&id)
    }

    /// Mutable access to a live frame.
    pub fn frame_mut(&mut self, id: FrameId) -> Option<&mut FrameEntry> {
        self.frames.get_mut(&id)
    }

    /// All live frame ids in load order.
    #[must_use]
    pub fn frame_ids(&self) -> Vec<FrameId> {
        self.frames.keys().copied().collect()
    }

    /// Live frames in load order.
    pub fn frames(&self) -> impl Iterator<Item = &FrameEntry> {
        self.frames.values()
    }

    // ─── instances ──────────────────────────────────────────────

    /// Creates a fresh instance of `template` with the given
    /// bindings, owned by `parent` (`None` = root). If `name` is
    /// given the instance is registered as a named child of its
    /// owning scope.
    ///
    /// # Errors
    ///
    /// Returns a name error if `name` is already taken in the owning
    /// scope.
    pub fn create_instance(
        &mut self,
        template: impl Into<String>,
        bindings: Bindings,
        parent: Option<InstanceId>,
        name: Option<String>,
    ) -> Result<InstanceId, EngineError> {
        let id = InstanceId::new(self.next_instance);

        if let Some(n) = &name {
            let scope = self.scope_mut(parent)?;
            if scope.children.contains_key(n) {
                return Err(EngineError::name(format!(
                    "name `{n}` already exists in this scope"
                )));
            }
            scope.children.insert(n.clone(), id);
        }
        if let Some(p) = parent {
            self.instance_mut(p)?.owned.push(id);
        }

        let template = template.into();
        debug!(instance = %id, template = %template, "instance created");
        self.instances.insert(
            id,
            Instance {
                id,
                template,
                name,
                bindings,
                parent,
                owned: Vec::new(),
                scope: Scope::default(),
            },
        );
        self.next_instance += 1;
        Ok(id)
    }

    /// Destroys an instance: removes its frames, recursively
    /// destroys every instance it owns, and drops every descriptor
    /// relation mentioning it.
    pub fn destroy_instance(&mut self, id: InstanceId) {
        let Some(instance) = self.instances.remove(&id) else {
            return;
        };
        debug!(instance = %id, template = %instance.template, "instance destroyed");

        for frame in &instance.scope.frames {
            self.frames.remove(frame);
        }
        for child in instance.owned {
            self.destroy_instance(child);
        }

        // Unlink from the owning scope.
        if let Ok(scope) = self.scope_mut(instance.parent) {
            scope.children.retain(|_, c| *c != id);
        }
        if let Some(parent) = instance.parent {
            if let Some(p) = self.instances.get_mut(&parent) {
                p.owned.retain(|c| *c != id);
            }
        }

        let dead = Value::Instance(id);
        self.has.retain(|(e, d)| *e != dead && *d != dead);
    }

    /// Returns the instance if it is live.
    #[must_use]
    pub fn instance(&self, id: InstanceId) -> Option<&Instance> {
        self.instances.get(&id)
    }

    /// Live instances in creation order.
    pub fn instances(&self) -> impl Iterator<Item = &Instance> {
        self.instances.values()
    }

    /// Finds the live instance of `template` whose bindings equal
    /// `bindings`.
    #[must_use]
    pub fn find_instance(&self, template: &str, bindings: &Bindings) -> Option<InstanceId> {
        self.instances
            .values()
            .find(|i| i.template == template && i.bindings == *bindings)
            .map(|i| i.id)
    }

    fn instance_mut(&mut self, id: InstanceId) -> Result<&mut Instance, EngineError> {
        self.instances
            .get_mut(&id)
            .ok_or_else(|| EngineError::runtime(format!("instance {id} is not live")))
    }

    fn scope_mut(&mut self, owner: Option<InstanceId>) -> Result<&mut Scope, EngineError> {
        match owner {
            None => Ok(&mut self.root),
            Some(id) => self.instance_mut(id).map(|i| &mut i.scope),
        }
    }

    /// The root scope.
    #[must_use]
    pub fn root_scope(&self) -> &Scope {
        &self.root
    }

    // ─── resolution ─────────────────────────────────────────────

    /// Resolves an object reference to a value in `env`.
    ///
    /// # Errors
    ///
    /// Runtime errors for `self`/`super`/`holder` outside a binding
    /// context and for event-valued parameters in object position;
    /// name errors for everything that does not resolve.
    pub fn resolve_value(&self, reference: &ObjectRef, env: &Env) -> Result<Value, EngineError> {
        match reference {
            ObjectRef::Name(n) => self.resolve_name(n, env),
            ObjectRef::Refined {
                object, refinement, ..
            } => {
                let bindings = self.resolve_refinement(refinement, env)?;
                match self.find_instance(object, &bindings) {
                    Some(id) => Ok(Value::Instance(id)),
                    None => Err(EngineError::runtime(format!(
                        "no live instance of `{object}` matches the refinement"
                    ))),
                }
            }
            ObjectRef::Scoped { scope, name } => {
                let scope_value = self.resolve_value(scope, env)?;
                let Value::Instance(id) = scope_value else {
                    return Err(EngineError::runtime(format!(
                        "`{scope}` is not a compound instance, cannot resolve `{name}` in it"
                    )));
                };
                let Some(member) = name.as_name() else {
                    return Err(EngineError::runtime(format!(
                        "scoped member `{name}` must be a bare name"
                    )));
                };
                self.resolve_member(id, member)
            }
        }
    }

    /// Resolves a bare name in `env`: reserved keywords first, then
    /// unification bindings, then the enclosing instance chain, then
    /// root-scope names, then atomics.
    pub fn resolve_name(&self, n: &str, env: &Env) -> Result<Value, EngineError> {
        if n == name::WILDCARD {
            return Err(EngineError::runtime(
                "wildcard `*` cannot be used as a value",
            ));
        }
        if n == name::SELF {
            return env
                .instance
                .map(Value::Instance)
                .ok_or_else(|| EngineError::runtime("`self` used outside a compound instance"));
        }
        if n == name::SUPER {
            let id = env
                .instance
                .ok_or_else(|| EngineError::runtime("`super` used outside a compound instance"))?;
            return self
                .instance(id)
                .and_then(|i| i.parent)
                .map(Value::Instance)
                .ok_or_else(|| EngineError::runtime("`super` used in a root-owned instance"));
        }
        if n == name::HOLDER {
            return env
                .holder
                .clone()
                .ok_or_else(|| EngineError::runtime("`holder` used outside a frame context"));
        }

        if let Some(binding) = env.bindings.get(n) {
            return binding_value(n, binding);
        }

        // Walk the enclosing instance chain: parameter bindings and
        // named children shadow outer names.
        let mut cursor = env.instance;
        while let Some(id) = cursor {
            let Some(instance) = self.instance(id) else {
                break;
            };
            if let Some(binding) = instance.bindings.get(n) {
                return binding_value(n, binding);
            }
            if let Some(child) = instance.scope.children.get(n) {
                return Ok(Value::Instance(*child));
            }
            cursor = instance.parent;
        }

        if let Some(child) = self.root.children.get(n) {
            return Ok(Value::Instance(*child));
        }
        if self.atomics.contains(n) {
            return Ok(Value::atomic(n));
        }

        Err(EngineError::name(format!("cannot resolve reference `{n}`")))
    }

    /// Resolves a member name inside an instance: named children
    /// first, then parameter bindings.
    fn resolve_member(&self, id: InstanceId, member: &str) -> Result<Value, EngineError> {
        let instance = self
            .instance(id)
            .ok_or_else(|| EngineError::runtime(format!("instance {id} is not live")))?;

        if let Some(child) = instance.scope.children.get(member) {
            return Ok(Value::Instance(*child));
        }
        if let Some(binding) = instance.bindings.get(member) {
            return binding_value(member, binding);
        }

        Err(EngineError::name(format!(
            "`{}` has no member `{member}`",
            instance.name.as_deref().unwrap_or(&instance.template)
        )))
    }

    /// Resolves every term of a refinement into bindings.
    pub fn resolve_refinement(
        &self,
        refinement: &dpcl_ast::Refinement,
        env: &Env,
    ) -> Result<Bindings, EngineError> {
        refinement
            .iter()
            .map(|(key, term)| {
                let binding = match term {
                    dpcl_ast::RefTerm::Object(r) => {
                        Binding::Value(self.resolve_value(r, env)?)
                    }
                    dpcl_ast::RefTerm::Event(e) => Binding::Event(e.clone()),
                };
                Ok((key.clone(), binding))
            })
            .collect()
    }

    /// Resolves a reference to a live frame, searching the alias
    /// maps of the enclosing instance chain, then the root scope.
    #[must_use]
    pub fn resolve_frame(&self, n: &str, env: &Env) -> Option<FrameId> {
        let mut cursor = env.instance;
        while let Some(id) = cursor {
            let instance = self.instance(id)?;
            if let Some(frame) = instance.scope.aliases.get(n) {
                return Some(*frame);
            }
            cursor = instance.parent;
        }
        self.root.aliases.get(n).copied()
    }

    /// Returns `true` if the reference resolves to a live object.
    /// Used by the condition engine, which is total: resolution
    /// failure is `false`, never an error.
    #[must_use]
    pub fn resolves(&self, reference: &ObjectRef, env: &Env) -> bool {
        if let ObjectRef::Name(n) = reference {
            if self.resolve_frame(n, env).is_some() {
                return true;
            }
        }
        self.resolve_value(reference, env).is_ok()
    }
}

fn binding_value(name: &str, binding: &Binding) -> Result<Value, EngineError> {
    match binding {
        Binding::Value(v) => Ok(v.clone()),
        Binding::Event(_) => Err(EngineError::runtime(format!(
            "parameter `{name}` is bound to an event, not an object"
        ))),
    }
}
