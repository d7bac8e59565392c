//! Program loader.
//!
//! Three passes over a decoded program:
//!
//! 1. **Import expansion**: `{"import": name}` directives are
//!    replaced by the directives of `<name>.json`, found in the
//!    search path. Textual inclusion, recursive, cycle-checked.
//! 2. **Validation**: reserved-name misuse, duplicate aliases
//!    within a scope, unknown static references, and malformed
//!    `minus` operands are rejected before anything is installed.
//! 3. **Installation**: declarations land in a world store;
//!    load-time events are collected for the evaluator to fire
//!    afterwards. A failure in any pass installs nothing.
//!
//! Holder and counterparty references are *not* statically checked:
//! they resolve at event time, against a world that load time cannot
//! see. The same goes for names bound by refinement unification.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use dpcl_ast::{
    decode, BoolExpr, CompoundTemplate, Directive, DirectiveKind, Event, FrameLiteral, ObjectDecl,
    ObjectRef, ProductionObject, RefTerm, Refinement, Trigger,
};
use dpcl_types::{name, InstanceId};
use tracing::debug;

use crate::error::EngineError;
use crate::world::{Bindings, DeonticState, Env, FrameDetail, Value, World};

// ─── pass 1: import expansion ───────────────────────────────────────

/// Expands every `import` directive, recursively, against the given
/// search directories.
///
/// # Errors
///
/// Io errors for unreadable targets, schema errors for files that do
/// not decode, and a name error for circular imports.
pub fn expand_imports(
    directives: Vec<Directive>,
    search: &[PathBuf],
) -> Result<Vec<Directive>, EngineError> {
    let mut stack = Vec::new();
    expand_in(directives, search, &mut stack)
}

fn expand_in(
    directives: Vec<Directive>,
    search: &[PathBuf],
    stack: &mut Vec<String>,
) -> Result<Vec<Directive>, EngineError> {
    let mut out = Vec::with_capacity(directives.len());

    for mut directive in directives {
        match directive.kind {
            DirectiveKind::Import { name, .. } => {
                if stack.iter().any(|n| *n == name) {
                    return Err(EngineError::name(format!(
                        "circular import of `{name}`"
                    )));
                }
                let imported = read_import(&name, search)?;
                stack.push(name);
                out.extend(expand_in(imported, search, stack)?);
                stack.pop();
            }
            DirectiveKind::Compound(ref mut template) => {
                let content = std::mem::take(&mut template.content);
                template.content = expand_in(content, search, stack)?;
                out.push(directive);
            }
            DirectiveKind::Object(ref mut decl) => {
                let content = std::mem::take(&mut decl.content);
                decl.content = expand_in(content, search, stack)?;
                out.push(directive);
            }
            _ => out.push(directive),
        }
    }

    Ok(out)
}

fn read_import(name: &str, search: &[PathBuf]) -> Result<Vec<Directive>, EngineError> {
    let file = format!("{name}.json");
    let path = search
        .iter()
        .map(|dir| dir.join(&file))
        .find(|p| p.is_file())
        .ok_or_else(|| {
            EngineError::Io(format!("import `{name}`: `{file}` not found in search path"))
        })?;

    debug!(import = name, path = %path.display(), "expanding import");
    let program = read_program(&path)?;
    Ok(program.directives)
}

/// Reads and decodes a program file.
pub fn read_program(path: &Path) -> Result<dpcl_ast::Program, EngineError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| EngineError::Io(format!("cannot read {}: {e}", path.display())))?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| EngineError::Io(format!("{} is not valid JSON: {e}", path.display())))?;
    Ok(decode::program(&value)?)
}

// ─── pass 2: validation ─────────────────────────────────────────────

/// Validates a fully expanded program.
pub fn validate(directives: &[Directive]) -> Result<(), EngineError> {
    let mut declared = BTreeSet::new();
    collect_declared(directives, &mut declared)?;

    let mut scope_names = BTreeSet::new();
    check_scope(directives, &declared, &mut Vec::new(), &mut scope_names)
}

/// First walk: collect every statically declared name, checking
/// reserved-name misuse as we go. Forward references are legal, so
/// collection precedes reference checking.
fn collect_declared(
    directives: &[Directive],
    declared: &mut BTreeSet<String>,
) -> Result<(), EngineError> {
    for directive in directives {
        match &directive.kind {
            DirectiveKind::Atomics(names) => {
                for n in names {
                    check_assignable(n)?;
                    declared.insert(n.clone());
                }
            }
            DirectiveKind::Compound(template) => {
                check_assignable(&template.name)?;
                declared.insert(template.name.clone());
                for p in &template.params {
                    check_assignable(p)?;
                }
                collect_declared(&template.content, declared)?;
            }
            DirectiveKind::Object(decl) => {
                check_assignable(&decl.name)?;
                declared.insert(decl.name.clone());
                collect_declared(&decl.content, declared)?;
            }
            DirectiveKind::Power(_)
            | DirectiveKind::Deontic(_)
            | DirectiveKind::Reactive(_)
            | DirectiveKind::Transformational(_) => {
                if let Some(alias) = directive.kind.alias() {
                    check_assignable(alias)?;
                    declared.insert(alias.to_string());
                }
            }
            DirectiveKind::Import { .. } | DirectiveKind::Occur(_) => {}
        }
    }
    Ok(())
}

fn check_assignable(n: &str) -> Result<(), EngineError> {
    if name::is_reserved(n) {
        return Err(EngineError::name(format!(
            "reserved name `{n}` is not assignable"
        )));
    }
    Ok(())
}

/// Second walk: per-scope alias uniqueness and static reference
/// checks. `locals` is the stack of parameter sets of the enclosing
/// compounds.
fn check_scope(
    directives: &[Directive],
    declared: &BTreeSet<String>,
    locals: &mut Vec<BTreeSet<String>>,
    scope_names: &mut BTreeSet<String>,
) -> Result<(), EngineError> {
    for directive in directives {
        if let Some(alias) = directive.kind.alias() {
            if !scope_names.insert(alias.to_string()) {
                return Err(EngineError::name(format!(
                    "duplicate alias `{alias}` in scope ({})",
                    directive.span
                )));
            }
        }

        match &directive.kind {
            DirectiveKind::Atomics(_) | DirectiveKind::Import { .. } => {}
            DirectiveKind::Compound(template) => {
                if !scope_names.insert(template.name.clone()) {
                    return Err(EngineError::name(format!(
                        "duplicate name `{}` in scope",
                        template.name
                    )));
                }
                let mut inner_names: BTreeSet<String> =
                    template.params.iter().cloned().collect();
                if inner_names.len() != template.params.len() {
                    return Err(EngineError::name(format!(
                        "duplicate parameter in template `{}`",
                        template.name
                    )));
                }
                locals.push(inner_names.clone());
                check_scope(&template.content, declared, locals, &mut inner_names)?;
                for d in &template.initial_descriptors {
                    check_ref(d, declared, locals)?;
                }
                locals.pop();
            }
            DirectiveKind::Object(decl) => {
                if !scope_names.insert(decl.name.clone()) {
                    return Err(EngineError::name(format!(
                        "duplicate name `{}` in scope",
                        decl.name
                    )));
                }
                let mut inner_names = BTreeSet::new();
                check_scope(&decl.content, declared, locals, &mut inner_names)?;
                for d in &decl.initial_descriptors {
                    check_ref(d, declared, locals)?;
                }
            }
            DirectiveKind::Power(power) => {
                locals.push(pattern_locals(&power.action));
                check_event(&power.consequence, declared, locals)?;
                locals.pop();
            }
            DirectiveKind::Deontic(deontic) => {
                // Triggers are patterns; their free names bind at
                // match time. Only malformed minus operands are
                // checked here.
                for trigger in [
                    &deontic.violation,
                    &deontic.fulfillment,
                    &deontic.termination,
                ]
                .into_iter()
                .flatten()
                {
                    if let Trigger::Event(e) = trigger {
                        check_minus_shape(e)?;
                    }
                }
            }
            DirectiveKind::Reactive(rule) => {
                check_minus_shape(&rule.event)?;
                locals.push(pattern_locals(&rule.event));
                check_event(&rule.reaction, declared, locals)?;
                locals.pop();
            }
            DirectiveKind::Transformational(rule) => {
                check_bool(&rule.condition, declared, locals)?;
                let (entity, descriptor, _) = rule.conclusion.as_assertion();
                check_ref(entity, declared, locals)?;
                check_ref(descriptor, declared, locals)?;
            }
            DirectiveKind::Occur(event) => {
                check_event(event, declared, locals)?;
            }
        }
    }
    Ok(())
}

/// Names an action or trigger pattern brings into scope when it
/// matches: its refinement keys and any bare-name refinement values.
fn pattern_locals(pattern: &Event) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    collect_pattern_locals(pattern, &mut names);
    names
}

fn collect_pattern_locals(pattern: &Event, names: &mut BTreeSet<String>) {
    match pattern {
        Event::Refined { refinement, .. } => {
            for (key, term) in refinement {
                names.insert(key.clone());
                if let RefTerm::Object(ObjectRef::Name(n)) = term {
                    if !name::is_reserved(n) {
                        names.insert(n.clone());
                    }
                }
            }
        }
        Event::Request { action, .. } => collect_pattern_locals(action, names),
        Event::Naming {
            entity, descriptor, ..
        } => {
            for operand in [entity, descriptor] {
                if let ObjectRef::Name(n) = operand {
                    if !name::is_reserved(n) {
                        names.insert(n.clone());
                    }
                }
            }
        }
        Event::Atomic { .. } | Event::Production { .. } => {}
    }
}

fn known(n: &str, declared: &BTreeSet<String>, locals: &[BTreeSet<String>]) -> bool {
    name::is_reserved(n) || declared.contains(n) || locals.iter().any(|set| set.contains(n))
}

fn check_ref(
    reference: &ObjectRef,
    declared: &BTreeSet<String>,
    locals: &[BTreeSet<String>],
) -> Result<(), EngineError> {
    match reference {
        ObjectRef::Name(n) => {
            if !known(n, declared, locals) {
                return Err(EngineError::name(format!("unknown reference `{n}`")));
            }
        }
        ObjectRef::Refined {
            object, refinement, ..
        } => {
            if !known(object, declared, locals) {
                return Err(EngineError::name(format!("unknown reference `{object}`")));
            }
            check_refinement(refinement, declared, locals)?;
        }
        ObjectRef::Scoped { scope, .. } => {
            // Members of another scope are only visible at run time.
            check_ref(scope, declared, locals)?;
        }
    }
    Ok(())
}

fn check_refinement(
    refinement: &Refinement,
    declared: &BTreeSet<String>,
    locals: &[BTreeSet<String>],
) -> Result<(), EngineError> {
    for term in refinement.values() {
        match term {
            RefTerm::Object(r) => check_ref(r, declared, locals)?,
            RefTerm::Event(e) => check_event(e, declared, locals)?,
        }
    }
    Ok(())
}

fn check_event(
    event: &Event,
    declared: &BTreeSet<String>,
    locals: &[BTreeSet<String>],
) -> Result<(), EngineError> {
    match event {
        Event::Atomic { .. } => Ok(()),
        Event::Refined { refinement, .. } => check_refinement(refinement, declared, locals),
        Event::Request { agent, action } => {
            check_ref(agent, declared, locals)?;
            check_event(action, declared, locals)
        }
        Event::Production { object, gains } => match object {
            ProductionObject::Frame(literal) => {
                if !gains {
                    return Err(EngineError::name(
                        "minus requires a reference, not a frame literal",
                    ));
                }
                check_frame_literal(literal, declared, locals)
            }
            ProductionObject::Ref(r) => check_ref(r, declared, locals),
        },
        Event::Naming {
            entity, descriptor, ..
        } => {
            check_ref(entity, declared, locals)?;
            check_ref(descriptor, declared, locals)
        }
    }
}

fn check_bool(
    expr: &BoolExpr,
    declared: &BTreeSet<String>,
    locals: &[BTreeSet<String>],
) -> Result<(), EngineError> {
    match expr {
        BoolExpr::Literal(_) => Ok(()),
        BoolExpr::Descriptor {
            entity, descriptor, ..
        } => {
            check_ref(entity, declared, locals)?;
            check_ref(descriptor, declared, locals)
        }
        BoolExpr::Negate(inner) => check_bool(inner, declared, locals),
        BoolExpr::Ref(r) => check_ref(r, declared, locals),
    }
}

fn check_frame_literal(
    literal: &FrameLiteral,
    declared: &BTreeSet<String>,
    locals: &[BTreeSet<String>],
) -> Result<(), EngineError> {
    match literal {
        FrameLiteral::Power(p) => {
            let mut inner = locals.to_vec();
            inner.push(pattern_locals(&p.action));
            check_event(&p.consequence, declared, &inner)
        }
        FrameLiteral::Deontic(_) => Ok(()),
        FrameLiteral::Reactive(r) => {
            check_minus_shape(&r.event)?;
            let mut inner = locals.to_vec();
            inner.push(pattern_locals(&r.event));
            check_event(&r.reaction, declared, &inner)
        }
        FrameLiteral::Transformational(t) => {
            check_bool(&t.condition, declared, locals)?;
            let (entity, descriptor, _) = t.conclusion.as_assertion();
            check_ref(entity, declared, locals)?;
            check_ref(descriptor, declared, locals)
        }
    }
}

/// Patterns may mention `minus`, but never of a frame literal.
fn check_minus_shape(event: &Event) -> Result<(), EngineError> {
    if let Event::Production {
        object: ProductionObject::Frame(_),
        gains: false,
    } = event
    {
        return Err(EngineError::name(
            "minus requires a reference, not a frame literal",
        ));
    }
    Ok(())
}

// ─── pass 3: installation ───────────────────────────────────────────

/// Installs a validated program into a world, returning the
/// load-time events in directive order.
pub fn install(
    world: &mut World,
    directives: &[Directive],
) -> Result<Vec<(Event, Env)>, EngineError> {
    let mut events = Vec::new();
    populate(world, directives, None, &mut events)?;
    Ok(events)
}

/// Installs directives into a scope: the root (`owner: None`) or a
/// compound instance. Shared between load-time installation and
/// run-time template instantiation.
pub(crate) fn populate(
    world: &mut World,
    directives: &[Directive],
    owner: Option<InstanceId>,
    events: &mut Vec<(Event, Env)>,
) -> Result<(), EngineError> {
    let scope_env = || owner.map(Env::in_instance).unwrap_or_default();

    for directive in directives {
        match &directive.kind {
            DirectiveKind::Atomics(names) => {
                for n in names {
                    world.declare_atomic(n);
                }
            }
            DirectiveKind::Compound(template) => world.add_template(template.clone()),
            DirectiveKind::Power(p) => {
                world.add_frame(FrameDetail::Power(p.clone()), scope_env())?;
            }
            DirectiveKind::Deontic(d) => {
                world.add_frame(
                    FrameDetail::Deontic(DeonticState::new(d.clone())),
                    scope_env(),
                )?;
            }
            DirectiveKind::Reactive(r) => {
                world.add_frame(FrameDetail::Reactive(r.clone()), scope_env())?;
            }
            DirectiveKind::Transformational(t) => {
                world.add_frame(FrameDetail::Transformational(t.clone()), scope_env())?;
            }
            DirectiveKind::Object(decl) => {
                create_object(world, decl, owner, events)?;
            }
            DirectiveKind::Import { name, .. } => {
                return Err(EngineError::runtime(format!(
                    "import `{name}` survived expansion"
                )));
            }
            DirectiveKind::Occur(event) => {
                events.push((event.clone(), scope_env()));
            }
        }
    }
    Ok(())
}

fn create_object(
    world: &mut World,
    decl: &ObjectDecl,
    parent: Option<InstanceId>,
    events: &mut Vec<(Event, Env)>,
) -> Result<InstanceId, EngineError> {
    let id = world.create_instance(
        decl.name.clone(),
        Bindings::new(),
        parent,
        Some(decl.name.clone()),
    )?;
    populate(world, &decl.content, Some(id), events)?;

    let env = Env::in_instance(id);
    for descriptor in &decl.initial_descriptors {
        let value = world.resolve_value(descriptor, &env)?;
        world.assert_has(Value::Instance(id), value);
    }
    Ok(id)
}

/// Instantiates a compound template at run time: binds parameters,
/// installs the content into the fresh instance, and applies the
/// initial descriptors. Content events are appended to `events` for
/// the evaluator to enqueue.
pub(crate) fn instantiate(
    world: &mut World,
    template_name: &str,
    bindings: Bindings,
    owner: Option<InstanceId>,
    events: &mut Vec<(Event, Env)>,
) -> Result<InstanceId, EngineError> {
    let template: CompoundTemplate = world
        .template(template_name)
        .cloned()
        .ok_or_else(|| EngineError::name(format!("unknown template `{template_name}`")))?;

    let expected: BTreeSet<&str> = template.params.iter().map(String::as_str).collect();
    let supplied: BTreeSet<&str> = bindings.keys().map(String::as_str).collect();
    if expected != supplied {
        return Err(EngineError::runtime(format!(
            "template `{template_name}` expects parameters [{}], got [{}]",
            template.params.join(", "),
            bindings.keys().cloned().collect::<Vec<_>>().join(", ")
        )));
    }

    let id = world.create_instance(template_name, bindings, owner, None)?;
    populate(world, &template.content, Some(id), events)?;

    let env = Env::in_instance(id);
    for descriptor in &template.initial_descriptors {
        let value = world.resolve_value(descriptor, &env)?;
        world.assert_has(Value::Instance(id), value);
    }

    debug!(instance = %id, template = template_name, "template instantiated");
    Ok(id)
}
