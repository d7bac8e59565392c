//! Inspection API.
//!
//! `show` pretty-prints what a reference names: an atomic entity and
//! the descriptor relations it participates in, a live instance and
//! the frames it owns, a template and its live instances, or a frame
//! by alias. Read-only; the shell calls this for its `show` command.

use std::fmt::Write as _;

use dpcl_ast::{decode, ObjectRef};
use dpcl_types::{InstanceId, Span};

use crate::error::EngineError;
use crate::world::{Env, FrameDetail, FrameEntry, Value, World};

/// Pretty-prints the object `target` names.
///
/// `target` is either a bare name or a JSON object reference (e.g.
/// `{"object": "borrowing", "refinement": {"item": "dracula"}}`).
///
/// # Errors
///
/// A name error if nothing goes by that name; a schema error if the
/// JSON form does not decode.
pub fn show(world: &World, target: &str) -> Result<String, EngineError> {
    let target = target.trim();

    if target.starts_with('{') || target.starts_with('"') {
        let value: serde_json::Value = serde_json::from_str(target)
            .map_err(|e| EngineError::name(format!("malformed reference: {e}")))?;
        let reference = decode::object_ref(&value, &Span::directive(0))?;
        return show_ref(world, &reference);
    }

    show_name(world, target)
}

fn show_ref(world: &World, reference: &ObjectRef) -> Result<String, EngineError> {
    match reference {
        ObjectRef::Name(n) => show_name(world, n),
        _ => match world.resolve_value(reference, &Env::root())? {
            Value::Instance(id) => Ok(render_instance(world, id)),
            Value::Atomic(n) => Ok(render_atomic(world, &n)),
        },
    }
}

fn show_name(world: &World, n: &str) -> Result<String, EngineError> {
    if world.is_atomic(n) {
        return Ok(render_atomic(world, n));
    }
    if let Ok(Value::Instance(id)) = world.resolve_name(n, &Env::root()) {
        return Ok(render_instance(world, id));
    }
    if world.template(n).is_some() {
        return Ok(render_template(world, n));
    }
    if let Some(frame) = world.resolve_frame(n, &Env::root()) {
        if let Some(entry) = world.frame(frame) {
            return Ok(render_frame(entry, 0));
        }
    }

    Err(EngineError::name(format!("nothing is named `{n}`")))
}

fn render_atomic(world: &World, n: &str) -> String {
    let value = Value::atomic(n);
    let descriptors: Vec<String> = world.descriptors_of(&value).map(Value::to_string).collect();
    let referents: Vec<String> = world.referents_of(&value).map(Value::to_string).collect();

    let mut out = format!("atomic {n} [{}]\n", descriptors.join(", "));
    if !referents.is_empty() {
        let _ = writeln!(out, "  descriptor of: {}", referents.join(", "));
    }
    out
}

fn render_instance(world: &World, id: InstanceId) -> String {
    let Some(instance) = world.instance(id) else {
        return format!("{id} (destroyed)\n");
    };

    let mut head = instance.template.clone();
    if !instance.bindings.is_empty() {
        let pairs: Vec<String> = instance
            .bindings
            .iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect();
        let _ = write!(head, "{{{}}}", pairs.join(", "));
    }

    let value = Value::Instance(id);
    let descriptors: Vec<String> = world.descriptors_of(&value).map(Value::to_string).collect();

    let mut out = format!("(active) {head} [{}] <{id}>\n", descriptors.join(", "));
    for frame_id in &instance.scope.frames {
        if let Some(entry) = world.frame(*frame_id) {
            out.push_str(&render_frame(entry, 1));
        }
    }
    for child in instance.scope.children.values() {
        if let Some(child_instance) = world.instance(*child) {
            let name = child_instance.name.as_deref().unwrap_or("?");
            let _ = writeln!(out, "  child {name} <{child}>");
        }
    }
    out
}

fn render_template(world: &World, n: &str) -> String {
    let Some(template) = world.template(n) else {
        return String::new();
    };

    let mut out = format!("template {n}({})\n", template.params.join(", "));
    let live: Vec<InstanceId> = world
        .instances()
        .filter(|i| i.template == n)
        .map(|i| i.id)
        .collect();
    if live.is_empty() {
        out.push_str("  no live instances\n");
    } else {
        for id in live {
            out.push_str("  ");
            out.push_str(&render_instance(world, id));
        }
    }
    out
}

fn render_frame(entry: &FrameEntry, depth: usize) -> String {
    let pad = "  ".repeat(depth);
    let alias = entry.alias().map(|a| format!("{a} ")).unwrap_or_default();

    match &entry.detail {
        FrameDetail::Power(p) => format!(
            "{pad}{} {alias}{{\n{pad}  holder: {}\n{pad}  action: {}\n{pad}  consequence: {}\n{pad}}}\n",
            p.position.keyword(),
            p.holder,
            p.action,
            p.consequence
        ),
        FrameDetail::Deontic(state) => {
            let mut out = format!(
                "{pad}{} {alias}{{\n{pad}  holder: {}\n",
                state.frame.position.keyword(),
                state.frame.holder
            );
            if let Some(counterparty) = &state.frame.counterparty {
                let _ = writeln!(out, "{pad}  counterparty: {counterparty}");
            }
            let _ = writeln!(out, "{pad}  action: {}", state.frame.action);
            if let Some(violation) = &state.frame.violation {
                let _ = writeln!(out, "{pad}  violation: {violation}");
            }
            if let Some(fulfillment) = &state.frame.fulfillment {
                let _ = writeln!(out, "{pad}  fulfillment: {fulfillment}");
            }
            if let Some(termination) = &state.frame.termination {
                let _ = writeln!(out, "{pad}  termination: {termination}");
            }
            let _ = writeln!(out, "{pad}  violated: {}", state.violated);
            let _ = writeln!(out, "{pad}}}");
            out
        }
        FrameDetail::Reactive(r) => format!("{pad}reactive {alias}{{ {r} }}\n"),
        FrameDetail::Transformational(t) => {
            format!("{pad}transformational {alias}{{ {t} }}\n")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::eval::Engine;
    use serde_json::json;

    fn library_engine() -> Engine {
        let mut engine = Engine::new(EngineConfig::default());
        engine
            .load_value(&json!([
                {"atomics": ["alice", "library", "dracula", "student", "member"]},
                {"entity": "alice", "descriptor": "student", "gains": true},
                {
                    "position": "power",
                    "holder": "student",
                    "action": "#register",
                    "consequence": {"entity": "holder", "descriptor": "member", "gains": true},
                    "alias": "p_register"
                },
                {"object": "borrowing", "params": ["borrower", "item"], "content": [
                    {
                        "position": "duty",
                        "holder": "borrower",
                        "action": {"event": "#return", "refinement": {"item": "item"}},
                        "violation": {"event": "#timeout"},
                        "alias": "d1"
                    }
                ]},
                {
                    "position": "power",
                    "action": {"event": "#borrow", "refinement": {"item": "item"}},
                    "consequence": {"plus": {
                        "object": "borrowing",
                        "refinement": {"borrower": "holder", "item": "item"}
                    }}
                }
            ]))
            .expect("library program loads");
        engine
    }

    #[test]
    fn show_atomic_lists_descriptors() {
        let engine = library_engine();
        let out = engine.show("alice").expect("show alice");
        assert!(out.starts_with("atomic alice"));
        assert!(out.contains("student"));
    }

    #[test]
    fn show_round_trips_naming() {
        let mut engine = library_engine();
        engine
            .submit_value(&json!({"agent": "alice", "action": "#register"}))
            .expect("register");
        assert!(engine.show("alice").expect("show").contains("member"));

        engine
            .submit_value(&json!({"entity": "alice", "descriptor": "member", "gains": false}))
            .expect("retract");
        assert!(!engine.show("alice").expect("show").contains("member"));
    }

    #[test]
    fn show_frame_by_alias() {
        let engine = library_engine();
        let out = engine.show("p_register").expect("show frame");
        assert!(out.contains("power p_register"));
        assert!(out.contains("holder: student"));
        assert!(out.contains("action: #register"));
    }

    #[test]
    fn show_template_and_instances() {
        let mut engine = library_engine();
        let out = engine.show("borrowing").expect("show template");
        assert!(out.contains("template borrowing(borrower, item)"));
        assert!(out.contains("no live instances"));

        engine
            .submit_value(&json!({
                "agent": "alice",
                "action": {"event": "#borrow", "refinement": {"item": "dracula"}}
            }))
            .expect("borrow");
        let out = engine.show("borrowing").expect("show template");
        assert!(out.contains("borrower: alice"));
        assert!(out.contains("item: dracula"));
        assert!(out.contains("duty d1"));
        assert!(out.contains("violated: false"));
    }

    #[test]
    fn show_refined_reference() {
        let mut engine = library_engine();
        engine
            .submit_value(&json!({
                "agent": "alice",
                "action": {"event": "#borrow", "refinement": {"item": "dracula"}}
            }))
            .expect("borrow");

        let out = engine
            .show(r#"{"object": "borrowing", "refinement": {"borrower": "alice", "item": "dracula"}}"#)
            .expect("show refined");
        assert!(out.contains("(active) borrowing"));
    }

    #[test]
    fn show_unknown_name_errors() {
        let engine = library_engine();
        let err = engine.show("ghost").expect_err("unknown name");
        assert!(matches!(err, EngineError::Name(_)));
    }
}
