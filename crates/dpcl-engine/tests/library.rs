//! End-to-end scenarios against the library program.
//!
//! The program models a small lending institution: students may
//! register as members, members may borrow books, borrowing creates
//! a compound instance carrying a return duty, and violations arm a
//! fining power for the library.

use dpcl_engine::{Engine, EngineConfig, Value};
use serde_json::{json, Value as Json};

fn library_program() -> Json {
    json!([
        {"atomics": ["alice", "bob", "library", "dracula", "carmilla",
                     "student", "member", "fined", "book"]},
        {"entity": "alice", "descriptor": "student", "gains": true},
        {"entity": "dracula", "descriptor": "book", "gains": true},
        {"entity": "carmilla", "descriptor": "book", "gains": true},

        {
            "position": "power",
            "holder": "student",
            "action": "#register",
            "consequence": {"entity": "holder", "descriptor": "member", "gains": true},
            "alias": "p_register"
        },

        {
            "position": "power",
            "holder": "member",
            "action": {"event": "#borrow", "refinement": {"item": "item"}},
            "consequence": {"plus": {
                "object": "borrowing",
                "refinement": {"lender": "library", "borrower": "holder", "item": "item"}
            }},
            "alias": "p_borrow"
        },

        {"object": "borrowing", "params": ["lender", "borrower", "item"], "content": [
            {
                "position": "duty",
                "holder": "borrower",
                "counterparty": "lender",
                "action": {"event": "#return", "refinement": {"item": "item"}},
                "violation": {"event": "#timeout"},
                "alias": "d1"
            },
            {
                "position": "power",
                "holder": "borrower",
                "action": {"event": "#return", "refinement": {"item": "item"}},
                "consequence": {"minus": "self"},
                "alias": "p_return"
            },
            {
                "position": "power",
                "holder": "lender",
                "action": {"event": "#request_return", "refinement": {"item": "item"}},
                "consequence": {"plus": {
                    "position": "duty",
                    "holder": "borrower",
                    "counterparty": "lender",
                    "action": {"event": "#return", "refinement": {"item": "item"}},
                    "violation": {"event": "#early_timeout"},
                    "alias": "d2"
                }},
                "alias": "p_request_return"
            },
            {
                "event": {"plus": {"scope": "d1", "name": "violated"}},
                "reaction": {"plus": {
                    "position": "power",
                    "holder": "lender",
                    "action": {"event": "#fine", "refinement": {"target": "borrower"}},
                    "consequence": {"entity": "borrower", "descriptor": "fined", "gains": true},
                    "alias": "p_fine"
                }},
                "alias": "r_violation"
            }
        ]}
    ])
}

fn engine() -> Engine {
    let mut engine = Engine::new(EngineConfig::default());
    engine
        .load_value(&library_program())
        .expect("library program loads");
    engine
}

fn request(agent: &str, action: Json) -> Json {
    json!({"agent": agent, "action": action})
}

fn submit(engine: &mut Engine, value: Json) {
    engine.submit_value(&value).expect("input processes");
}

fn has(engine: &Engine, entity: &str, descriptor: &str) -> bool {
    engine
        .world()
        .has(&Value::atomic(entity), &Value::atomic(descriptor))
}

fn register_and_borrow(engine: &mut Engine) {
    submit(engine, request("alice", json!("#register")));
    submit(
        engine,
        request(
            "alice",
            json!({"event": "#borrow", "refinement": {"item": "dracula"}}),
        ),
    );
}

#[test]
fn scenario_register() {
    let mut engine = engine();
    submit(&mut engine, request("alice", json!("#register")));

    let shown = engine.show("alice").expect("show alice");
    assert!(shown.contains("student"));
    assert!(shown.contains("member"));
}

#[test]
fn scenario_borrow_and_return() {
    let mut engine = engine();
    register_and_borrow(&mut engine);

    let borrowing = engine
        .world()
        .instances()
        .find(|i| i.template == "borrowing")
        .expect("borrowing instance is live");
    let rendered: Vec<String> = borrowing.bindings.values().map(|b| b.to_string()).collect();
    assert_eq!(rendered, ["alice", "dracula", "library"]);

    submit(
        &mut engine,
        request(
            "alice",
            json!({"event": "#return", "refinement": {"item": "dracula"}}),
        ),
    );
    assert_eq!(engine.world().instances().count(), 0);
}

#[test]
fn scenario_deadline_and_fine() {
    let mut engine = engine();
    register_and_borrow(&mut engine);

    submit(&mut engine, json!("#timeout"));

    // d1 is violated but still live.
    let duty_states: Vec<bool> = engine
        .world()
        .frames()
        .filter_map(|f| match &f.detail {
            dpcl_engine::world::FrameDetail::Deontic(state) => Some(state.violated),
            _ => None,
        })
        .collect();
    assert_eq!(duty_states, [true]);

    // The violation armed the fining power.
    submit(
        &mut engine,
        request(
            "library",
            json!({"event": "#fine", "refinement": {"target": "alice"}}),
        ),
    );
    assert!(has(&engine, "alice", "fined"));
}

#[test]
fn scenario_request_return_creates_second_duty() {
    let mut engine = engine();
    register_and_borrow(&mut engine);

    submit(
        &mut engine,
        request(
            "library",
            json!({"event": "#request_return", "refinement": {"item": "dracula"}}),
        ),
    );

    let shown = engine.show("borrowing").expect("show borrowing template");
    assert!(shown.contains("duty d2"));
    assert!(shown.contains("violation: #early_timeout"));
}

#[test]
fn scenario_unauthorized_action_is_noop() {
    let mut engine = engine();

    // bob lacks `student`: nothing matches, nothing changes, no error.
    submit(&mut engine, request("bob", json!("#register")));
    assert!(!has(&engine, "bob", "member"));
    assert!(!engine.show("bob").expect("show bob").contains("member"));
}

#[test]
fn scenario_double_register_is_idempotent() {
    let mut engine = engine();
    submit(&mut engine, request("alice", json!("#register")));
    let frames_after_first = engine.world().frames().count();

    submit(&mut engine, request("alice", json!("#register")));
    assert!(has(&engine, "alice", "member"));
    assert_eq!(engine.world().frames().count(), frames_after_first);
    assert_eq!(
        engine
            .world()
            .descriptors_of(&Value::atomic("alice"))
            .count(),
        2 // student and member, no duplicates
    );
}

#[test]
fn destruction_cascade_leaves_no_owned_frames() {
    let mut engine = engine();
    register_and_borrow(&mut engine);

    let frames_inside: usize = engine
        .world()
        .instances()
        .map(|i| i.scope.frames.len())
        .sum();
    assert_eq!(frames_inside, 4); // d1, p_return, p_request_return, r_violation

    submit(
        &mut engine,
        request(
            "alice",
            json!({"event": "#return", "refinement": {"item": "dracula"}}),
        ),
    );

    // Only the root frames survive; nothing owned by the instance
    // remains and the refined reference no longer resolves.
    assert_eq!(engine.world().frames().count(), 2); // p_register, p_borrow
    let err = engine
        .show(r#"{"object": "borrowing", "refinement": {"lender": "library", "borrower": "alice", "item": "dracula"}}"#)
        .expect_err("instance is gone");
    assert!(!err.to_string().is_empty());
}

#[test]
fn borrow_two_books_two_instances() {
    let mut engine = engine();
    submit(&mut engine, request("alice", json!("#register")));
    for item in ["dracula", "carmilla"] {
        submit(
            &mut engine,
            request(
                "alice",
                json!({"event": "#borrow", "refinement": {"item": item}}),
            ),
        );
    }
    assert_eq!(engine.world().instances().count(), 2);

    submit(
        &mut engine,
        request(
            "alice",
            json!({"event": "#return", "refinement": {"item": "carmilla"}}),
        ),
    );
    let remaining: Vec<String> = engine
        .world()
        .instances()
        .flat_map(|i| i.bindings.values().map(|b| b.to_string()))
        .collect();
    assert!(remaining.contains(&"dracula".to_string()));
    assert!(!remaining.contains(&"carmilla".to_string()));
}

#[test]
fn replay_is_deterministic() {
    let inputs = [
        request("alice", json!("#register")),
        request(
            "alice",
            json!({"event": "#borrow", "refinement": {"item": "dracula"}}),
        ),
        json!("#timeout"),
        request(
            "library",
            json!({"event": "#fine", "refinement": {"target": "alice"}}),
        ),
    ];

    let run = || {
        let mut engine = engine();
        let mut trace = Vec::new();
        for input in &inputs {
            engine.submit_value(input).expect("input processes");
            trace.push(engine.show("alice").expect("show alice"));
            trace.push(engine.show("borrowing").expect("show borrowing"));
        }
        trace
    };

    assert_eq!(run(), run());
}
