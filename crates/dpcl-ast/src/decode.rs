//! Structural JSON decoding.
//!
//! Program files carry no `"type"` tags; every shape is recognized by
//! its fields. This module is the single place that knows the
//! dispatch table:
//!
//! | Keys present | Decoded as |
//! |--------------|------------|
//! | `atomics` | atomic declarations |
//! | `import` | import directive |
//! | `event` + `reaction` | reactive rule |
//! | `condition` + `conclusion` | transformational rule |
//! | `position` | power or deontic frame (by keyword) |
//! | `object` + `params` | compound template |
//! | `object` + `content` | static object |
//! | `object` + `refinement` | refined object reference |
//! | `scope` + `name` | scoped object reference |
//! | `agent` + `action` | action request |
//! | `plus` / `minus` | production event |
//! | `entity` + `gains` | naming event |
//! | `entity` + `has` | descriptor condition |
//! | `negate` | negation |
//! | `"#tag"` string | atomic event |
//! | other string | object reference |

use dpcl_types::{name, Span};
use serde_json::{Map, Value};

use crate::boolean::BoolExpr;
use crate::directive::{CompoundTemplate, Directive, DirectiveKind, ObjectDecl, Program};
use crate::error::ParseError;
use crate::event::{Event, ProductionObject};
use crate::frame::{
    Conclusion, DeonticFrame, DeonticPosition, FrameLiteral, PowerFrame, PowerPosition,
    ReactiveRule, TransformationalRule, Trigger,
};
use crate::term::{ObjectRef, RefTerm, Refinement};

type JsonMap = Map<String, Value>;

/// Decodes a whole program from its JSON root.
///
/// # Errors
///
/// Returns the first [`ParseError`] encountered, with a span naming
/// the offending directive and path.
pub fn program(value: &Value) -> Result<Program, ParseError> {
    let Value::Array(items) = value else {
        return Err(ParseError::RootNotArray);
    };

    let directives = items
        .iter()
        .enumerate()
        .map(|(i, item)| directive(item, Span::directive(i)))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Program { directives })
}

/// Decodes one directive.
pub fn directive(value: &Value, span: Span) -> Result<Directive, ParseError> {
    let kind = match value {
        Value::String(_) => DirectiveKind::Occur(event(value, &span)?),
        Value::Object(map) => directive_kind(map, &span)?,
        _ => {
            return Err(ParseError::ExpectedType {
                span,
                expected: "directive object or event string",
            })
        }
    };

    Ok(Directive { kind, span })
}

fn directive_kind(map: &JsonMap, span: &Span) -> Result<DirectiveKind, ParseError> {
    if map.contains_key("atomics") {
        return atomics(map, span).map(DirectiveKind::Atomics);
    }
    if map.contains_key("import") {
        let name = str_field(map, "import", span)?;
        check_name(&name, &span.child("import"))?;
        let alias = alias_field(map, span)?;
        return Ok(DirectiveKind::Import { name, alias });
    }
    if map.contains_key("reaction") {
        if !map.contains_key("event") {
            return Err(ParseError::MissingRuleEvent { span: span.clone() });
        }
        return reactive_rule(map, span).map(DirectiveKind::Reactive);
    }
    if map.contains_key("condition") || map.contains_key("conclusion") {
        return transformational_rule(map, span).map(DirectiveKind::Transformational);
    }
    if map.contains_key("position") {
        return positioned_frame(map, span).map(|lit| match lit {
            FrameLiteral::Power(p) => DirectiveKind::Power(p),
            FrameLiteral::Deontic(d) => DirectiveKind::Deontic(d),
            // positioned_frame only builds these two
            FrameLiteral::Reactive(_) | FrameLiteral::Transformational(_) => unreachable!(),
        });
    }
    if map.contains_key("object") && !map.contains_key("refinement") {
        return compound_or_object(map, span);
    }
    if map.contains_key("plus")
        || map.contains_key("minus")
        || map.contains_key("entity")
        || map.contains_key("agent")
        || map.contains_key("event")
    {
        return Ok(DirectiveKind::Occur(event(&Value::Object(map.clone()), span)?));
    }

    Err(ParseError::UnrecognizedShape { span: span.clone() })
}

fn atomics(map: &JsonMap, span: &Span) -> Result<Vec<String>, ParseError> {
    let span = span.child("atomics");
    let Some(Value::Array(items)) = map.get("atomics") else {
        return Err(ParseError::ExpectedType {
            span,
            expected: "array of names",
        });
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let item_span = span.index(i);
            let Value::String(s) = item else {
                return Err(ParseError::ExpectedType {
                    span: item_span,
                    expected: "name string",
                });
            };
            check_name(s, &item_span)?;
            Ok(s.clone())
        })
        .collect()
}

fn compound_or_object(map: &JsonMap, span: &Span) -> Result<DirectiveKind, ParseError> {
    let name = str_field(map, "object", span)?;
    check_name(&name, &span.child("object"))?;

    let content = content_field(map, span)?;
    let initial_descriptors = initial_descriptors_field(map, span)?;

    match map.get("params") {
        Some(value) => {
            let params_span = span.child("params");
            let Value::Array(items) = value else {
                return Err(ParseError::ExpectedType {
                    span: params_span,
                    expected: "array of parameter names",
                });
            };
            let params = items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    let item_span = params_span.index(i);
                    let Value::String(s) = item else {
                        return Err(ParseError::ExpectedType {
                            span: item_span,
                            expected: "parameter name string",
                        });
                    };
                    check_name(s, &item_span)?;
                    Ok(s.clone())
                })
                .collect::<Result<Vec<_>, _>>()?;

            Ok(DirectiveKind::Compound(CompoundTemplate {
                name,
                params,
                content,
                initial_descriptors,
            }))
        }
        None => Ok(DirectiveKind::Object(ObjectDecl {
            name,
            content,
            initial_descriptors,
        })),
    }
}

fn content_field(map: &JsonMap, span: &Span) -> Result<Vec<Directive>, ParseError> {
    let content_span = span.child("content");
    match map.get("content") {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| directive(item, content_span.index(i)))
            .collect(),
        Some(_) => Err(ParseError::ExpectedType {
            span: content_span,
            expected: "array of directives",
        }),
    }
}

fn initial_descriptors_field(map: &JsonMap, span: &Span) -> Result<Vec<ObjectRef>, ParseError> {
    let field_span = span.child("initial_descriptors");
    match map.get("initial_descriptors") {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| object_ref(item, &field_span.index(i)))
            .collect(),
        Some(_) => Err(ParseError::ExpectedType {
            span: field_span,
            expected: "array of object references",
        }),
    }
}

/// Decodes a power or deontic frame by its `position` keyword.
pub fn positioned_frame(map: &JsonMap, span: &Span) -> Result<FrameLiteral, ParseError> {
    let position = str_field(map, "position", span)?;

    if let Some(position) = PowerPosition::from_keyword(&position) {
        return power_frame(map, span, position).map(FrameLiteral::Power);
    }
    if let Some(position) = DeonticPosition::from_keyword(&position) {
        return deontic_frame(map, span, position).map(FrameLiteral::Deontic);
    }

    Err(ParseError::UnknownPosition {
        span: span.child("position"),
        position,
    })
}

fn power_frame(
    map: &JsonMap,
    span: &Span,
    position: PowerPosition,
) -> Result<PowerFrame, ParseError> {
    let holder = match map.get("holder") {
        Some(value) => object_ref(value, &span.child("holder"))?,
        None => ObjectRef::name(name::WILDCARD),
    };
    let action = event(field(map, "action", span)?, &span.child("action"))?;
    let consequence = event(field(map, "consequence", span)?, &span.child("consequence"))?;

    Ok(PowerFrame {
        position,
        holder,
        action,
        consequence: Box::new(consequence),
        alias: alias_field(map, span)?,
    })
}

fn deontic_frame(
    map: &JsonMap,
    span: &Span,
    position: DeonticPosition,
) -> Result<DeonticFrame, ParseError> {
    let holder = match map.get("holder") {
        Some(value) => object_ref(value, &span.child("holder"))?,
        None => ObjectRef::name(name::WILDCARD),
    };
    let counterparty = map
        .get("counterparty")
        .map(|value| object_ref(value, &span.child("counterparty")))
        .transpose()?;
    let action = event(field(map, "action", span)?, &span.child("action"))?;

    let trigger_field = |key: &'static str| -> Result<Option<Trigger>, ParseError> {
        map.get(key)
            .map(|value| trigger(value, &span.child(key)))
            .transpose()
    };

    Ok(DeonticFrame {
        position,
        holder,
        counterparty,
        action,
        violation: trigger_field("violation")?,
        fulfillment: trigger_field("fulfillment")?,
        termination: trigger_field("termination")?,
        alias: alias_field(map, span)?,
    })
}

fn reactive_rule(map: &JsonMap, span: &Span) -> Result<ReactiveRule, ParseError> {
    let pattern = event(field(map, "event", span)?, &span.child("event"))?;
    let reaction = event(field(map, "reaction", span)?, &span.child("reaction"))?;

    Ok(ReactiveRule {
        event: pattern,
        reaction: Box::new(reaction),
        alias: alias_field(map, span)?,
    })
}

fn transformational_rule(
    map: &JsonMap,
    span: &Span,
) -> Result<TransformationalRule, ParseError> {
    let condition = bool_expr(field(map, "condition", span)?, &span.child("condition"))?;
    let conclusion = conclusion(field(map, "conclusion", span)?, &span.child("conclusion"))?;

    Ok(TransformationalRule {
        condition,
        conclusion,
        alias: alias_field(map, span)?,
    })
}

fn conclusion(value: &Value, span: &Span) -> Result<Conclusion, ParseError> {
    let Value::Object(map) = value else {
        return Err(ParseError::ExpectedType {
            span: span.clone(),
            expected: "naming event or descriptor condition",
        });
    };

    let entity = object_ref(field(map, "entity", span)?, &span.child("entity"))?;
    let descriptor = object_ref(field(map, "descriptor", span)?, &span.child("descriptor"))?;

    if let Some(gains) = map.get("gains") {
        let gains = bool_value(gains, &span.child("gains"))?;
        return Ok(Conclusion::Naming {
            entity,
            descriptor,
            gains,
        });
    }
    if let Some(has) = map.get("has") {
        let has = bool_value(has, &span.child("has"))?;
        return Ok(Conclusion::Holds {
            entity,
            descriptor,
            has,
        });
    }

    Err(ParseError::MissingField {
        span: span.clone(),
        field: "gains",
    })
}

/// Decodes an event term.
pub fn event(value: &Value, span: &Span) -> Result<Event, ParseError> {
    match value {
        Value::String(s) => {
            if !name::is_valid_event_tag(s) {
                return Err(ParseError::InvalidTag {
                    span: span.clone(),
                    tag: s.clone(),
                });
            }
            Ok(Event::Atomic { tag: s.clone() })
        }
        Value::Object(map) => event_from_map(map, span),
        _ => Err(ParseError::ExpectedType {
            span: span.clone(),
            expected: "event",
        }),
    }
}

fn event_from_map(map: &JsonMap, span: &Span) -> Result<Event, ParseError> {
    if map.contains_key("event") {
        let tag = str_field(map, "event", span)?;
        if !name::is_valid_event_tag(&tag) {
            return Err(ParseError::InvalidTag {
                span: span.child("event"),
                tag,
            });
        }
        let refinement = match map.get("refinement") {
            Some(value) => refinement(value, &span.child("refinement"))?,
            None => Refinement::new(),
        };
        return Ok(Event::Refined {
            tag,
            refinement,
            alias: alias_field(map, span)?,
        });
    }

    if map.contains_key("agent") {
        let agent = object_ref(field(map, "agent", span)?, &span.child("agent"))?;
        let action = event(field(map, "action", span)?, &span.child("action"))?;
        return Ok(Event::Request {
            agent,
            action: Box::new(action),
        });
    }

    for (key, gains) in [("plus", true), ("minus", false)] {
        if let Some(value) = map.get(key) {
            let object = production_object(value, &span.child(key))?;
            return Ok(Event::Production { object, gains });
        }
    }

    if map.contains_key("entity") {
        let entity = object_ref(field(map, "entity", span)?, &span.child("entity"))?;
        let descriptor =
            object_ref(field(map, "descriptor", span)?, &span.child("descriptor"))?;
        let gains = bool_value(field(map, "gains", span)?, &span.child("gains"))?;
        return Ok(Event::Naming {
            entity,
            descriptor,
            gains,
        });
    }

    Err(ParseError::UnrecognizedShape { span: span.clone() })
}

fn production_object(value: &Value, span: &Span) -> Result<ProductionObject, ParseError> {
    if let Value::Object(map) = value {
        if map.contains_key("position") {
            return positioned_frame(map, span)
                .map(|frame| ProductionObject::Frame(Box::new(frame)));
        }
        if map.contains_key("reaction") {
            if !map.contains_key("event") {
                return Err(ParseError::MissingRuleEvent { span: span.clone() });
            }
            return reactive_rule(map, span)
                .map(|rule| ProductionObject::Frame(Box::new(FrameLiteral::Reactive(rule))));
        }
        if map.contains_key("condition") {
            return transformational_rule(map, span).map(|rule| {
                ProductionObject::Frame(Box::new(FrameLiteral::Transformational(rule)))
            });
        }
    }

    object_ref(value, span).map(ProductionObject::Ref)
}

/// Decodes an object reference.
pub fn object_ref(value: &Value, span: &Span) -> Result<ObjectRef, ParseError> {
    match value {
        Value::String(s) => {
            if !name::is_well_formed(s) && !name::is_reserved(s) {
                return Err(ParseError::InvalidName {
                    span: span.clone(),
                    name: s.clone(),
                });
            }
            Ok(ObjectRef::Name(s.clone()))
        }
        Value::Object(map) => {
            if map.contains_key("scope") {
                let scope = object_ref(field(map, "scope", span)?, &span.child("scope"))?;
                let name = object_ref(field(map, "name", span)?, &span.child("name"))?;
                return Ok(ObjectRef::Scoped {
                    scope: Box::new(scope),
                    name: Box::new(name),
                });
            }
            if map.contains_key("object") {
                let object = str_field(map, "object", span)?;
                check_name(&object, &span.child("object"))?;
                let refinement = match map.get("refinement") {
                    Some(value) => refinement(value, &span.child("refinement"))?,
                    None => Refinement::new(),
                };
                return Ok(ObjectRef::Refined {
                    object,
                    refinement,
                    alias: alias_field(map, span)?,
                });
            }
            Err(ParseError::UnrecognizedShape { span: span.clone() })
        }
        _ => Err(ParseError::ExpectedType {
            span: span.clone(),
            expected: "object reference",
        }),
    }
}

fn refinement(value: &Value, span: &Span) -> Result<Refinement, ParseError> {
    let Value::Object(map) = value else {
        return Err(ParseError::ExpectedType {
            span: span.clone(),
            expected: "refinement object",
        });
    };

    map.iter()
        .map(|(key, value)| {
            let value_span = span.child(key);
            check_name(key, &value_span)?;
            let term = ref_term(value, &value_span)?;
            Ok((key.clone(), term))
        })
        .collect()
}

fn ref_term(value: &Value, span: &Span) -> Result<RefTerm, ParseError> {
    match value {
        Value::String(s) if s.starts_with('#') => event(value, span).map(RefTerm::Event),
        Value::Object(map) if map.contains_key("event") => {
            event(value, span).map(RefTerm::Event)
        }
        _ => object_ref(value, span).map(RefTerm::Object),
    }
}

/// Decodes a boolean expression.
pub fn bool_expr(value: &Value, span: &Span) -> Result<BoolExpr, ParseError> {
    match value {
        Value::Bool(b) => Ok(BoolExpr::Literal(*b)),
        Value::Object(map) if map.contains_key("negate") => {
            let inner = bool_expr(field(map, "negate", span)?, &span.child("negate"))?;
            Ok(BoolExpr::Negate(Box::new(inner)))
        }
        Value::Object(map) if map.contains_key("has") => {
            let entity = object_ref(field(map, "entity", span)?, &span.child("entity"))?;
            let descriptor =
                object_ref(field(map, "descriptor", span)?, &span.child("descriptor"))?;
            let has = bool_value(field(map, "has", span)?, &span.child("has"))?;
            Ok(BoolExpr::Descriptor {
                entity,
                descriptor,
                has,
            })
        }
        _ => object_ref(value, span).map(BoolExpr::Ref),
    }
}

/// Decodes a deontic trigger: `{"event": ..}`, a bare event shape,
/// or a boolean expression.
pub fn trigger(value: &Value, span: &Span) -> Result<Trigger, ParseError> {
    match value {
        Value::Bool(_) => bool_expr(value, span).map(Trigger::Condition),
        Value::String(s) if s.starts_with('#') => event(value, span).map(Trigger::Event),
        Value::String(_) => bool_expr(value, span).map(Trigger::Condition),
        Value::Object(map) => {
            if map.contains_key("event") && !map.contains_key("refinement") {
                // {"event": <event>} wrapper
                return event(field(map, "event", span)?, &span.child("event"))
                    .map(Trigger::Event);
            }
            if map.contains_key("event")
                || map.contains_key("plus")
                || map.contains_key("minus")
                || map.contains_key("gains")
                || map.contains_key("agent")
            {
                return event(value, span).map(Trigger::Event);
            }
            bool_expr(value, span).map(Trigger::Condition)
        }
        _ => Err(ParseError::ExpectedType {
            span: span.clone(),
            expected: "event pattern or boolean expression",
        }),
    }
}

// ─── helpers ────────────────────────────────────────────────────────

fn field<'a>(map: &'a JsonMap, key: &'static str, span: &Span) -> Result<&'a Value, ParseError> {
    map.get(key).ok_or_else(|| ParseError::MissingField {
        span: span.clone(),
        field: key,
    })
}

fn str_field(map: &JsonMap, key: &'static str, span: &Span) -> Result<String, ParseError> {
    match field(map, key, span)? {
        Value::String(s) => Ok(s.clone()),
        _ => Err(ParseError::ExpectedType {
            span: span.child(key),
            expected: "string",
        }),
    }
}

fn alias_field(map: &JsonMap, span: &Span) -> Result<Option<String>, ParseError> {
    match map.get("alias") {
        None => Ok(None),
        Some(Value::String(s)) => {
            check_name(s, &span.child("alias"))?;
            Ok(Some(s.clone()))
        }
        Some(_) => Err(ParseError::ExpectedType {
            span: span.child("alias"),
            expected: "alias string",
        }),
    }
}

fn bool_value(value: &Value, span: &Span) -> Result<bool, ParseError> {
    match value {
        Value::Bool(b) => Ok(*b),
        _ => Err(ParseError::ExpectedType {
            span: span.clone(),
            expected: "boolean",
        }),
    }
}

/// Syntactic name check. Reserved keywords pass here (`self` is a
/// well-formed name); the loader rejects them in assignable
/// positions so that the error kind distinguishes shape from misuse.
fn check_name(s: &str, span: &Span) -> Result<(), ParseError> {
    if name::is_well_formed(s) {
        Ok(())
    } else {
        Err(ParseError::InvalidName {
            span: span.clone(),
            name: s.to_string(),
        })
    }
}
