//! Matcher evaluation: turns a (property, coerced values) pair into a
//! predicate over an object's JSON body.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::entities::StixObject;
use crate::time::parse_timestamp;
use super::coerce::{CoercedValue, value_matches};
use super::tables::{CalcOp, FilterInfo, MatcherKind};

/// One instantiated matcher: a recognized filter name paired with its
/// coerced query values.
#[derive(Debug, Clone)]
pub struct PropMatcher {
    pub name: String,
    pub info: &'static FilterInfo,
    pub values: Vec<CoercedValue>,
}

/// Does `object` satisfy every matcher (AND semantics)?
#[must_use]
pub fn object_passes(object: &StixObject, matchers: &[PropMatcher]) -> bool {
    matchers.iter().all(|m| matcher_matches(object, m))
}

fn matcher_matches(object: &StixObject, m: &PropMatcher) -> bool {
    if m.name == "added_after" {
        return added_after_matches(object.meta.date_added, &m.values);
    }
    match m.info.kind {
        MatcherKind::TopLevel => top_level_matches(&object.body, m.info.property, &m.values, m.info.default.as_ref()),
        MatcherKind::SubProperty => sub_property_matches(&object.body, m.info.property, &m.values),
        MatcherKind::Tlp => tlp_matches(&object.body, &m.values),
        MatcherKind::RelationshipsAll => relationships_all_matches(&object.body, &m.values),
        MatcherKind::Calculation(op) => calculation_matches(&object.body, m.info.property, op, &m.values),
    }
}

fn added_after_matches(date_added: DateTime<Utc>, values: &[CoercedValue]) -> bool {
    let min_ts = values.iter().filter_map(|v| match v {
        CoercedValue::Timestamp(ts) => Some(*ts),
        _ => None,
    });
    match min_ts.min() {
        Some(min) => date_added > min,
        None => false,
    }
}

/// Scalar or list-valued top-level property lookup. A missing property
/// matches only if the filter carries a `default` and that default is among
/// the query values (e.g. `revoked` defaults to `false`). List elements that
/// are themselves objects are probed through a small set of conventional
/// reference keys (`marking_ref`, `source_name`, `external_id`, `id`,
/// `phase_name`) since STIX list-of-object properties
/// (`external_references`, `granular_markings`, `kill_chain_phases`, …) do
/// not share one common key name.
fn top_level_matches(body: &Value, prop: &str, values: &[CoercedValue], default: Option<&CoercedValue>) -> bool {
    let Some(found) = body.get(prop) else {
        return default.is_some_and(|d| values.iter().any(|cv| cv == d));
    };
    match found {
        Value::Array(items) => items.iter().any(|item| element_matches(item, values)),
        scalar => values.iter().any(|cv| value_matches(scalar, cv)),
    }
}

fn element_matches(item: &Value, values: &[CoercedValue]) -> bool {
    if item.is_object() {
        const REF_KEYS: &[&str] = &["marking_ref", "source_name", "external_id", "id", "phase_name"];
        REF_KEYS.iter().any(|key| {
            item.get(key)
                .is_some_and(|sub| values.iter().any(|cv| value_matches(sub, cv)))
        })
    } else {
        values.iter().any(|cv| value_matches(item, cv))
    }
}

/// Depth-first search for every non-array occurrence of `prop` anywhere
/// below the object's top level. List values of the matched property are
/// containers to recurse into, never matchable values themselves. A
/// top-level occurrence of `prop` is deliberately excluded — that's what
/// `TopLevel` matchers are for.
fn sub_property_matches(body: &Value, prop: &str, values: &[CoercedValue]) -> bool {
    collect_scalar_occurrences(body, prop)
        .into_iter()
        .any(|found| values.iter().any(|cv| value_matches(found, cv)))
}

/// Like [`walk_for_property`] but starts the descent one level below `value`
/// itself, so a direct key of `value` is never reported as a match.
fn collect_scalar_occurrences<'a>(value: &'a Value, prop: &str) -> Vec<&'a Value> {
    let mut out = Vec::new();
    match value {
        Value::Object(map) => {
            for v in map.values() {
                walk_for_property(v, prop, &mut out);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk_for_property(item, prop, &mut out);
            }
        }
        _ => {}
    }
    out
}

fn walk_for_property<'a>(value: &'a Value, prop: &str, out: &mut Vec<&'a Value>) {
    match value {
        Value::Object(map) => {
            if let Some(found) = map.get(prop) {
                if !found.is_array() {
                    out.push(found);
                }
            }
            for v in map.values() {
                walk_for_property(v, prop, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk_for_property(item, prop, out);
            }
        }
        _ => {}
    }
}

fn tlp_matches(body: &Value, values: &[CoercedValue]) -> bool {
    let mut refs: Vec<&str> = Vec::new();
    if let Some(items) = body.get("object_marking_refs").and_then(Value::as_array) {
        refs.extend(items.iter().filter_map(Value::as_str));
    }
    if let Some(items) = body.get("granular_markings").and_then(Value::as_array) {
        refs.extend(
            items
                .iter()
                .filter_map(|m| m.get("marking_ref").and_then(Value::as_str)),
        );
    }
    values.iter().any(|cv| match cv {
        CoercedValue::Str(id) => refs.iter().any(|r| r == id),
        _ => false,
    })
}

/// Walk the object for every `*_ref` scalar and every element of every
/// `*_refs` list, returning true if any intersects the query set.
fn relationships_all_matches(body: &Value, values: &[CoercedValue]) -> bool {
    let mut refs = Vec::new();
    collect_refs(body, &mut refs);
    values.iter().any(|cv| match cv {
        CoercedValue::Str(id) => refs.iter().any(|r| r == id),
        _ => false,
    })
}

fn collect_refs<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::Object(map) => {
            for (key, v) in map {
                if key.ends_with("_refs") {
                    if let Some(items) = v.as_array() {
                        out.extend(items.iter().filter_map(Value::as_str));
                    }
                } else if key.ends_with("_ref") {
                    if let Some(s) = v.as_str() {
                        out.push(s);
                    }
                }
                collect_refs(v, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_refs(item, out);
            }
        }
        _ => {}
    }
}

fn calculation_matches(body: &Value, prop: &str, op: CalcOp, values: &[CoercedValue]) -> bool {
    collect_scalar_occurrences(body, prop)
        .into_iter()
        .any(|found| values.iter().any(|cv| compare_satisfies(found, op, cv)))
}

fn compare_satisfies(found: &Value, op: CalcOp, query: &CoercedValue) -> bool {
    match query {
        CoercedValue::Int(qi) => found.as_i64().is_some_and(|fi| match op {
            CalcOp::Gte => fi >= *qi,
            CalcOp::Lte => fi <= *qi,
        }),
        CoercedValue::Timestamp(qt) => found
            .as_str()
            .and_then(|s| parse_timestamp(s).ok())
            .is_some_and(|ft| match op {
                CalcOp::Gte => ft >= *qt,
                CalcOp::Lte => ft <= *qt,
            }),
        _ => false,
    }
}
