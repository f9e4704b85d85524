//! Field coercion applied to raw import records.
//!
//! Each import kind has a table of `(field, rule)` pairs. A record is first
//! given an id, then every rule of its kind is applied in order.

use serde_json::{Number, Value};
use uuid::Uuid;

use crate::models::lenient::{to_number, to_string_list};
use crate::models::{PersonType, Row};

use super::ImportKind;

/// What to do with one field of an incoming record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Scalar wrapped, list kept, absent becomes empty.
    StringList,
    /// Numeric strings parsed, missing or falsy becomes 0.
    Number,
    /// As `Number`, with negatives clamped to 0.
    Hours,
    /// Always 0 regardless of input.
    Zero,
    /// Removed from the record.
    Strip,
}

const PERSON_RULES: &[(&str, Rule)] = &[
    ("teacherIds", Rule::Strip),
    ("assistantIds", Rule::Strip),
    ("sessionCount", Rule::Strip),
    ("totalHours", Rule::Strip),
    ("sequence", Rule::Strip),
    ("durationHours", Rule::Strip),
];

const COURSE_RULES: &[(&str, Rule)] = &[
    ("teacherIds", Rule::StringList),
    ("assistantIds", Rule::StringList),
    ("sessionCount", Rule::Zero),
    ("totalHours", Rule::Zero),
];

const SESSION_RULES: &[(&str, Rule)] = &[
    ("teacherIds", Rule::StringList),
    ("assistantIds", Rule::StringList),
    ("sequence", Rule::Number),
    ("durationHours", Rule::Hours),
];

/// Coercion table for an import kind.
pub fn rules(kind: ImportKind) -> &'static [(&'static str, Rule)] {
    match kind {
        ImportKind::Teachers | ImportKind::Assistants => PERSON_RULES,
        ImportKind::Courses => COURSE_RULES,
        ImportKind::Sessions => SESSION_RULES,
    }
}

/// Subtype tag forced onto person records.
fn person_type(kind: ImportKind) -> Option<PersonType> {
    match kind {
        ImportKind::Teachers => Some(PersonType::Teacher),
        ImportKind::Assistants => Some(PersonType::Assistant),
        ImportKind::Courses | ImportKind::Sessions => None,
    }
}

fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or_else(|| Value::from(0))
    }
}

/// Ensures the record carries a string id, generating one when missing.
///
/// Numeric ids are kept as their string form.
fn ensure_id(record: &mut Row) {
    let id = match record.get("id") {
        Some(Value::String(s)) if !s.is_empty() => return,
        Some(Value::Number(n)) => n.to_string(),
        _ => Uuid::new_v4().to_string(),
    };
    record.insert("id".to_string(), Value::String(id));
}

fn apply_rule(record: &mut Row, field: &str, rule: Rule) {
    match rule {
        Rule::Strip => {
            record.remove(field);
        }
        Rule::Zero => {
            record.insert(field.to_string(), Value::from(0));
        }
        Rule::Number | Rule::Hours => {
            let mut n = record.get(field).map(to_number).unwrap_or(0.0);
            if rule == Rule::Hours {
                n = n.max(0.0);
            }
            record.insert(field.to_string(), number_value(n));
        }
        Rule::StringList => {
            let list = record.get(field).map(to_string_list).unwrap_or_default();
            record.insert(
                field.to_string(),
                Value::Array(list.into_iter().map(Value::String).collect()),
            );
        }
    }
}

/// Normalizes one raw record for `kind`.
pub fn normalize(kind: ImportKind, mut record: Row) -> Row {
    ensure_id(&mut record);
    if let Some(person_type) = person_type(kind) {
        record.insert("type".to_string(), Value::from(person_type.as_str()));
    }
    for (field, rule) in rules(kind) {
        apply_rule(&mut record, field, *rule);
    }
    record
}
