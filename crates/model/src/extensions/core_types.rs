//! Builders for every type kind and their default coercions.
//!
//! Coercions only touch values that do not already have the target type, so
//! running them twice changes nothing.

use serde_json::{Number, Value};

use crate::extension::Extension;
use crate::types::{TypeKind, format_date, parse_date_lenient};

/// The `core-types` extension.
#[must_use]
pub fn core_types() -> Extension {
    let mut ext = Extension::new("core-types");
    for kind in TypeKind::ALL {
        ext = ext.with_builder(kind.as_str(), kind, None);
    }
    ext.with_coercion(TypeKind::Number, None, |_, r| to_number(r.current()))
        .with_coercion(TypeKind::Integer, None, |_, r| to_integer(r.current()))
        .with_coercion(TypeKind::Boolean, None, |_, r| to_boolean(r.current()))
        .with_coercion(TypeKind::Date, None, |_, r| to_date(r.current()))
        .with_coercion(TypeKind::Object, None, |_, r| {
            from_json_text(r.current(), TypeKind::Object)
        })
        .with_coercion(TypeKind::Array, None, |_, r| {
            from_json_text(r.current(), TypeKind::Array)
        })
}

fn to_number(value: &Value) -> Option<Value> {
    let text = value.as_str()?.trim();
    if let Ok(int) = text.parse::<i64>() {
        return Some(Value::from(int));
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

fn to_integer(value: &Value) -> Option<Value> {
    match value {
        Value::String(text) => {
            let text = text.trim();
            text.parse::<i64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().and_then(integral))
                .map(Value::from)
        }
        Value::Number(n) if n.is_f64() => n.as_f64().and_then(integral).map(Value::from),
        _ => None,
    }
}

fn integral(float: f64) -> Option<i64> {
    (float.is_finite() && float.fract() == 0.0 && float.abs() < i64::MAX as f64)
        .then_some(float as i64)
}

fn to_boolean(value: &Value) -> Option<Value> {
    match value {
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(Value::Bool(true)),
            "false" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        Value::Number(n) => match n.as_i64() {
            Some(1) => Some(Value::Bool(true)),
            Some(0) => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

fn to_date(value: &Value) -> Option<Value> {
    let parsed = match value {
        Value::String(text) => parse_date_lenient(text)?,
        Value::Number(n) => chrono::DateTime::from_timestamp_millis(n.as_i64()?)?,
        _ => return None,
    };
    let canonical = format_date(&parsed);
    (value.as_str() != Some(canonical.as_str())).then(|| Value::String(canonical))
}

fn from_json_text(value: &Value, kind: TypeKind) -> Option<Value> {
    let text = value.as_str()?;
    serde_json::from_str::<Value>(text)
        .ok()
        .filter(|parsed| kind.matches(parsed))
}
