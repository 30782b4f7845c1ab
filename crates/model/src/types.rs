//! Type kinds known to the validation pipeline.
//!
//! The set of kinds is closed. Extensions specialise a kind through open
//! string *formats* (`string` + `email`, `date` + `created-at`, ...), never
//! by introducing new kinds.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ModelError;

// ============================================================================
// TYPE KIND
// ============================================================================

/// The runtime type a model node declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    /// Any non-null value. Used as the neutral parent of conditional nodes.
    Any,
    /// A JSON object with named children.
    Object,
    /// A JSON array whose elements share one child model.
    Array,
    String,
    /// Any JSON number, integral or not.
    Number,
    /// A JSON number representable as `i64` or `u64`.
    Integer,
    Boolean,
    /// An RFC 3339 date-time string.
    Date,
}

impl TypeKind {
    /// Every kind, in declaration order.
    pub const ALL: [TypeKind; 8] = [
        TypeKind::Any,
        TypeKind::Object,
        TypeKind::Array,
        TypeKind::String,
        TypeKind::Number,
        TypeKind::Integer,
        TypeKind::Boolean,
        TypeKind::Date,
    ];

    /// Canonical lowercase name, also used as the builder name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            TypeKind::Any => "any",
            TypeKind::Object => "object",
            TypeKind::Array => "array",
            TypeKind::String => "string",
            TypeKind::Number => "number",
            TypeKind::Integer => "integer",
            TypeKind::Boolean => "boolean",
            TypeKind::Date => "date",
        }
    }

    /// Whether nodes of this kind may carry children.
    #[must_use]
    pub const fn is_composite(self) -> bool {
        matches!(self, TypeKind::Object | TypeKind::Array)
    }

    /// Checks whether `value` already has this runtime type.
    ///
    /// Arrays are never objects and `null` only matches through the
    /// nullable flag, which the presence phase handles before this check.
    #[must_use]
    pub fn matches(self, value: &Value) -> bool {
        match self {
            TypeKind::Any => !value.is_null(),
            TypeKind::Object => value.is_object(),
            TypeKind::Array => value.is_array(),
            TypeKind::String => value.is_string(),
            TypeKind::Number => value.is_number(),
            TypeKind::Integer => value.is_i64() || value.is_u64(),
            TypeKind::Boolean => value.is_boolean(),
            TypeKind::Date => value.as_str().is_some_and(|s| parse_rfc3339(s).is_some()),
        }
    }
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypeKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TypeKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ModelError::UnknownType { name: s.to_owned() })
    }
}

// ============================================================================
// RUNTIME TYPE NAMES
// ============================================================================

/// Name of the runtime type of a JSON value, as reported in type mismatches.
#[must_use]
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// DATES
// ============================================================================

/// Parses a strict RFC 3339 date-time into UTC.
#[must_use]
pub fn parse_rfc3339(input: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(input)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parses the date shapes accepted by date coercion.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` (both read
/// as UTC), a bare `YYYY-MM-DD` (midnight UTC) and a string of epoch
/// milliseconds.
#[must_use]
pub fn parse_date_lenient(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if let Some(dt) = parse_rfc3339(input) {
        return Some(dt);
    }
    for pattern in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, pattern) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    input
        .parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
}

/// Formats a timestamp in the canonical date representation
/// (`2024-05-01T12:00:00.000Z`).
#[must_use]
pub fn format_date(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}
