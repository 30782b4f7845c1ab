//! `min`, `max` and `pattern` constraints.
//!
//! Bounds are stored in the model's extra data under `"min"` and `"max"` and
//! enforced by the default validate handlers of this extension: numeric range
//! for `number`/`integer`, character count for `string`, item count for
//! `array`. A model built from a context without this extension keeps the
//! data but does not enforce it.

use regex::Regex;
use serde_json::{Value, json};

use crate::error::{IssueKind, ModelError, Violation};
use crate::extension::Extension;
use crate::model::Model;
use crate::result::ValidationResult;
use crate::spec::ModelSpec;
use crate::types::TypeKind;

/// The `constraints` extension.
#[must_use]
pub fn constraints() -> Extension {
    Extension::new("constraints")
        .with_validation(TypeKind::Number, None, check_range)
        .with_validation(TypeKind::Integer, None, check_range)
        .with_validation(TypeKind::String, None, check_length)
        .with_validation(TypeKind::Array, None, check_length)
        .with_extend("min", |model, arg| {
            Ok(model.min(number_argument("min", arg)?))
        })
        .with_extend("max", |model, arg| {
            Ok(model.max(number_argument("max", arg)?))
        })
        .with_extend("pattern", |model, arg| {
            let pattern = arg.as_str().ok_or_else(|| ModelError::InvalidArgument {
                name: "pattern".into(),
                reason: "expected a string".into(),
            })?;
            model.pattern(pattern)
        })
}

/// Constraint builders on [`Model`].
///
/// ```
/// use mosaic_model::{ConstraintExt, ModelContext};
/// use serde_json::json;
///
/// let ctx = ModelContext::create();
/// let code = ctx.string().length(2, 3).pattern("^[A-Z]+$")?;
/// assert!(code.validate(json!("EUR")).conforms());
/// assert!(!code.validate(json!("euro")).conforms());
/// # Ok::<(), mosaic_model::ModelError>(())
/// ```
pub trait ConstraintExt: Sized {
    /// Lower bound: value for numbers, length for strings and arrays.
    fn min(self, min: f64) -> Self;

    /// Upper bound: value for numbers, length for strings and arrays.
    fn max(self, max: f64) -> Self;

    /// Both length bounds at once.
    fn length(self, min: usize, max: usize) -> Self;

    /// Requires string values to match `pattern`.
    fn pattern(self, pattern: &str) -> Result<Self, ModelError>;
}

impl ConstraintExt for Model {
    fn min(self, min: f64) -> Self {
        self.extra("min", min)
    }

    fn max(self, max: f64) -> Self {
        self.extra("max", max)
    }

    fn length(self, min: usize, max: usize) -> Self {
        self.min(min as f64).max(max as f64)
    }

    fn pattern(self, pattern: &str) -> Result<Self, ModelError> {
        let regex = Regex::new(pattern).map_err(|err| ModelError::InvalidPattern {
            pattern: pattern.to_owned(),
            reason: err.to_string(),
        })?;
        Ok(self
            .extra("pattern", pattern)
            .validations(move |result| match result.current().as_str() {
                Some(text) if !regex.is_match(text) => Err(Violation::new(
                    IssueKind::FormatViolation,
                    format!("must match pattern `{}`", regex.as_str()),
                )
                .with_expected(regex.as_str())
                .with_actual(text)),
                _ => Ok(()),
            }))
    }
}

fn number_argument(name: &str, arg: &Value) -> Result<f64, ModelError> {
    arg.as_f64().ok_or_else(|| ModelError::InvalidArgument {
        name: name.to_owned(),
        reason: format!("expected a number, got {arg}"),
    })
}

fn bounds(spec: &ModelSpec) -> (Option<f64>, Option<f64>) {
    let get = |key| spec.extra(key).and_then(Value::as_f64);
    (get("min"), get("max"))
}

fn check_range(spec: &ModelSpec, result: &ValidationResult) -> Result<(), Violation> {
    let Some(n) = result.current().as_f64() else {
        return Ok(());
    };
    check_bounds(spec, result, n, None)
}

fn check_length(spec: &ModelSpec, result: &ValidationResult) -> Result<(), Violation> {
    let (len, unit) = match result.current() {
        Value::String(text) => (text.chars().count(), "character"),
        Value::Array(items) => (items.len(), "item"),
        _ => return Ok(()),
    };
    check_bounds(spec, result, len as f64, Some(unit))
}

fn check_bounds(
    spec: &ModelSpec,
    result: &ValidationResult,
    n: f64,
    unit: Option<&str>,
) -> Result<(), Violation> {
    let (min, max) = bounds(spec);
    let violation = match (min, max) {
        (Some(min), _) if n < min => format!("must be at least {}", counted(min, unit)),
        (_, Some(max)) if n > max => format!("must be at most {}", counted(max, unit)),
        _ => return Ok(()),
    };
    Err(Violation::range(violation)
        .with_expected(json!({"min": min, "max": max}))
        .with_actual(result.current().clone()))
}

/// `3 items`, `1 item`, or the bare bound for numbers.
fn counted(bound: f64, unit: Option<&str>) -> String {
    match unit {
        Some(unit) if bound == 1.0 => format!("{bound} {unit}"),
        Some(unit) => format!("{bound} {unit}s"),
        None => bound.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ModelContext;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn first_message(model: &Model, input: Value) -> Option<String> {
        model
            .validate(input)
            .errors()
            .first()
            .map(|issue| issue.message.clone())
    }

    #[rstest]
    #[case(json!(2), Some("must be at least 3"))]
    #[case(json!(3), None)]
    #[case(json!(10), None)]
    #[case(json!(10.5), Some("must be at most 10"))]
    fn number_range(#[case] input: Value, #[case] expected: Option<&str>) {
        let ctx = ModelContext::create();
        let model = ctx.number().min(3.0).max(10.0);
        assert_eq!(first_message(&model, input).as_deref(), expected);
    }

    #[test]
    fn string_length_counts_characters() {
        let ctx = ModelContext::create();
        let model = ctx.string().length(2, 4);
        assert_eq!(first_message(&model, json!("héé")), None);
        assert_eq!(
            first_message(&model, json!("a")).as_deref(),
            Some("must be at least 2 characters")
        );
        assert_eq!(
            first_message(&model, json!("abcde")).as_deref(),
            Some("must be at most 4 characters")
        );
    }

    #[test]
    fn array_length_counts_items() {
        let ctx = ModelContext::create();
        let model = ctx.array_of(ctx.integer()).min(1.0);
        let result = model.validate(json!([]));
        assert_eq!(result.errors().len(), 1);
        assert_eq!(result.errors()[0].kind, IssueKind::RangeViolation);
        assert_eq!(result.errors()[0].message, "must be at least 1 item");
    }

    #[rstest]
    #[case(json!(["a"]), Some("must be at least 2 items"))]
    #[case(json!(["a", "b", "c", "d"]), Some("must be at most 3 items"))]
    #[case(json!("x"), Some("must be at least 2 characters"))]
    #[case(json!("abcd"), Some("must be at most 3 characters"))]
    fn length_units_are_pluralised(#[case] input: Value, #[case] expected: Option<&str>) {
        let ctx = ModelContext::create();
        let model = if input.is_array() {
            ctx.array_of(ctx.string()).length(2, 3)
        } else {
            ctx.string().length(2, 3)
        };
        assert_eq!(first_message(&model, input).as_deref(), expected);
    }

    #[test]
    fn single_character_bound_is_singular() {
        let ctx = ModelContext::create();
        let model = ctx.string().max(1.0);
        assert_eq!(
            first_message(&model, json!("ab")).as_deref(),
            Some("must be at most 1 character")
        );
    }

    #[test]
    fn range_issue_carries_bounds() {
        let ctx = ModelContext::create();
        let result = ctx.integer().min(0.0).validate(json!(-1));
        let issue = &result.errors()[0];
        assert_eq!(issue.expected, Some(json!({"min": 0.0, "max": null})));
        assert_eq!(issue.actual, Some(json!(-1)));
    }

    #[test]
    fn pattern_reports_format_violation() {
        let ctx = ModelContext::create();
        let model = ctx.string().pattern(r"^\d{4}$").unwrap();
        assert!(model.validate(json!("2024")).conforms());

        let result = model.validate(json!("24"));
        assert_eq!(result.errors()[0].kind, IssueKind::FormatViolation);
        assert_eq!(result.errors()[0].message, r"must match pattern `^\d{4}$`");
        assert_eq!(model.spec().extra("pattern"), Some(&json!(r"^\d{4}$")));
    }

    #[test]
    fn invalid_pattern_fails_at_build_time() {
        let ctx = ModelContext::create();
        assert!(matches!(
            ctx.string().pattern("(unclosed"),
            Err(ModelError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn extend_hooks_match_the_trait() {
        let ctx = ModelContext::create();
        let via_hook = ctx
            .string()
            .extend("min", &json!(2))
            .unwrap()
            .extend("pattern", &json!("^a"))
            .unwrap();
        let via_trait = ctx.string().min(2.0).pattern("^a").unwrap();

        assert_eq!(via_hook.describe(), via_trait.describe());
        assert_eq!(
            first_message(&via_hook, json!("b")),
            first_message(&via_trait, json!("b"))
        );
        assert!(matches!(
            ctx.string().extend("max", &json!("ten")),
            Err(ModelError::InvalidArgument { .. })
        ));
        assert!(matches!(
            ctx.string().extend("pattern", &json!(5)),
            Err(ModelError::InvalidArgument { .. })
        ));
    }
}
