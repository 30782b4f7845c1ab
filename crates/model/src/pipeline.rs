//! The phase-ordered validation algorithm.
//!
//! Every node runs the same fixed sequence:
//!
//! 1. parse
//! 2. apply default
//! 3. presence
//! 4. coerce (skipped when strict)
//! 5. check type
//! 6. validate
//! 7. recurse into children
//! 8. resolve conditional options
//!
//! A phase that records an issue, or decides the node is done, breaks out of
//! the sequence for that node only. Siblings and the rest of the tree are
//! still validated.

use std::ops::ControlFlow;

use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use crate::error::{IssueKind, Violation};
use crate::model::Model;
use crate::registry::{CapabilityTable, Phase};
use crate::result::ValidationResult;
use crate::spec::{ModelOptions, ModelSpec};
use crate::types::{TypeKind, json_type_name};

type Flow = ControlFlow<()>;

pub(crate) fn validate(model: &Model, input: Option<Value>) -> ValidationResult {
    let mut result = ValidationResult::root(input);
    run_node(model, &mut result);
    debug!(
        kind = %model.kind(),
        issues = result.errors().len(),
        conforms = result.conforms(),
        "validation finished"
    );
    result
}

fn run_node(model: &Model, result: &mut ValidationResult) {
    trace!(path = %result.path(), kind = %model.kind(), "validating node");
    let _ = run_phases(model.spec(), model.capabilities(), result);
}

fn run_phases(spec: &ModelSpec, table: &CapabilityTable, result: &mut ValidationResult) -> Flow {
    parse(spec, table, result);
    apply_default(spec, result);
    check_presence(spec, result)?;
    if !spec.is_strict() {
        coerce(spec, table, result);
    }
    check_type(spec, result)?;
    check_value(spec, table, result)?;
    recurse(spec, result);
    resolve_conditional(spec, result)
}

fn parse(spec: &ModelSpec, table: &CapabilityTable, result: &mut ValidationResult) {
    let handlers = table.transforms(spec.kind(), spec.format(), Phase::Parse);
    for transform in handlers.chain(spec.hooks().parse.as_ref()) {
        if let Some(value) = transform(spec, result) {
            result.set_value(Some(value));
        }
    }
}

fn apply_default(spec: &ModelSpec, result: &mut ValidationResult) {
    if result.value().is_some() {
        return;
    }
    if let Some(default) = spec.default() {
        let value = default.resolve(result);
        result.set_value(Some(value));
    }
}

fn check_presence(spec: &ModelSpec, result: &mut ValidationResult) -> Flow {
    match result.value() {
        None if spec.is_required() => {
            result.push(Violation::new(IssueKind::RequiredValueMissing, "value is required"));
            ControlFlow::Break(())
        }
        None => ControlFlow::Break(()),
        Some(Value::Null) if spec.is_nullable() => ControlFlow::Break(()),
        Some(_) => ControlFlow::Continue(()),
    }
}

fn coerce(spec: &ModelSpec, table: &CapabilityTable, result: &mut ValidationResult) {
    let handlers = table.transforms(spec.kind(), spec.format(), Phase::Coerce);
    for transform in handlers.chain(spec.hooks().coerce.as_ref()) {
        if let Some(value) = transform(spec, result) {
            result.set_value(Some(value));
        }
    }
}

fn check_type(spec: &ModelSpec, result: &mut ValidationResult) -> Flow {
    let kind = spec.kind();
    let value = result.current();
    if kind.matches(value) {
        return ControlFlow::Continue(());
    }
    let actual = json_type_name(value);
    result.push(
        Violation::new(
            IssueKind::TypeMismatch,
            format!("expected {kind}, got {actual}"),
        )
        .with_expected(kind.as_str())
        .with_actual(actual),
    );
    ControlFlow::Break(())
}

fn check_value(spec: &ModelSpec, table: &CapabilityTable, result: &mut ValidationResult) -> Flow {
    if let Some(ModelOptions::Values(values)) = spec.options() {
        if !values.iter().any(|option| same_option(option, result.current())) {
            let allowed = Value::Array(values.to_vec());
            let violation = Violation::new(
                IssueKind::EnumMembershipViolation,
                format!("must be one of {allowed}"),
            )
            .with_expected(allowed)
            .with_actual(result.current().clone());
            result.push(violation);
            return ControlFlow::Break(());
        }
    }

    let assertions = table.assertions(spec.kind(), spec.format());
    for assertion in assertions.chain(&spec.hooks().validate) {
        if let Err(violation) = assertion(spec, result) {
            result.push(violation);
            return ControlFlow::Break(());
        }
    }
    ControlFlow::Continue(())
}

/// Literal option equality. Numbers compare by value, so `1` matches `1.0`.
fn same_option(option: &Value, value: &Value) -> bool {
    match (option, value) {
        (Value::Number(a), Value::Number(b)) if a.is_f64() || b.is_f64() => {
            a.as_f64() == b.as_f64()
        }
        _ => option == value,
    }
}

fn recurse(spec: &ModelSpec, result: &mut ValidationResult) {
    match spec.kind() {
        TypeKind::Object if !spec.children().is_empty() || spec.is_strict() => {
            recurse_object(spec, result);
        }
        TypeKind::Array => {
            if let Some(element) = spec.element() {
                recurse_array(element, result);
            }
        }
        _ => {}
    }
}

fn recurse_object(spec: &ModelSpec, result: &mut ValidationResult) {
    let mut input = match result.take_value() {
        Some(Value::Object(map)) => map,
        other => {
            result.set_value(other);
            return;
        }
    };

    let undeclared: Vec<String> = input
        .keys()
        .filter(|key| spec.property(key).is_none())
        .cloned()
        .collect();

    let mut output = Map::new();
    for child in spec.children() {
        let Some(name) = child.name() else { continue };
        let mut child_result = result.descend(name, input.remove(name));
        run_node(&child.model, &mut child_result);
        if let Some(value) = result.absorb(child_result) {
            output.insert(name.to_owned(), value);
        }
    }

    // The selected branch of a conditional node does its own scan.
    let reject_undeclared = spec.is_strict() && !spec.is_conditional();
    for key in undeclared {
        if reject_undeclared {
            let path = result.path().child(key.as_str());
            result.push_at(
                path,
                Violation::new(
                    IssueKind::UnexpectedProperty,
                    format!("unexpected property \"{key}\""),
                ),
            );
        }
        if let Some(value) = input.remove(&key) {
            output.insert(key, value);
        }
    }

    result.set_value(Some(Value::Object(output)));
}

fn recurse_array(element: &Model, result: &mut ValidationResult) {
    let items = match result.take_value() {
        Some(Value::Array(items)) => items,
        other => {
            result.set_value(other);
            return;
        }
    };

    let mut output = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let mut item_result = result.descend(index, Some(item));
        run_node(element, &mut item_result);
        output.push(result.absorb(item_result).unwrap_or(Value::Null));
    }
    result.set_value(Some(Value::Array(output)));
}

fn resolve_conditional(spec: &ModelSpec, result: &mut ValidationResult) -> Flow {
    let Some(ModelOptions::Models(options)) = spec.options() else {
        return ControlFlow::Continue(());
    };

    let mut matching = options
        .iter()
        .enumerate()
        .filter(|(_, option)| option.spec().applies().is_some_and(|applies| applies(result)));
    let Some((index, branch)) = matching.next() else {
        result.push(Violation::new(
            IssueKind::NoApplicableOption,
            "no conditional option applies to the value",
        ));
        return ControlFlow::Break(());
    };
    let others = matching.count();
    if others > 0 {
        warn!(
            path = %result.path(),
            matches = others + 1,
            selected = index,
            "more than one conditional option applies, using the first"
        );
    }

    trace!(path = %result.path(), option = index, "conditional option selected");
    run_node(branch, result);
    ControlFlow::Continue(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ModelContext;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn parse_runs_before_default_and_type_check() {
        let ctx = ModelContext::create();
        let csv = ctx
            .array()
            .children(ctx.integer())
            .unwrap()
            .parse(|r| {
                r.current()
                    .as_str()
                    .map(|s| Value::Array(s.split(',').map(|p| json!(p.trim())).collect()))
            });

        let result = csv.validate(json!("1, 2, 3"));
        assert!(result.conforms(), "{:?}", result.errors());
        assert_eq!(result.value(), Some(&json!([1, 2, 3])));
    }

    #[test]
    fn computed_default_sees_the_root() {
        let ctx = ModelContext::create();
        let model = ctx
            .object()
            .children([
                ("first", ctx.string()),
                (
                    "display",
                    ctx.string().default_with(|r| r.root_value()["first"].clone()),
                ),
            ])
            .unwrap();

        let result = model.validate(json!({"first": "Ada"}));
        assert_eq!(result.value(), Some(&json!({"first": "Ada", "display": "Ada"})));
    }

    #[test]
    fn null_without_nullable_is_a_type_mismatch() {
        let ctx = ModelContext::create();
        let result = ctx.string().validate(Value::Null);
        assert_eq!(result.errors().len(), 1);
        let issue = &result.errors()[0];
        assert_eq!(issue.kind, IssueKind::TypeMismatch);
        assert_eq!(issue.message, "expected string, got null");
        assert_eq!(issue.expected, Some(json!("string")));
        assert_eq!(issue.actual, Some(json!("null")));
    }

    #[test]
    fn optional_undefined_children_are_omitted() {
        let ctx = ModelContext::create();
        let model = ctx
            .object()
            .children([("a", ctx.string()), ("b", ctx.string().optional())])
            .unwrap();
        let result = model.validate(json!({"a": "x"}));
        assert!(result.conforms());
        assert_eq!(result.value(), Some(&json!({"a": "x"})));
    }

    #[test]
    fn undeclared_keys_survive_in_lenient_mode() {
        let ctx = ModelContext::create();
        let model = ctx.object().children([("a", ctx.integer())]).unwrap();
        let result = model.validate(json!({"z": true, "a": "1"}));
        assert!(result.conforms());
        assert_eq!(result.value(), Some(&json!({"a": 1, "z": true})));
    }

    #[test]
    fn validators_fail_fast_per_node() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let ctx = ModelContext::create();
        let model = ctx
            .string()
            .validations(|_| Err(Violation::rule("first")))
            .validations(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });

        let result = model.validate(json!("x"));
        assert_eq!(result.errors().len(), 1);
        assert_eq!(result.errors()[0].message, "first");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn enum_membership_runs_before_custom_rules() {
        let ctx = ModelContext::create();
        let model = ctx
            .string()
            .enum_values(["red", "green"])
            .validations(|_| Err(Violation::rule("unreachable")));

        let result = model.validate(json!("blue"));
        assert_eq!(result.errors().len(), 1);
        assert_eq!(result.errors()[0].kind, IssueKind::EnumMembershipViolation);
        assert_eq!(result.errors()[0].message, r#"must be one of ["red","green"]"#);
    }

    #[test]
    fn custom_coerce_is_skipped_when_strict() {
        let ctx = ModelContext::create();
        let upper = ctx
            .string()
            .coerce(|r| r.current().as_str().map(|s| json!(s.to_uppercase())));

        assert_eq!(upper.validate(json!("abc")).into_value(), Some(json!("ABC")));
        assert_eq!(
            upper.strict(true).validate(json!("abc")).into_value(),
            Some(json!("abc"))
        );
    }

    #[test]
    fn failed_parent_does_not_recurse() {
        let ctx = ModelContext::create();
        let model = ctx
            .object()
            .children([("a", ctx.string())])
            .unwrap()
            .validations(|_| Err(Violation::rule("whole object rejected")));

        let result = model.validate(json!({"a": 1}));
        assert_eq!(result.errors().len(), 1);
        assert!(result.errors()[0].path.is_empty());
    }

    #[rstest]
    #[case(json!(1), true)]
    #[case(json!(1.0), true)]
    #[case(json!(2.5), true)]
    #[case(json!(2), false)]
    #[case(json!("1"), true)]
    #[case(json!("2.50"), true)]
    #[case(json!(3), true)]
    #[case(json!(3.0), true)]
    fn numeric_options_match_by_value(#[case] input: Value, #[case] conforms: bool) {
        let ctx = ModelContext::create();
        let model = ctx.number().enum_values([json!(1.0), json!(2.5), json!(3)]);
        let result = model.validate(input);
        assert_eq!(result.conforms(), conforms, "{:?}", result.errors());
    }

    #[test]
    fn numeric_option_keeps_the_input_representation() {
        let ctx = ModelContext::create();
        let model = ctx.number().enum_values([1.0]);
        assert_eq!(model.validate(json!(1)).into_value(), Some(json!(1)));
        assert!(!same_option(&json!("1"), &json!(1)));
        assert!(same_option(&json!(-4), &json!(-4.0)));
    }
}
