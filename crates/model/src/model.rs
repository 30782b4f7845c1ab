//! Schema nodes and the fluent immutable builder.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{AggregateValidationError, ModelError, Violation};
use crate::pipeline;
use crate::registry::CapabilityTable;
use crate::result::ValidationResult;
use crate::spec::{Assertion, ChildKey, DefaultValue, ModelChild, ModelOptions, ModelSpec, Transform};
use crate::types::TypeKind;

/// Children passed to [`Model::children`].
///
/// Objects take named properties; arrays take the single model that every
/// element is validated against.
#[derive(Debug, Clone)]
pub enum Children {
    Properties(Vec<(String, Model)>),
    Element(Model),
}

impl From<Model> for Children {
    fn from(model: Model) -> Self {
        Self::Element(model)
    }
}

impl<K: Into<String>> From<Vec<(K, Model)>> for Children {
    fn from(properties: Vec<(K, Model)>) -> Self {
        Self::Properties(
            properties
                .into_iter()
                .map(|(name, model)| (name.into(), model))
                .collect(),
        )
    }
}

impl<K: Into<String>, const N: usize> From<[(K, Model); N]> for Children {
    fn from(properties: [(K, Model); N]) -> Self {
        Self::from(Vec::from(properties))
    }
}

/// A schema node bound to the capability table of the context that built it.
///
/// Models are immutable. Every builder method consumes the receiver and
/// returns a new model; the underlying [`ModelSpec`] is copied on write, so
/// clones taken earlier are unaffected.
///
/// ```
/// use mosaic_model::ModelContext;
/// use serde_json::json;
///
/// let ctx = ModelContext::create();
/// let user = ctx.object().children([
///     ("name", ctx.string()),
///     ("age", ctx.integer().optional()),
/// ])?;
///
/// let result = user.validate(json!({"name": "Ada", "age": "36"}));
/// assert!(result.conforms());
/// assert_eq!(result.value(), Some(&json!({"name": "Ada", "age": 36})));
/// # Ok::<(), mosaic_model::ModelError>(())
/// ```
#[derive(Clone)]
pub struct Model {
    spec: Arc<ModelSpec>,
    table: Arc<CapabilityTable>,
}

impl Model {
    pub(crate) fn new(spec: ModelSpec, table: Arc<CapabilityTable>) -> Self {
        Self {
            spec: Arc::new(spec),
            table,
        }
    }

    fn edit(mut self, f: impl FnOnce(&mut ModelSpec)) -> Self {
        f(Arc::make_mut(&mut self.spec));
        self
    }

    // ------------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------------

    #[must_use]
    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    #[must_use]
    pub fn kind(&self) -> TypeKind {
        self.spec.kind
    }

    #[must_use]
    pub fn format_name(&self) -> Option<&str> {
        self.spec.format()
    }

    /// The capability table this model dispatches through.
    #[must_use]
    pub fn capabilities(&self) -> &CapabilityTable {
        &self.table
    }

    /// A declared property of an object model.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Model> {
        self.spec.property(name)
    }

    /// The element model of an array model.
    #[must_use]
    pub fn element(&self) -> Option<&Model> {
        self.spec.element()
    }

    #[must_use]
    pub fn describe(&self) -> Value {
        self.spec.describe()
    }

    // ------------------------------------------------------------------------
    // Flags
    // ------------------------------------------------------------------------

    pub fn required(self) -> Self {
        self.edit(|spec| spec.required = true)
    }

    /// An undefined value is accepted and left undefined.
    pub fn optional(self) -> Self {
        self.edit(|spec| spec.required = false)
    }

    pub fn nullable(self) -> Self {
        self.edit(|spec| spec.nullable = true)
    }

    pub fn not_nullable(self) -> Self {
        self.edit(|spec| spec.nullable = false)
    }

    /// Disables coercion and, for objects, rejects undeclared properties.
    pub fn strict(self, strict: bool) -> Self {
        self.edit(|spec| spec.strict = strict)
    }

    // ------------------------------------------------------------------------
    // Defaults
    // ------------------------------------------------------------------------

    /// Fallback used when the value is undefined. `null` does not trigger it.
    pub fn default_value(self, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.edit(|spec| spec.default = Some(DefaultValue::Literal(value)))
    }

    /// Computed fallback, evaluated on every undefined value.
    pub fn default_with<F>(self, f: F) -> Self
    where
        F: Fn(&ValidationResult) -> Value + Send + Sync + 'static,
    {
        self.edit(|spec| spec.default = Some(DefaultValue::Computed(Arc::new(f))))
    }

    // ------------------------------------------------------------------------
    // Composition
    // ------------------------------------------------------------------------

    /// Replaces the children of an object or array model.
    pub fn children(self, children: impl Into<Children>) -> Result<Self, ModelError> {
        let kind = self.spec.kind;
        if !kind.is_composite() {
            return Err(ModelError::NotComposite {
                operation: "children",
                kind,
            });
        }

        let list: Vec<ModelChild> = match (kind, children.into()) {
            (TypeKind::Object, Children::Properties(properties)) => {
                let mut seen = HashSet::new();
                for (name, _) in &properties {
                    if !seen.insert(name.as_str()) {
                        return Err(ModelError::InvalidChildren {
                            kind,
                            reason: format!("duplicate property `{name}`"),
                        });
                    }
                }
                properties
                    .into_iter()
                    .map(|(name, model)| ModelChild {
                        key: ChildKey::Property(name),
                        model,
                    })
                    .collect()
            }
            (TypeKind::Array, Children::Element(model)) => vec![ModelChild {
                key: ChildKey::Element,
                model,
            }],
            (TypeKind::Object, Children::Element(_)) => {
                return Err(ModelError::InvalidChildren {
                    kind,
                    reason: "expected named properties, got a single element model".into(),
                });
            }
            _ => {
                return Err(ModelError::InvalidChildren {
                    kind,
                    reason: "expected a single element model, got named properties".into(),
                });
            }
        };

        Ok(self.edit(|spec| spec.children = Some(list.into())))
    }

    /// Keeps only the named properties of an object model.
    pub fn pick(self, names: &[&str]) -> Result<Self, ModelError> {
        self.select("pick", names, true)
    }

    /// Drops the named properties of an object model.
    pub fn omit(self, names: &[&str]) -> Result<Self, ModelError> {
        self.select("omit", names, false)
    }

    fn select(self, operation: &'static str, names: &[&str], keep: bool) -> Result<Self, ModelError> {
        if self.spec.kind != TypeKind::Object {
            return Err(ModelError::NotComposite {
                operation,
                kind: self.spec.kind,
            });
        }
        if let Some(unknown) = names.iter().find(|name| self.child(name).is_none()) {
            return Err(ModelError::UnknownProperty {
                name: (*unknown).to_owned(),
            });
        }

        let selected: Vec<ModelChild> = self
            .spec
            .children()
            .iter()
            .filter(|child| child.name().is_some_and(|name| names.contains(&name) == keep))
            .cloned()
            .collect();
        Ok(self.edit(|spec| spec.children = Some(selected.into())))
    }

    // ------------------------------------------------------------------------
    // Options
    // ------------------------------------------------------------------------

    /// Restricts the value to one of `values`.
    pub fn enum_values<I, V>(self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        self.edit(|spec| spec.options = Some(ModelOptions::Values(values.into())))
    }

    /// Turns the node into a conditional: the first model whose `applies`
    /// predicate holds validates the value.
    pub fn enum_models(self, models: impl IntoIterator<Item = Model>) -> Result<Self, ModelError> {
        let models: Vec<Model> = models.into_iter().collect();
        if let Some(index) = models.iter().position(|m| m.spec.applies.is_none()) {
            return Err(ModelError::MissingPredicate { index });
        }
        Ok(self.edit(|spec| spec.options = Some(ModelOptions::Models(models.into()))))
    }

    /// Predicate deciding whether this model applies as a conditional option.
    pub fn applies<F>(self, f: F) -> Self
    where
        F: Fn(&ValidationResult) -> bool + Send + Sync + 'static,
    {
        self.edit(|spec| spec.applies = Some(Arc::new(f)))
    }

    // ------------------------------------------------------------------------
    // Hooks
    // ------------------------------------------------------------------------

    /// Transforms the raw value before any other phase. `None` keeps it.
    pub fn parse<F>(self, f: F) -> Self
    where
        F: Fn(&ValidationResult) -> Option<Value> + Send + Sync + 'static,
    {
        let hook: Transform = Arc::new(move |_: &ModelSpec, result: &ValidationResult| f(result));
        self.edit(|spec| spec.hooks.parse = Some(hook))
    }

    /// Extra coercion, run after the registered ones unless strict.
    pub fn coerce<F>(self, f: F) -> Self
    where
        F: Fn(&ValidationResult) -> Option<Value> + Send + Sync + 'static,
    {
        let hook: Transform = Arc::new(move |_: &ModelSpec, result: &ValidationResult| f(result));
        self.edit(|spec| spec.hooks.coerce = Some(hook))
    }

    /// Appends a business-rule check, run after the registered validators.
    pub fn validations<F>(self, f: F) -> Self
    where
        F: Fn(&ValidationResult) -> Result<(), Violation> + Send + Sync + 'static,
    {
        let hook: Assertion = Arc::new(move |_: &ModelSpec, result: &ValidationResult| f(result));
        self.edit(|spec| spec.hooks.validate.push(hook))
    }

    // ------------------------------------------------------------------------
    // Formats and extension data
    // ------------------------------------------------------------------------

    /// Selects a format registered for the model's kind.
    pub fn format(self, name: &str) -> Result<Self, ModelError> {
        if !self.table.has_format(self.spec.kind, name) {
            return Err(ModelError::UnknownFormat {
                kind: self.spec.kind,
                format: name.to_owned(),
            });
        }
        let name = name.to_owned();
        Ok(self.edit(|spec| spec.format = Some(name)))
    }

    /// Stores `value` under `key` in the model's extra data.
    pub fn extra(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let (key, value) = (key.into(), value.into());
        self.edit(|spec| {
            spec.extra_data.insert(key, value);
        })
    }

    /// Storage constraints, passed through for persistence layers.
    pub fn constrain(self, value: impl Into<Value>) -> Self {
        self.extra("constrain", value)
    }

    /// Index hints, passed through for persistence layers.
    pub fn index(self, value: impl Into<Value>) -> Self {
        self.extra("index", value)
    }

    /// Access rules, passed through for route layers.
    pub fn authorization(self, value: impl Into<Value>) -> Self {
        self.extra("authorization", value)
    }

    /// Calls the extend hook registered under `name`.
    pub fn extend(self, name: &str, argument: &Value) -> Result<Self, ModelError> {
        let hook = Arc::clone(self.table.extend_hook(name)?);
        hook(self, argument)
    }

    // ------------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------------

    /// Validates `input` and returns every issue found.
    pub fn validate(&self, input: Value) -> ValidationResult {
        pipeline::validate(self, Some(input))
    }

    /// Like [`validate`](Self::validate), with `None` standing for an
    /// undefined input.
    pub fn validate_optional(&self, input: Option<Value>) -> ValidationResult {
        pipeline::validate(self, input)
    }

    /// Validates `input` and returns the normalised value, or every issue as
    /// one error.
    pub fn try_validate(&self, input: Value) -> Result<Value, AggregateValidationError> {
        let result = self.validate(input);
        if result.conforms() {
            Ok(result.into_value().unwrap_or(Value::Null))
        } else {
            Err(AggregateValidationError::new(result.into_errors()))
        }
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.spec, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ModelContext;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn builders_do_not_mutate_the_receiver() {
        let ctx = ModelContext::create();
        let base = ctx.string();
        let strict = base.clone().strict(true).optional();

        assert!(!base.spec().is_strict());
        assert!(base.spec().is_required());
        assert!(strict.spec().is_strict());
        assert!(!strict.spec().is_required());
    }

    #[test]
    fn unchanged_children_are_shared() {
        let ctx = ModelContext::create();
        let object = ctx
            .object()
            .children([("a", ctx.string()), ("b", ctx.number())])
            .unwrap();
        let strict = object.clone().strict(true);

        let before = object.spec().children.as_ref().unwrap();
        let after = strict.spec().children.as_ref().unwrap();
        assert!(Arc::ptr_eq(before, after));
    }

    #[test]
    fn children_on_scalar_is_rejected() {
        let ctx = ModelContext::create();
        let err = ctx.string().children(ctx.string()).unwrap_err();
        assert_eq!(
            err,
            ModelError::NotComposite {
                operation: "children",
                kind: TypeKind::String,
            }
        );
    }

    #[test]
    fn children_shape_must_match_kind() {
        let ctx = ModelContext::create();
        assert!(matches!(
            ctx.object().children(ctx.string()),
            Err(ModelError::InvalidChildren { kind: TypeKind::Object, .. })
        ));
        assert!(matches!(
            ctx.array().children([("x", ctx.string())]),
            Err(ModelError::InvalidChildren { kind: TypeKind::Array, .. })
        ));
        assert!(matches!(
            ctx.object().children([("x", ctx.string()), ("x", ctx.number())]),
            Err(ModelError::InvalidChildren { .. })
        ));
    }

    #[test]
    fn pick_and_omit() {
        let ctx = ModelContext::create();
        let user = ctx
            .object()
            .children([
                ("id", ctx.integer()),
                ("name", ctx.string()),
                ("email", ctx.string()),
            ])
            .unwrap();

        let names = |model: &Model| -> Vec<String> {
            model
                .spec()
                .children()
                .iter()
                .filter_map(|c| c.name().map(str::to_owned))
                .collect()
        };

        assert_eq!(names(&user.clone().pick(&["email", "id"]).unwrap()), ["id", "email"]);
        assert_eq!(names(&user.clone().omit(&["id"]).unwrap()), ["name", "email"]);
        assert_eq!(
            user.pick(&["missing"]).unwrap_err(),
            ModelError::UnknownProperty {
                name: "missing".into()
            }
        );
        assert!(matches!(
            ctx.array().children(ctx.string()).unwrap().pick(&[]),
            Err(ModelError::NotComposite { operation: "pick", .. })
        ));
    }

    #[test]
    fn enum_models_require_predicates() {
        let ctx = ModelContext::create();
        let err = ctx
            .any()
            .enum_models([ctx.string().applies(|_| true), ctx.number()])
            .unwrap_err();
        assert_eq!(err, ModelError::MissingPredicate { index: 1 });
    }

    #[test]
    fn unknown_format_is_rejected() {
        let ctx = ModelContext::create();
        assert_eq!(
            ctx.string().format("postcode").unwrap_err(),
            ModelError::UnknownFormat {
                kind: TypeKind::String,
                format: "postcode".into(),
            }
        );
    }

    #[test]
    fn opaque_data_is_stored_verbatim() {
        let ctx = ModelContext::create();
        let model = ctx
            .integer()
            .constrain(json!({"primaryKey": true}))
            .index(json!({"unique": true}))
            .authorization(json!(["admin"]))
            .extra("column", "user_id");

        let spec = model.spec();
        assert_eq!(spec.extra("constrain"), Some(&json!({"primaryKey": true})));
        assert_eq!(spec.extra("index"), Some(&json!({"unique": true})));
        assert_eq!(spec.extra("authorization"), Some(&json!(["admin"])));
        assert_eq!(spec.extra("column"), Some(&json!("user_id")));
        assert!(model.validate(json!(1)).conforms());
    }

    #[test]
    fn extend_dispatches_to_registered_hook() {
        let ctx = ModelContext::create();
        let model = ctx.number().extend("min", &json!(5)).unwrap();
        assert_eq!(model.spec().extra("min"), Some(&json!(5.0)));

        assert_eq!(
            ctx.number().extend("shout", &json!(true)).unwrap_err(),
            ModelError::UnknownExtend {
                name: "shout".into()
            }
        );
    }

    #[test]
    fn describe_reports_structure() {
        let ctx = ModelContext::create();
        let model = ctx
            .object()
            .children([
                ("tags", ctx.array().children(ctx.string()).unwrap()),
                ("role", ctx.string().enum_values(["admin", "user"]).default_value("user")),
            ])
            .unwrap()
            .strict(true);

        assert_eq!(
            model.describe(),
            json!({
                "type": "object",
                "required": true,
                "nullable": false,
                "strict": true,
                "properties": {
                    "tags": {
                        "type": "array",
                        "required": true,
                        "nullable": false,
                        "strict": false,
                        "items": {
                            "type": "string",
                            "required": true,
                            "nullable": false,
                            "strict": false,
                        },
                    },
                    "role": {
                        "type": "string",
                        "required": true,
                        "nullable": false,
                        "strict": false,
                        "default": "user",
                        "enum": ["admin", "user"],
                    },
                },
            })
        );
        assert_eq!(serde_json::to_value(model.spec()).unwrap(), model.describe());
    }

    #[test]
    fn try_validate_returns_value_or_all_issues() {
        let ctx = ModelContext::create();
        let point = ctx
            .object()
            .children([("x", ctx.number()), ("y", ctx.number())])
            .unwrap();

        assert_eq!(
            point.try_validate(json!({"x": "1", "y": 2})).unwrap(),
            json!({"x": 1, "y": 2})
        );

        let err = point.try_validate(json!({"x": "a", "y": true})).unwrap_err();
        let paths: Vec<String> = err.issues().iter().map(|i| i.path.to_string()).collect();
        assert_eq!(paths, ["x", "y"]);
    }
}
