//! Immutable schema definitions.
//!
//! A [`ModelSpec`] is pure data: a kind, flags, children and the closures
//! attached through the builder. It is only ever cloned and modified through
//! [`Model`](crate::model::Model) builders, which copy it on write.

use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value, json};

use crate::error::Violation;
use crate::model::Model;
use crate::result::ValidationResult;
use crate::types::TypeKind;

/// Transforms the current value. `None` leaves it untouched.
pub type Transform = Arc<dyn Fn(&ModelSpec, &ValidationResult) -> Option<Value> + Send + Sync>;

/// Checks the current value. The first failing assertion stops the node.
pub type Assertion =
    Arc<dyn Fn(&ModelSpec, &ValidationResult) -> Result<(), Violation> + Send + Sync>;

/// Decides whether a conditional branch applies.
pub type Predicate = Arc<dyn Fn(&ValidationResult) -> bool + Send + Sync>;

/// Computes a default for an undefined value.
pub type DefaultFn = Arc<dyn Fn(&ValidationResult) -> Value + Send + Sync>;

/// Fallback for undefined values.
#[derive(Clone)]
pub enum DefaultValue {
    Literal(Value),
    Computed(DefaultFn),
}

impl DefaultValue {
    pub(crate) fn resolve(&self, result: &ValidationResult) -> Value {
        match self {
            Self::Literal(value) => value.clone(),
            Self::Computed(f) => f(result),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Where a child model sits inside its parent.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChildKey {
    /// A named object property.
    Property(String),
    /// The placeholder for every array element.
    Element,
}

/// A nested model together with its position.
#[derive(Debug, Clone)]
pub struct ModelChild {
    pub key: ChildKey,
    pub model: Model,
}

impl ModelChild {
    /// The property name, `None` for the array element.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match &self.key {
            ChildKey::Property(name) => Some(name),
            ChildKey::Element => None,
        }
    }
}

/// Allowed values of an enum node.
#[derive(Debug, Clone)]
pub enum ModelOptions {
    /// Primitive enum: the value must equal one of these.
    Values(Arc<[Value]>),
    /// Conditional node: the first model whose `applies` predicate holds.
    Models(Arc<[Model]>),
}

/// Closures attached through `parse`, `coerce` and `validations`.
#[derive(Clone, Default)]
pub struct CustomHooks {
    pub parse: Option<Transform>,
    pub coerce: Option<Transform>,
    pub validate: Vec<Assertion>,
}

impl fmt::Debug for CustomHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomHooks")
            .field("parse", &self.parse.is_some())
            .field("coerce", &self.coerce.is_some())
            .field("validate", &self.validate.len())
            .finish()
    }
}

/// The definition behind a model node.
#[derive(Clone)]
pub struct ModelSpec {
    pub(crate) kind: TypeKind,
    pub(crate) format: Option<String>,
    pub(crate) required: bool,
    pub(crate) nullable: bool,
    pub(crate) strict: bool,
    pub(crate) default: Option<DefaultValue>,
    pub(crate) children: Option<Arc<[ModelChild]>>,
    pub(crate) options: Option<ModelOptions>,
    pub(crate) applies: Option<Predicate>,
    pub(crate) hooks: CustomHooks,
    pub(crate) extra_data: Map<String, Value>,
}

impl ModelSpec {
    pub(crate) fn new(kind: TypeKind) -> Self {
        Self {
            kind,
            format: None,
            required: true,
            nullable: false,
            strict: false,
            default: None,
            children: None,
            options: None,
            applies: None,
            hooks: CustomHooks::default(),
            extra_data: Map::new(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    #[must_use]
    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    #[must_use]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    #[must_use]
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    #[must_use]
    pub fn default(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    #[must_use]
    pub fn children(&self) -> &[ModelChild] {
        self.children.as_deref().unwrap_or(&[])
    }

    #[must_use]
    pub fn options(&self) -> Option<&ModelOptions> {
        self.options.as_ref()
    }

    #[must_use]
    pub fn applies(&self) -> Option<&Predicate> {
        self.applies.as_ref()
    }

    #[must_use]
    pub fn hooks(&self) -> &CustomHooks {
        &self.hooks
    }

    /// Opaque data attached by builders and extensions.
    #[must_use]
    pub fn extra_data(&self) -> &Map<String, Value> {
        &self.extra_data
    }

    #[must_use]
    pub fn extra(&self, key: &str) -> Option<&Value> {
        self.extra_data.get(key)
    }

    /// Whether this node resolves through conditional branches.
    #[must_use]
    pub fn is_conditional(&self) -> bool {
        matches!(self.options, Some(ModelOptions::Models(_)))
    }

    /// Declared property of an object node.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Model> {
        self.children()
            .iter()
            .find(|child| child.name() == Some(name))
            .map(|child| &child.model)
    }

    /// The element model of an array node.
    #[must_use]
    pub fn element(&self) -> Option<&Model> {
        self.children()
            .iter()
            .find(|child| child.key == ChildKey::Element)
            .map(|child| &child.model)
    }

    /// A JSON description of the node. Closures are reported by presence only.
    #[must_use]
    pub fn describe(&self) -> Value {
        let mut out = Map::new();
        out.insert("type".into(), json!(self.kind.as_str()));
        if let Some(format) = &self.format {
            out.insert("format".into(), json!(format));
        }
        out.insert("required".into(), json!(self.required));
        out.insert("nullable".into(), json!(self.nullable));
        out.insert("strict".into(), json!(self.strict));
        match &self.default {
            Some(DefaultValue::Literal(value)) => {
                out.insert("default".into(), value.clone());
            }
            Some(DefaultValue::Computed(_)) => {
                out.insert("computedDefault".into(), json!(true));
            }
            None => {}
        }

        match self.kind {
            TypeKind::Object if self.children.is_some() => {
                let properties: Map<String, Value> = self
                    .children()
                    .iter()
                    .filter_map(|child| {
                        child
                            .name()
                            .map(|name| (name.to_owned(), child.model.describe()))
                    })
                    .collect();
                out.insert("properties".into(), Value::Object(properties));
            }
            TypeKind::Array => {
                if let Some(element) = self.element() {
                    out.insert("items".into(), element.describe());
                }
            }
            _ => {}
        }

        match &self.options {
            Some(ModelOptions::Values(values)) => {
                out.insert("enum".into(), Value::Array(values.to_vec()));
            }
            Some(ModelOptions::Models(models)) => {
                out.insert(
                    "oneOf".into(),
                    Value::Array(models.iter().map(Model::describe).collect()),
                );
            }
            None => {}
        }

        if !self.extra_data.is_empty() {
            out.insert("extra".into(), Value::Object(self.extra_data.clone()));
        }
        Value::Object(out)
    }
}

impl fmt::Debug for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelSpec")
            .field("kind", &self.kind)
            .field("format", &self.format)
            .field("required", &self.required)
            .field("nullable", &self.nullable)
            .field("strict", &self.strict)
            .field("default", &self.default)
            .field("children", &self.children())
            .field("options", &self.options)
            .field("applies", &self.applies.is_some())
            .field("hooks", &self.hooks)
            .field("extra_data", &self.extra_data)
            .finish()
    }
}

impl Serialize for ModelSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.describe().serialize(serializer)
    }
}
