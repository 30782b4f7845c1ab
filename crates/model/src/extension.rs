//! Independently authored capability bundles.

use std::sync::Arc;

use serde_json::Value;

use crate::error::{ModelError, Violation};
use crate::model::Model;
use crate::registry::{BuilderDef, ExtendFn, Handler};
use crate::result::ValidationResult;
use crate::spec::ModelSpec;
use crate::types::TypeKind;

/// A named set of formats, builders, phase handlers and extend hooks.
///
/// Nothing is checked until the bundle is registered on a
/// [`ModelContext`](crate::context::ModelContext), which validates the whole
/// bundle before merging any of it.
///
/// ```
/// use mosaic_model::{Extension, IssueKind, ModelContext, TypeKind, Violation};
/// use serde_json::json;
///
/// let slug = Extension::new("slug")
///     .with_format(TypeKind::String, "slug")
///     .with_builder("slug", TypeKind::String, Some("slug"))
///     .with_validation(TypeKind::String, Some("slug"), |_, result| {
///         let ok = result
///             .current()
///             .as_str()
///             .is_some_and(|s| s.chars().all(|c| c.is_ascii_lowercase() || c == '-'));
///         if ok {
///             Ok(())
///         } else {
///             Err(Violation::new(IssueKind::FormatViolation, "must be a slug"))
///         }
///     });
///
/// let mut ctx = ModelContext::create();
/// ctx.use_extension(slug)?;
/// let model = ctx.build("slug")?;
/// assert!(model.validate(json!("hello-world")).conforms());
/// assert!(!model.validate(json!("Hello World")).conforms());
/// # Ok::<(), mosaic_model::ModelError>(())
/// ```
#[derive(Clone)]
pub struct Extension {
    pub(crate) name: String,
    pub(crate) formats: Vec<(TypeKind, String)>,
    pub(crate) builders: Vec<(String, BuilderDef)>,
    pub(crate) handlers: Vec<(TypeKind, Option<String>, Handler)>,
    pub(crate) extends: Vec<(String, ExtendFn)>,
}

impl Extension {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            formats: Vec::new(),
            builders: Vec::new(),
            handlers: Vec::new(),
            extends: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declares a format for `kind`.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_format(mut self, kind: TypeKind, format: impl Into<String>) -> Self {
        self.formats.push((kind, format.into()));
        self
    }

    /// Declares a named builder producing a `kind` node with an optional format.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_builder(
        mut self,
        name: impl Into<String>,
        kind: TypeKind,
        format: Option<&str>,
    ) -> Self {
        self.builders.push((
            name.into(),
            BuilderDef {
                kind,
                format: format.map(str::to_owned),
                configure: None,
            },
        ));
        self
    }

    /// Like [`with_builder`](Self::with_builder), with a final configuration
    /// step applied to every model the builder produces.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_configured_builder<F>(
        mut self,
        name: impl Into<String>,
        kind: TypeKind,
        format: Option<&str>,
        configure: F,
    ) -> Self
    where
        F: Fn(Model) -> Model + Send + Sync + 'static,
    {
        self.builders.push((
            name.into(),
            BuilderDef {
                kind,
                format: format.map(str::to_owned),
                configure: Some(Arc::new(configure)),
            },
        ));
        self
    }

    /// Adds a parse handler. `format: None` targets every node of the kind.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_parse<F>(self, kind: TypeKind, format: Option<&str>, f: F) -> Self
    where
        F: Fn(&ModelSpec, &ValidationResult) -> Option<Value> + Send + Sync + 'static,
    {
        self.with_handler(kind, format, Handler::Parse(Arc::new(f)))
    }

    /// Adds a coercion handler. Returning `None` leaves the value as is.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_coercion<F>(self, kind: TypeKind, format: Option<&str>, f: F) -> Self
    where
        F: Fn(&ModelSpec, &ValidationResult) -> Option<Value> + Send + Sync + 'static,
    {
        self.with_handler(kind, format, Handler::Coerce(Arc::new(f)))
    }

    /// Adds a validate handler.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_validation<F>(self, kind: TypeKind, format: Option<&str>, f: F) -> Self
    where
        F: Fn(&ModelSpec, &ValidationResult) -> Result<(), Violation> + Send + Sync + 'static,
    {
        self.with_handler(kind, format, Handler::Validate(Arc::new(f)))
    }

    /// Adds a named extend hook, callable through [`Model::extend`].
    #[must_use = "builder methods must be chained or built"]
    pub fn with_extend<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Model, &Value) -> Result<Model, ModelError> + Send + Sync + 'static,
    {
        self.extends.push((name.into(), Arc::new(f)));
        self
    }

    fn with_handler(mut self, kind: TypeKind, format: Option<&str>, handler: Handler) -> Self {
        self.handlers
            .push((kind, format.map(str::to_owned), handler));
        self
    }
}

impl std::fmt::Debug for Extension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extension")
            .field("name", &self.name)
            .field("formats", &self.formats)
            .field(
                "builders",
                &self.builders.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            )
            .field("handlers", &self.handlers.len())
            .field(
                "extends",
                &self.extends.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            )
            .finish()
    }
}
