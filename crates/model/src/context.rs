//! The factory models are built from.

use std::fmt;
use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::config::{ContextConfig, ModelDefaults};
use crate::error::ModelError;
use crate::extension::Extension;
use crate::extensions::{constraints, core_types};
use crate::model::{Children, Model};
use crate::registry::CapabilityTable;
use crate::spec::{ChildKey, ModelChild, ModelSpec};
use crate::types::TypeKind;

/// Whether a context still accepts registrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    Registering,
    /// The first model has been built; the capability table is fixed.
    Frozen,
}

/// Collects extensions and defaults, then builds models bound to them.
///
/// Registration is only possible before the first model is built. Building
/// freezes the capability table into an `Arc` shared by every model of the
/// context, after which `use_*` calls return [`ModelError::ContextFrozen`].
pub struct ModelContext {
    pending: CapabilityTable,
    frozen: OnceLock<Arc<CapabilityTable>>,
    defaults: ModelDefaults,
}

impl ModelContext {
    /// A context with the built-in type builders and constraint hooks.
    #[must_use]
    pub fn create() -> Self {
        let mut ctx = Self::empty();
        ctx.pending.merge(core_types());
        ctx.pending.merge(constraints());
        ctx
    }

    /// A context with nothing registered.
    ///
    /// The typed shortcuts ([`string`](Self::string), ...) still work, but no
    /// coercion or constraint handler is installed.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            pending: CapabilityTable::default(),
            frozen: OnceLock::new(),
            defaults: ModelDefaults::default(),
        }
    }

    #[must_use]
    pub fn state(&self) -> ContextState {
        if self.frozen.get().is_some() {
            ContextState::Frozen
        } else {
            ContextState::Registering
        }
    }

    fn ensure_registering(&self) -> Result<(), ModelError> {
        match self.state() {
            ContextState::Registering => Ok(()),
            ContextState::Frozen => Err(ModelError::ContextFrozen),
        }
    }

    /// Registers an extension. The whole extension is rejected on conflict.
    pub fn use_extension(&mut self, extension: Extension) -> Result<&mut Self, ModelError> {
        self.ensure_registering()?;
        self.pending.register(extension)?;
        Ok(self)
    }

    /// Seeds the flags of subsequently built models.
    pub fn use_defaults(&mut self, defaults: ModelDefaults) -> Result<&mut Self, ModelError> {
        self.ensure_registering()?;
        self.defaults = defaults;
        Ok(self)
    }

    pub fn use_config(&mut self, config: ContextConfig) -> Result<&mut Self, ModelError> {
        self.use_defaults(config.defaults)
    }

    #[must_use]
    pub fn defaults(&self) -> ModelDefaults {
        self.defaults
    }

    /// The capability table, frozen on first access.
    pub fn capabilities(&self) -> &Arc<CapabilityTable> {
        self.frozen.get_or_init(|| {
            debug!(
                extensions = ?self.pending.extension_names(),
                "freezing model context"
            );
            Arc::new(self.pending.clone())
        })
    }

    /// Builds a model through the builder registered under `name`.
    pub fn build(&self, name: &str) -> Result<Model, ModelError> {
        let table = self.capabilities();
        let def = table.builder(name)?;
        let mut spec = self.seeded(def.kind);
        spec.format.clone_from(&def.format);
        let model = Model::new(spec, Arc::clone(table));
        Ok(match &def.configure {
            Some(configure) => configure(model),
            None => model,
        })
    }

    /// Builds a bare model of `kind`, without going through a named builder.
    pub fn of_kind(&self, kind: TypeKind) -> Model {
        Model::new(self.seeded(kind), Arc::clone(self.capabilities()))
    }

    fn seeded(&self, kind: TypeKind) -> ModelSpec {
        let mut spec = ModelSpec::new(kind);
        spec.required = self.defaults.required;
        spec.strict = self.defaults.strict;
        spec.nullable = self.defaults.nullable;
        spec
    }

    pub fn any(&self) -> Model {
        self.of_kind(TypeKind::Any)
    }

    pub fn object(&self) -> Model {
        self.of_kind(TypeKind::Object)
    }

    pub fn array(&self) -> Model {
        self.of_kind(TypeKind::Array)
    }

    pub fn string(&self) -> Model {
        self.of_kind(TypeKind::String)
    }

    pub fn number(&self) -> Model {
        self.of_kind(TypeKind::Number)
    }

    pub fn integer(&self) -> Model {
        self.of_kind(TypeKind::Integer)
    }

    pub fn boolean(&self) -> Model {
        self.of_kind(TypeKind::Boolean)
    }

    pub fn date(&self) -> Model {
        self.of_kind(TypeKind::Date)
    }

    /// An object model with the given properties.
    pub fn object_of(&self, properties: impl Into<Children>) -> Result<Model, ModelError> {
        self.object().children(properties)
    }

    /// An array model whose elements are validated against `element`.
    pub fn array_of(&self, element: Model) -> Model {
        let mut spec = self.seeded(TypeKind::Array);
        spec.children = Some(Arc::from([ModelChild {
            key: ChildKey::Element,
            model: element,
        }]));
        Model::new(spec, Arc::clone(self.capabilities()))
    }
}

impl Default for ModelContext {
    fn default() -> Self {
        Self::create()
    }
}

impl fmt::Debug for ModelContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelContext")
            .field("state", &self.state())
            .field("defaults", &self.defaults)
            .field("extensions", &self.pending.extension_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("any", TypeKind::Any)]
    #[case("object", TypeKind::Object)]
    #[case("array", TypeKind::Array)]
    #[case("string", TypeKind::String)]
    #[case("number", TypeKind::Number)]
    #[case("integer", TypeKind::Integer)]
    #[case("boolean", TypeKind::Boolean)]
    #[case("date", TypeKind::Date)]
    fn builds_every_core_kind_by_name(#[case] name: &str, #[case] kind: TypeKind) {
        let ctx = ModelContext::create();
        assert_eq!(ctx.build(name).unwrap().kind(), kind);
    }

    #[test]
    fn unknown_builder() {
        let ctx = ModelContext::create();
        assert_eq!(
            ctx.build("decimal").unwrap_err(),
            ModelError::UnknownBuilder {
                name: "decimal".into()
            }
        );
    }

    #[test]
    fn first_build_freezes_registration() {
        let mut ctx = ModelContext::create();
        ctx.use_extension(Extension::new("early")).unwrap();
        assert_eq!(ctx.state(), ContextState::Registering);

        let _ = ctx.string();
        assert_eq!(ctx.state(), ContextState::Frozen);
        assert_eq!(
            ctx.use_extension(Extension::new("late")).unwrap_err(),
            ModelError::ContextFrozen
        );
        assert_eq!(
            ctx.use_defaults(ModelDefaults::default()).unwrap_err(),
            ModelError::ContextFrozen
        );
        assert_eq!(
            ctx.capabilities().extension_names(),
            ["core-types", "constraints", "early"]
        );
    }

    #[test]
    fn models_share_one_table() {
        let ctx = ModelContext::create();
        let a = ctx.string();
        let b = ctx.build("number").unwrap();
        assert!(std::ptr::eq(a.capabilities(), b.capabilities()));
    }

    #[test]
    fn defaults_seed_new_models() {
        let mut ctx = ModelContext::create();
        ctx.use_defaults(ModelDefaults {
            required: false,
            strict: true,
            nullable: true,
        })
        .unwrap();

        let model = ctx.build("string").unwrap();
        assert!(!model.spec().is_required());
        assert!(model.spec().is_strict());
        assert!(model.spec().is_nullable());
        assert!(model.validate_optional(None).conforms());
    }

    #[test]
    fn configured_builders_apply_their_step() {
        let mut ctx = ModelContext::create();
        ctx.use_extension(
            Extension::new("money")
                .with_configured_builder("price", TypeKind::Number, None, |m| {
                    m.extra("currency", "EUR")
                }),
        )
        .unwrap();

        let price = ctx.build("price").unwrap();
        assert_eq!(price.spec().extra("currency"), Some(&json!("EUR")));
        assert!(price.validate(json!("9.5")).conforms());
    }

    #[test]
    fn empty_context_has_no_coercion() {
        let ctx = ModelContext::empty();
        assert!(ctx.build("number").is_err());
        assert!(!ctx.number().validate(json!("42")).conforms());
        assert!(ModelContext::create().number().validate(json!("42")).conforms());
    }

    #[test]
    fn array_of_builds_element_model() {
        let ctx = ModelContext::create();
        let list = ctx.array_of(ctx.integer());
        assert_eq!(list.element().map(Model::kind), Some(TypeKind::Integer));
        assert_eq!(list.validate(json!(["1", 2])).into_value(), Some(json!([1, 2])));
    }
}
