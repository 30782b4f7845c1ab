//! The capability table: merged formats, builders, handlers and extend hooks.
//!
//! Handlers are grouped per [`TypeKind`] into default and format-specific
//! lists. Lookups for a node with a format return the format-specific
//! handlers followed by the kind's default handlers; both sets run, in that
//! order.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ModelError;
use crate::extension::Extension;
use crate::model::Model;
use crate::spec::{Assertion, Transform};
use crate::types::TypeKind;

/// Final configuration step of a builder.
pub type Configure = Arc<dyn Fn(Model) -> Model + Send + Sync>;

/// A named fluent method contributed by an extension.
pub type ExtendFn = Arc<dyn Fn(Model, &Value) -> Result<Model, ModelError> + Send + Sync>;

/// The pipeline phases extensions can hook into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Parse,
    Coerce,
    Validate,
}

/// A phase handler.
#[derive(Clone)]
pub enum Handler {
    Parse(Transform),
    Coerce(Transform),
    Validate(Assertion),
}

impl Handler {
    #[must_use]
    pub fn phase(&self) -> Phase {
        match self {
            Self::Parse(_) => Phase::Parse,
            Self::Coerce(_) => Phase::Coerce,
            Self::Validate(_) => Phase::Validate,
        }
    }

    pub(crate) fn as_transform(&self) -> Option<&Transform> {
        match self {
            Self::Parse(f) | Self::Coerce(f) => Some(f),
            Self::Validate(_) => None,
        }
    }

    pub(crate) fn as_assertion(&self) -> Option<&Assertion> {
        match self {
            Self::Validate(f) => Some(f),
            Self::Parse(_) | Self::Coerce(_) => None,
        }
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler::{:?}", self.phase())
    }
}

/// What a registered builder produces.
#[derive(Clone)]
pub struct BuilderDef {
    pub kind: TypeKind,
    pub format: Option<String>,
    pub configure: Option<Configure>,
}

impl fmt::Debug for BuilderDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuilderDef")
            .field("kind", &self.kind)
            .field("format", &self.format)
            .field("configure", &self.configure.is_some())
            .finish()
    }
}

/// Handlers registered for one type kind.
#[derive(Debug, Clone, Default)]
struct KindHandlers {
    /// Handlers for every node of the kind.
    default: Vec<Handler>,
    /// Handlers for nodes carrying a format, keyed by format name.
    named: HashMap<String, Vec<Handler>>,
}

impl KindHandlers {
    fn slot(&mut self, format: Option<String>) -> &mut Vec<Handler> {
        match format {
            Some(name) => self.named.entry(name).or_default(),
            None => &mut self.default,
        }
    }

    fn named(&self, format: Option<&str>) -> &[Handler] {
        format
            .and_then(|name| self.named.get(name))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Every capability registered on a context, folded in registration order.
#[derive(Clone, Default)]
pub struct CapabilityTable {
    extensions: Vec<String>,
    formats: HashMap<TypeKind, BTreeSet<String>>,
    builders: BTreeMap<String, BuilderDef>,
    handlers: HashMap<TypeKind, KindHandlers>,
    extends: HashMap<String, ExtendFn>,
}

impl CapabilityTable {
    /// Validates `extension` as a whole, then merges it.
    ///
    /// On error nothing is merged.
    pub fn register(&mut self, extension: Extension) -> Result<(), ModelError> {
        self.check(&extension)?;
        self.merge(extension);
        Ok(())
    }

    fn check(&self, extension: &Extension) -> Result<(), ModelError> {
        let mut seen = HashSet::new();
        for (name, def) in &extension.builders {
            if self.builders.contains_key(name) || !seen.insert(name.as_str()) {
                return Err(ModelError::BuilderConflict {
                    name: name.clone(),
                    extension: extension.name.clone(),
                });
            }
            if let Some(format) = &def.format {
                self.check_format(extension, def.kind, format)?;
            }
        }
        for (kind, format, _) in &extension.handlers {
            if let Some(format) = format {
                self.check_format(extension, *kind, format)?;
            }
        }
        Ok(())
    }

    fn check_format(
        &self,
        extension: &Extension,
        kind: TypeKind,
        format: &str,
    ) -> Result<(), ModelError> {
        let declared = self.has_format(kind, format)
            || extension
                .formats
                .iter()
                .any(|(k, f)| *k == kind && f == format);
        if declared {
            Ok(())
        } else {
            Err(ModelError::UnknownFormat {
                kind,
                format: format.to_owned(),
            })
        }
    }

    /// Merges without checks. Used for the built-in extensions.
    pub(crate) fn merge(&mut self, extension: Extension) {
        let Extension {
            name,
            formats,
            builders,
            handlers,
            extends,
        } = extension;

        debug!(
            extension = %name,
            formats = formats.len(),
            builders = builders.len(),
            handlers = handlers.len(),
            extends = extends.len(),
            "registering extension"
        );

        for (kind, format) in formats {
            self.formats.entry(kind).or_default().insert(format);
        }
        for (builder, def) in builders {
            self.builders.insert(builder, def);
        }
        for (kind, format, handler) in handlers {
            self.handlers
                .entry(kind)
                .or_default()
                .slot(format)
                .push(handler);
        }
        for (hook, f) in extends {
            if self.extends.insert(hook.clone(), f).is_some() {
                warn!(extend = %hook, extension = %name, "extend hook replaced");
            }
        }
        self.extensions.push(name);
    }

    /// Handlers for a node in `phase`: format-specific first, then defaults.
    pub fn handlers<'a>(
        &'a self,
        kind: TypeKind,
        format: Option<&str>,
        phase: Phase,
    ) -> impl Iterator<Item = &'a Handler> + use<'a> {
        let (specific, defaults) = self
            .handlers
            .get(&kind)
            .map_or((&[][..], &[][..]), |table| {
                (table.named(format), table.default.as_slice())
            });
        specific
            .iter()
            .chain(defaults)
            .filter(move |handler| handler.phase() == phase)
    }

    pub(crate) fn transforms<'a>(
        &'a self,
        kind: TypeKind,
        format: Option<&str>,
        phase: Phase,
    ) -> impl Iterator<Item = &'a Transform> + use<'a> {
        self.handlers(kind, format, phase)
            .filter_map(Handler::as_transform)
    }

    pub(crate) fn assertions<'a>(
        &'a self,
        kind: TypeKind,
        format: Option<&str>,
    ) -> impl Iterator<Item = &'a Assertion> + use<'a> {
        self.handlers(kind, format, Phase::Validate)
            .filter_map(Handler::as_assertion)
    }

    pub fn builder(&self, name: &str) -> Result<&BuilderDef, ModelError> {
        self.builders
            .get(name)
            .ok_or_else(|| ModelError::UnknownBuilder {
                name: name.to_owned(),
            })
    }

    pub fn extend_hook(&self, name: &str) -> Result<&ExtendFn, ModelError> {
        self.extends
            .get(name)
            .ok_or_else(|| ModelError::UnknownExtend {
                name: name.to_owned(),
            })
    }

    /// Registered builder names, sorted.
    pub fn builder_names(&self) -> impl Iterator<Item = &str> {
        self.builders.keys().map(String::as_str)
    }

    /// Formats declared for `kind`, sorted.
    pub fn formats(&self, kind: TypeKind) -> impl Iterator<Item = &str> {
        self.formats
            .get(&kind)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Names of merged extensions, in registration order.
    #[must_use]
    pub fn extension_names(&self) -> &[String] {
        &self.extensions
    }

    #[must_use]
    pub fn has_format(&self, kind: TypeKind, format: &str) -> bool {
        self.formats
            .get(&kind)
            .is_some_and(|formats| formats.contains(format))
    }
}

impl fmt::Debug for CapabilityTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityTable")
            .field("extensions", &self.extensions)
            .field("builders", &self.builders.keys().collect::<Vec<_>>())
            .field("formats", &self.formats)
            .field("extends", &self.extends.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
