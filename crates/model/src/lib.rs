//! # mosaic-model
//!
//! Composable runtime schemas with a phase-ordered validation pipeline.
//!
//! A [`ModelContext`] collects [`Extension`]s (formats, builders, phase
//! handlers, extend hooks) and builds immutable [`Model`]s bound to the
//! resulting capability table. Validating a value runs every node through the
//! same phases (parse, default, presence, coerce, type check, validate,
//! recurse, conditional) and returns a [`ValidationResult`] carrying the
//! normalised value and every issue found, each with its absolute path.
//!
//! ```
//! use mosaic_model::prelude::*;
//! use serde_json::json;
//!
//! let ctx = ModelContext::create();
//! let order = ctx.object_of([
//!     ("id", ctx.integer()),
//!     ("items", ctx.array_of(ctx.string()).min(1.0)),
//!     ("express", ctx.boolean().default_value(false)),
//! ])?;
//!
//! let ok = order.validate(json!({"id": "7", "items": ["book"]}));
//! assert!(ok.conforms());
//! assert_eq!(
//!     ok.value(),
//!     Some(&json!({"id": 7, "items": ["book"], "express": false}))
//! );
//!
//! let bad = order.validate(json!({"id": "seven", "items": []}));
//! let paths: Vec<String> = bad.errors().iter().map(|e| e.path.to_string()).collect();
//! assert_eq!(paths, ["id", "items"]);
//! # Ok::<(), ModelError>(())
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod extension;
pub mod extensions;
pub mod model;
mod pipeline;
pub mod prelude;
pub mod registry;
pub mod result;
pub mod spec;
pub mod types;

pub use config::{ContextConfig, ModelDefaults};
pub use context::{ContextState, ModelContext};
pub use error::{AggregateValidationError, IssueKind, ModelError, ValidationIssue, Violation};
pub use extension::Extension;
pub use extensions::ConstraintExt;
pub use model::{Children, Model};
pub use registry::{CapabilityTable, Phase};
pub use result::{Path, PathSegment, ValidationResult};
pub use spec::{ModelOptions, ModelSpec};
pub use types::TypeKind;
