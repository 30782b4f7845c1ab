//! Prelude module for convenient imports.
//!
//! `use mosaic_model::prelude::*;` brings in the context, the model builder
//! and its constraint methods, and the types custom handlers work with.

// ============================================================================
// BUILDING
// ============================================================================

pub use crate::context::ModelContext;
pub use crate::extension::Extension;
pub use crate::extensions::ConstraintExt;
pub use crate::model::{Children, Model};
pub use crate::types::TypeKind;

// ============================================================================
// RESULTS AND ERRORS
// ============================================================================

pub use crate::error::{AggregateValidationError, IssueKind, ModelError, ValidationIssue, Violation};
pub use crate::result::{Path, PathSegment, ValidationResult};
