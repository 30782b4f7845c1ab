//! Error types for model construction and validation.
//!
//! Two families live here:
//!
//! - [`ModelError`]: configuration-time failures (unknown builder, conflicting
//!   extensions, malformed children). Returned immediately while a schema is
//!   being built, never deferred to validation time.
//! - [`ValidationIssue`]: one per-node failure found while validating a value.
//!   Issues accumulate on a [`ValidationResult`](crate::result::ValidationResult)
//!   and are never thrown across node boundaries. Callers who prefer `Err` get
//!   an [`AggregateValidationError`] carrying the full list.

use std::borrow::Cow;
use std::fmt;

use serde::Serialize;
use serde_json::{Value, json};

use crate::result::Path;
use crate::types::TypeKind;

// ============================================================================
// CONFIGURATION ERRORS
// ============================================================================

/// Error raised while configuring a context or building a model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// No builder is registered under the requested name.
    #[error("unknown builder `{name}`")]
    UnknownBuilder { name: String },

    /// Two extensions declare the same builder name.
    #[error("builder `{name}` declared by extension `{extension}` is already registered")]
    BuilderConflict { name: String, extension: String },

    /// A type name does not match any [`TypeKind`].
    #[error("unknown type `{name}`")]
    UnknownType { name: String },

    /// A format was used before any extension declared it for the kind.
    #[error("format `{format}` is not registered for type `{kind}`")]
    UnknownFormat { kind: TypeKind, format: String },

    /// No extend hook is registered under the requested name.
    #[error("unknown extend hook `{name}`")]
    UnknownExtend { name: String },

    /// The operation only applies to `object` or `array` models.
    #[error("`{operation}` requires an object or array model, got `{kind}`")]
    NotComposite {
        operation: &'static str,
        kind: TypeKind,
    },

    /// Children do not fit the model kind.
    #[error("invalid children for `{kind}` model: {reason}")]
    InvalidChildren { kind: TypeKind, reason: String },

    /// A property name passed to `pick`/`omit` is not declared.
    #[error("unknown property `{name}`")]
    UnknownProperty { name: String },

    /// A conditional option lacks its `applies` predicate.
    #[error("conditional option {index} has no `applies` predicate")]
    MissingPredicate { index: usize },

    /// A regular expression failed to compile.
    #[error("invalid pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// An extend hook received an argument of the wrong shape.
    #[error("invalid argument for `{name}`: {reason}")]
    InvalidArgument { name: String, reason: String },

    /// Registration was attempted after the context produced its first model.
    #[error("model context is frozen: register extensions before building models")]
    ContextFrozen,

    /// Context configuration could not be read.
    #[error("invalid configuration: {reason}")]
    Config { reason: String },
}

impl ModelError {
    /// Broad error category for grouping in logs.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::UnknownBuilder { .. }
            | Self::UnknownType { .. }
            | Self::UnknownFormat { .. }
            | Self::UnknownExtend { .. }
            | Self::UnknownProperty { .. } => "lookup",
            Self::BuilderConflict { .. } | Self::ContextFrozen => "registry",
            Self::NotComposite { .. }
            | Self::InvalidChildren { .. }
            | Self::MissingPredicate { .. }
            | Self::InvalidPattern { .. }
            | Self::InvalidArgument { .. } => "builder",
            Self::Config { .. } => "config",
        }
    }

    /// Machine-readable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownBuilder { .. } => "MODEL_UNKNOWN_BUILDER",
            Self::BuilderConflict { .. } => "MODEL_BUILDER_CONFLICT",
            Self::UnknownType { .. } => "MODEL_UNKNOWN_TYPE",
            Self::UnknownFormat { .. } => "MODEL_UNKNOWN_FORMAT",
            Self::UnknownExtend { .. } => "MODEL_UNKNOWN_EXTEND",
            Self::NotComposite { .. } => "MODEL_NOT_COMPOSITE",
            Self::InvalidChildren { .. } => "MODEL_INVALID_CHILDREN",
            Self::UnknownProperty { .. } => "MODEL_UNKNOWN_PROPERTY",
            Self::MissingPredicate { .. } => "MODEL_MISSING_PREDICATE",
            Self::InvalidPattern { .. } => "MODEL_INVALID_PATTERN",
            Self::InvalidArgument { .. } => "MODEL_INVALID_ARGUMENT",
            Self::ContextFrozen => "MODEL_CONTEXT_FROZEN",
            Self::Config { .. } => "MODEL_CONFIG",
        }
    }
}

// ============================================================================
// ISSUE KINDS
// ============================================================================

/// The kind of a per-node validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    RequiredValueMissing,
    TypeMismatch,
    /// An undeclared key on a strict object.
    UnexpectedProperty,
    /// A format-specific check (regex, email, uuid, ...) failed.
    FormatViolation,
    /// A `min`/`max` bound on a number, string length or array length.
    RangeViolation,
    EnumMembershipViolation,
    /// No conditional option applied to the value.
    NoApplicableOption,
    /// A custom business rule registered through `validations`.
    RuleViolation,
}

impl IssueKind {
    /// Stable snake_case code, identical to the serialized form.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::RequiredValueMissing => "required_value_missing",
            Self::TypeMismatch => "type_mismatch",
            Self::UnexpectedProperty => "unexpected_property",
            Self::FormatViolation => "format_violation",
            Self::RangeViolation => "range_violation",
            Self::EnumMembershipViolation => "enum_membership_violation",
            Self::NoApplicableOption => "no_applicable_option",
            Self::RuleViolation => "rule_violation",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

// ============================================================================
// VIOLATION
// ============================================================================

/// A failure reported by an assertion handler.
///
/// Handlers do not know where in the value tree they run; the pipeline
/// attaches the path when it turns a violation into a [`ValidationIssue`].
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub kind: IssueKind,
    pub message: Cow<'static, str>,
    pub expected: Option<Value>,
    pub actual: Option<Value>,
}

impl Violation {
    pub fn new(kind: IssueKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            message: message.into(),
            expected: None,
            actual: None,
        }
    }

    /// Sets the expected value or constraint.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_expected(mut self, expected: impl Into<Value>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    /// Sets the offending value.
    #[must_use = "builder methods must be chained or built"]
    pub fn with_actual(mut self, actual: impl Into<Value>) -> Self {
        self.actual = Some(actual.into());
        self
    }

    /// A failed format check for the named format.
    pub fn format(format: &str, actual: &Value) -> Self {
        Self::new(
            IssueKind::FormatViolation,
            format!("must be a valid {format}"),
        )
        .with_expected(format)
        .with_actual(actual.clone())
    }

    /// A failed range check.
    pub fn range(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(IssueKind::RangeViolation, message)
    }

    /// A failed custom business rule.
    pub fn rule(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(IssueKind::RuleViolation, message)
    }
}

// ============================================================================
// VALIDATION ISSUE
// ============================================================================

/// A validation failure at an absolute path inside the validated value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    pub message: String,
    pub path: Path,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<Value>,
}

impl ValidationIssue {
    pub(crate) fn at(violation: Violation, path: Path) -> Self {
        Self {
            kind: violation.kind,
            message: violation.message.into_owned(),
            path,
            actual: violation.actual,
            expected: violation.expected,
        }
    }

    /// Stable code of the issue kind.
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Converts the issue to a JSON structure for transport.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut value = json!({
            "kind": self.kind.code(),
            "message": self.message,
            "path": self.path.to_json(),
        });
        if let Value::Object(map) = &mut value {
            if let Some(actual) = &self.actual {
                map.insert("actual".into(), actual.clone());
            }
            if let Some(expected) = &self.expected {
                map.insert("expected".into(), expected.clone());
            }
        }
        value
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}: {}", self.kind, self.message)
        } else {
            write!(f, "[{}] {}: {}", self.path, self.kind, self.message)
        }
    }
}

// ============================================================================
// AGGREGATE ERROR
// ============================================================================

/// Every issue of a non-conforming validation, raised as one error.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateValidationError {
    issues: Vec<ValidationIssue>,
}

impl AggregateValidationError {
    pub(crate) fn new(issues: Vec<ValidationIssue>) -> Self {
        Self { issues }
    }

    /// Returns all issues, in the order they were found.
    #[must_use]
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    /// Consumes the error and returns the issues.
    #[must_use]
    pub fn into_issues(self) -> Vec<ValidationIssue> {
        self.issues
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

impl fmt::Display for AggregateValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed with {} issue(s):", self.issues.len())?;
        for (i, issue) in self.issues.iter().enumerate() {
            write!(f, "\n  {}. {}", i + 1, issue)?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateValidationError {}
