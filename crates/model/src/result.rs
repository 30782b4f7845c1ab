//! The validation accumulator threaded through every pipeline phase.

use std::fmt;
use std::sync::Arc;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use smallvec::SmallVec;

use crate::error::{ValidationIssue, Violation};

// ============================================================================
// PATH
// ============================================================================

/// One step into a value: an object key or an array index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        Self::Key(key.to_owned())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "[{index}]"),
        }
    }
}

/// Location of a node inside the root value. Empty means the root itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(SmallVec<[PathSegment; 8]>);

impl Path {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new path with `segment` appended.
    #[must_use]
    pub fn child(&self, segment: impl Into<PathSegment>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// The path as a JSON array of keys and indices.
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Array(
            self.0
                .iter()
                .map(|segment| match segment {
                    PathSegment::Key(key) => Value::String(key.clone()),
                    PathSegment::Index(index) => Value::from(*index),
                })
                .collect(),
        )
    }
}

impl FromIterator<PathSegment> for Path {
    fn from_iter<I: IntoIterator<Item = PathSegment>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Vec<PathSegment>> for Path {
    fn from(segments: Vec<PathSegment>) -> Self {
        Self(SmallVec::from_vec(segments))
    }
}

/// Renders as `items[2].name`.
impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if i > 0 => write!(f, ".{key}")?,
                segment => write!(f, "{segment}")?,
            }
        }
        Ok(())
    }
}

// ============================================================================
// VALIDATION RESULT
// ============================================================================

static NULL: Value = Value::Null;

/// State of one validation call at one node.
///
/// `value` is `None` when the input is undefined (a missing key), which the
/// pipeline keeps distinct from an explicit `null`.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    value: Option<Value>,
    root_value: Arc<Value>,
    path: Path,
    errors: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Creates the result for a top-level call.
    pub(crate) fn root(input: Option<Value>) -> Self {
        let root_value = Arc::new(input.clone().unwrap_or(Value::Null));
        Self {
            value: input,
            root_value,
            path: Path::new(),
            errors: Vec::new(),
        }
    }

    /// The current value, `None` when undefined.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// The current value, with undefined read as `null`.
    #[must_use]
    pub fn current(&self) -> &Value {
        self.value.as_ref().unwrap_or(&NULL)
    }

    #[must_use]
    pub fn into_value(self) -> Option<Value> {
        self.value
    }

    /// The top-level input as it was passed in (`null` when undefined).
    #[must_use]
    pub fn root_value(&self) -> &Value {
        &self.root_value
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every issue recorded so far, in discovery order.
    #[must_use]
    pub fn errors(&self) -> &[ValidationIssue] {
        &self.errors
    }

    #[must_use]
    pub fn into_errors(self) -> Vec<ValidationIssue> {
        self.errors
    }

    #[must_use]
    pub fn conforms(&self) -> bool {
        self.errors.is_empty()
    }

    /// `{conforms, value, errors}`, with `value` omitted when undefined.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert("conforms".into(), Value::Bool(self.conforms()));
        if let Some(value) = &self.value {
            map.insert("value".into(), value.clone());
        }
        map.insert(
            "errors".into(),
            Value::Array(self.errors.iter().map(ValidationIssue::to_json).collect()),
        );
        Value::Object(map)
    }

    pub(crate) fn set_value(&mut self, value: Option<Value>) {
        self.value = value;
    }

    pub(crate) fn take_value(&mut self) -> Option<Value> {
        self.value.take()
    }

    /// Records a violation at the current path.
    pub(crate) fn push(&mut self, violation: Violation) {
        let path = self.path.clone();
        self.push_at(path, violation);
    }

    pub(crate) fn push_at(&mut self, path: Path, violation: Violation) {
        self.errors.push(ValidationIssue::at(violation, path));
    }

    /// A view for a child node: same root, extended path, no errors yet.
    pub(crate) fn descend(&self, segment: impl Into<PathSegment>, value: Option<Value>) -> Self {
        Self {
            value,
            root_value: Arc::clone(&self.root_value),
            path: self.path.child(segment),
            errors: Vec::new(),
        }
    }

    /// Appends a finished child's issues and returns its final value.
    pub(crate) fn absorb(&mut self, child: Self) -> Option<Value> {
        self.errors.extend(child.errors);
        child.value
    }
}

impl Serialize for ValidationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.value.is_some() { 3 } else { 2 };
        let mut state = serializer.serialize_struct("ValidationResult", len)?;
        state.serialize_field("conforms", &self.conforms())?;
        if let Some(value) = &self.value {
            state.serialize_field("value", value)?;
        } else {
            state.skip_field("value")?;
        }
        state.serialize_field("errors", &self.errors)?;
        state.end()
    }
}
