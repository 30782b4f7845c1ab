//! Context configuration.
//!
//! ```
//! use mosaic_model::{ContextConfig, ModelContext};
//!
//! let config = ContextConfig::from_json_str(r#"{"defaults": {"strict": true}}"#)?;
//! let mut ctx = ModelContext::create();
//! ctx.use_config(config)?;
//! assert!(ctx.string().spec().is_strict());
//! # Ok::<(), mosaic_model::ModelError>(())
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ModelError;

/// Flag values seeded into every model a context builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelDefaults {
    pub required: bool,
    pub strict: bool,
    pub nullable: bool,
}

impl Default for ModelDefaults {
    fn default() -> Self {
        Self {
            required: true,
            strict: false,
            nullable: false,
        }
    }
}

/// Everything a context can be configured with from plain data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContextConfig {
    pub defaults: ModelDefaults,
}

impl ContextConfig {
    pub fn from_json_str(input: &str) -> Result<Self, ModelError> {
        serde_json::from_str(input).map_err(config_error)
    }

    pub fn from_value(value: Value) -> Result<Self, ModelError> {
        serde_json::from_value(value).map_err(config_error)
    }
}

fn config_error(err: serde_json::Error) -> ModelError {
    ModelError::Config {
        reason: err.to_string(),
    }
}
