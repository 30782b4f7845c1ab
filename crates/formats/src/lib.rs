//! # mosaic-formats
//!
//! Domain formats for `mosaic-model`, shipped as one [`Extension`]:
//!
//! | builder      | kind     | format       | behaviour                                   |
//! |--------------|----------|--------------|---------------------------------------------|
//! | `email`      | `string` | `email`      | trimmed, checked against an address pattern |
//! | `uuid`       | `string` | `uuid`       | normalised to lowercase hyphenated form     |
//! | `url`        | `string` | `url`        | trimmed, must parse as an absolute URL      |
//! | `uuid-Id`    | `string` | `uuid`       | `uuid` with a random v4 default, marked as primary key |
//! | `created-at` | `date`   | `created-at` | defaults to the current time                |
//!
//! ```
//! use mosaic_model::ModelContext;
//! use serde_json::json;
//!
//! let mut ctx = ModelContext::create();
//! ctx.use_extension(mosaic_formats::formats())?;
//!
//! let user = ctx.object_of([("id", ctx.build("uuid-Id")?), ("email", ctx.build("email")?)])?;
//! let result = user.validate(json!({"email": " ada@example.com "}));
//! assert!(result.conforms());
//! assert_eq!(result.value().unwrap()["email"], "ada@example.com");
//! # Ok::<(), mosaic_model::ModelError>(())
//! ```

use std::sync::LazyLock;

use chrono::Utc;
use mosaic_model::types::format_date;
use mosaic_model::{Extension, TypeKind, ValidationResult, Violation};
use regex::Regex;
use serde_json::{Value, json};
use url::Url;
use uuid::Uuid;

pub const EMAIL: &str = "email";
pub const UUID: &str = "uuid";
pub const URL: &str = "url";
pub const CREATED_AT: &str = "created-at";

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("email pattern compiles")
});

/// The `formats` extension.
#[must_use]
pub fn formats() -> Extension {
    Extension::new("formats")
        .with_format(TypeKind::String, EMAIL)
        .with_format(TypeKind::String, UUID)
        .with_format(TypeKind::String, URL)
        .with_format(TypeKind::Date, CREATED_AT)
        .with_builder(EMAIL, TypeKind::String, Some(EMAIL))
        .with_builder(UUID, TypeKind::String, Some(UUID))
        .with_builder(URL, TypeKind::String, Some(URL))
        .with_configured_builder("uuid-Id", TypeKind::String, Some(UUID), |model| {
            model
                .default_with(|_| json!(Uuid::new_v4().to_string()))
                .constrain(json!({"primaryKey": true}))
        })
        .with_configured_builder(CREATED_AT, TypeKind::Date, Some(CREATED_AT), |model| {
            model.default_with(|_| json!(format_date(&Utc::now())))
        })
        .with_coercion(TypeKind::String, Some(EMAIL), |_, r| trimmed(r))
        .with_validation(TypeKind::String, Some(EMAIL), |_, r| {
            check(r, EMAIL, |s| EMAIL_REGEX.is_match(s))
        })
        .with_coercion(TypeKind::String, Some(UUID), |_, r| normalise_uuid(r))
        .with_validation(TypeKind::String, Some(UUID), |_, r| {
            check(r, UUID, |s| Uuid::parse_str(s).is_ok())
        })
        .with_coercion(TypeKind::String, Some(URL), |_, r| trimmed(r))
        .with_validation(TypeKind::String, Some(URL), |_, r| {
            check(r, URL, |s| Url::parse(s).is_ok())
        })
}

fn trimmed(result: &ValidationResult) -> Option<Value> {
    let text = result.current().as_str()?;
    let trimmed = text.trim();
    (trimmed.len() != text.len()).then(|| Value::from(trimmed))
}

fn normalise_uuid(result: &ValidationResult) -> Option<Value> {
    let text = result.current().as_str()?;
    let canonical = Uuid::parse_str(text.trim()).ok()?.hyphenated().to_string();
    (canonical != text).then(|| Value::String(canonical))
}

/// Runs `is_valid` on string values; other types are left to the type check.
fn check(
    result: &ValidationResult,
    format: &str,
    is_valid: impl Fn(&str) -> bool,
) -> Result<(), Violation> {
    match result.current().as_str() {
        Some(text) if !is_valid(text) => Err(Violation::format(format, result.current())),
        _ => Ok(()),
    }
}
