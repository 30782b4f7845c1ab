//! Validating an incoming request body.
//!
//! Run with `RUST_LOG=mosaic_model=trace` to see the pipeline at work.

use mosaic_model::prelude::*;
use serde_json::json;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), ModelError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let ctx = ModelContext::create();
    let body = ctx
        .object_of([
            ("title", ctx.string().length(1, 120)),
            ("priority", ctx.integer().min(1.0).max(5.0).default_value(3)),
            ("due", ctx.date().optional()),
            ("labels", ctx.array_of(ctx.string()).optional()),
        ])?
        .strict(true);

    let ok = body.validate(json!({
        "title": "Write docs",
        "priority": "2",
        "due": "2024-06-01",
    }));
    println!("valid request -> {}", ok.to_json());

    let bad = body.validate(json!({
        "priority": 9,
        "labels": ["docs", 7],
        "assignee": "nobody",
    }));
    match body.try_validate(json!({"priority": 9})) {
        Ok(value) => println!("unexpectedly valid: {value}"),
        Err(err) => println!("{err}"),
    }
    println!("invalid request -> {}", bad.to_json());

    Ok(())
}
