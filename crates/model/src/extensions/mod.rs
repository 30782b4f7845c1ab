//! Extensions registered by [`ModelContext::create`](crate::ModelContext::create).

mod constraints;
mod core_types;

pub use constraints::{ConstraintExt, constraints};
pub use core_types::core_types;
