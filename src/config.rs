//! Configuration loader and schema types.
//!
//! This module exposes the configuration schema used to drive runtime
//! behavior and helpers to resolve config, data and state paths.

mod load;
mod schema;

pub use load::resolve_config_path;
pub use schema::*;
