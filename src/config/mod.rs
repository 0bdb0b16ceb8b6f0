//! Configuration Management
//!
//! Unified configuration system with hierarchical resolution:
//! 1. Built-in defaults
//! 2. TOML file (`--config` or `./fitplan.toml`)
//! 3. Environment variables (FITPLAN_*)
//! 4. CLI arguments (highest priority)

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::*;
