//! AI Response Validation
//!
//! Turns raw model text into a JSON object, repairing common defects along
//! the way. Schema-level defaults are applied later when the object is
//! decoded into a plan.

mod json_repair;

pub use json_repair::{JsonRepairer, RepairStage, repair};
