//! Skill resolution and batch mapping
//!
//! [`SkillResolver`] turns free-text names into skill rows; [`MappingEngine`]
//! attaches resolved skills to work types and reports what happened to each
//! item.

mod batch;
mod engine;
mod resolver;

pub use batch::MappingBatch;
pub use engine::{LinkOutcome, LinkStatus, MappingEngine, MappingReport, MappingRequest};
pub use resolver::{ResolvedSkill, SkillResolver};
