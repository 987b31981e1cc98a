//! Taxonomy graph domain module
//!
//! ## Data Model
//!
//! ```text
//! FocusArea ──< WorkCategory ──< WorkType >──< Skill
//!                                   (work_type_skills)
//! ```
//!
//! - **FocusArea**: top-level persona/domain grouping
//! - **WorkCategory**: thematic subdivision owned by one focus area
//! - **WorkType**: classifiable unit of work owned by one category
//! - **Skill**: named competency, unique under case-insensitive comparison
//!
//! Nodes are append-only. All writes go through a [`TaxonomyStore`], which is
//! the only place uniqueness and ownership are enforced.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use taxonomy_core::domain::taxonomy::{FocusArea, TaxonomyStore};
//!
//! store.upsert_focus_area(&FocusArea::from_label("Design")).await?;
//! let skill = store.create_skill("User Research", None).await?;
//! store.link_work_type_skill("design-ux-01-research", &skill.id).await?;
//! ```

mod entity;
mod memory;
mod repository;
mod seed;
pub mod slug;

pub use entity::{CategoryRef, FocusArea, Skill, WorkCategory, WorkType, WorkTypeRef};
pub use memory::InMemoryTaxonomyStore;
pub use repository::{MAX_ID_ATTEMPTS, TaxonomyStore};
pub use seed::{CategorySeed, FocusAreaSeed, SeedReport, TaxonomySeed, WorkTypeSeed};

pub(crate) use seed::is_json;
