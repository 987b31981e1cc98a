//! Repository trait for taxonomy persistence
//!
//! The store is the single writer of record for focus areas, categories,
//! work types, skills and their associations. Components receive it
//! explicitly as an `Arc<dyn TaxonomyStore>`; uniqueness is enforced at this
//! boundary, so concurrent maintenance passes stay consistent without any
//! application-level locking.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;

use super::entity::{FocusArea, Skill, WorkCategory, WorkType};

/// Upper bound on `-N` suffixes tried when a derived skill id is taken
pub const MAX_ID_ATTEMPTS: u32 = 1000;

/// Repository trait for the taxonomy graph
#[async_trait]
pub trait TaxonomyStore: Send + Sync {
    // ========== Hierarchy Writes ==========

    /// Create the focus area if no row with its id exists. Never overwrites.
    ///
    /// Returns `true` if a row was created.
    async fn upsert_focus_area(&self, focus_area: &FocusArea) -> Result<bool>;

    /// Create the work category if absent.
    ///
    /// Fails with `FocusAreaNotFound` when the owner does not exist.
    async fn upsert_work_category(&self, category: &WorkCategory) -> Result<bool>;

    /// Create the work type if absent.
    ///
    /// Fails with `WorkCategoryNotFound` when the owner does not exist.
    async fn upsert_work_type(&self, work_type: &WorkType) -> Result<bool>;

    // ========== Skills ==========

    /// Case-insensitive, whitespace-normalized lookup by name
    async fn find_skill_by_name_ci(&self, name: &str) -> Result<Option<Skill>>;

    /// Create a skill with an id derived from its name
    ///
    /// Suffixes (`-1`, `-2`, ...) are appended while the derived id belongs to
    /// a differently-named skill. Returns `DuplicateSkillName` if a skill with
    /// the same normalized name already exists.
    async fn create_skill(&self, name: &str, category: Option<&str>) -> Result<Skill>;

    /// List every skill ordered by name
    async fn list_skills(&self) -> Result<Vec<Skill>>;

    /// Skills linked to a work type, ordered by name
    async fn skills_for_work_type(&self, work_type_id: &str) -> Result<Vec<Skill>>;

    // ========== Associations ==========

    /// Link a skill to a work type
    ///
    /// Returns `false` without error if the pair already exists.
    async fn link_work_type_skill(&self, work_type_id: &str, skill_id: &str) -> Result<bool>;

    /// Whether the pair is linked
    async fn link_exists(&self, work_type_id: &str, skill_id: &str) -> Result<bool>;

    /// Number of linked skills per work type; work types without links are absent
    async fn work_type_skill_counts(&self) -> Result<HashMap<String, u32>>;

    // ========== Existence / Reads ==========

    async fn work_type_exists(&self, work_type_id: &str) -> Result<bool>;

    async fn skill_exists(&self, skill_id: &str) -> Result<bool>;

    async fn get_focus_area(&self, id: &str) -> Result<Option<FocusArea>>;

    async fn get_work_category(&self, id: &str) -> Result<Option<WorkCategory>>;

    /// All focus areas ordered by id
    async fn list_focus_areas(&self) -> Result<Vec<FocusArea>>;

    /// All work categories ordered by id
    async fn list_work_categories(&self) -> Result<Vec<WorkCategory>>;

    /// All work types ordered by id
    async fn list_work_types(&self) -> Result<Vec<WorkType>>;
}
