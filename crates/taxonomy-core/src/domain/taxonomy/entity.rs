//! Taxonomy entity types
//!
//! The hierarchy is FocusArea → WorkCategory → WorkType, with skills attached
//! to work types through the `work_type_skills` association table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::slug;

/// Top-level persona/domain grouping (e.g. "Design", "Operations")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusArea {
    pub id: String,
    pub label: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl FocusArea {
    /// Create a focus area with an explicit id
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: String::new(),
            created_at: Utc::now(),
        }
    }

    /// Create a focus area whose id is derived from its label
    pub fn from_label(label: impl Into<String>) -> Self {
        let label = label.into();
        Self::new(slug::derive(&label), label)
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Thematic grouping within a focus area
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkCategory {
    pub id: String,
    pub label: String,
    pub focus_area_id: String,
    pub created_at: DateTime<Utc>,
}

impl WorkCategory {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        focus_area_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            focus_area_id: focus_area_id.into(),
            created_at: Utc::now(),
        }
    }
}

/// Classifiable unit of work that skills attach to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkType {
    pub id: String,
    pub label: String,
    pub work_category_id: String,
    pub created_at: DateTime<Utc>,
}

impl WorkType {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        work_category_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            work_category_id: work_category_id.into(),
            created_at: Utc::now(),
        }
    }
}

/// A named competency, unique under case-insensitive comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub id: String,
    /// Display name as first supplied (whitespace-normalized)
    pub name: String,
    /// Optional descriptive tag
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Skill {
    /// Natural key for this skill's name
    pub fn name_key(&self) -> String {
        slug::name_key(&self.name)
    }

    /// Whether `name` refers to this skill under case-insensitive matching
    pub fn matches_name(&self, name: &str) -> bool {
        self.name_key() == slug::name_key(name)
    }
}

/// Lightweight reference to a work category, used in coverage reports
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: String,
    pub label: String,
    pub focus_area_id: String,
}

impl From<&WorkCategory> for CategoryRef {
    fn from(category: &WorkCategory) -> Self {
        Self {
            id: category.id.clone(),
            label: category.label.clone(),
            focus_area_id: category.focus_area_id.clone(),
        }
    }
}

/// Lightweight reference to a work type, used in coverage reports
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkTypeRef {
    pub id: String,
    pub label: String,
    pub work_category_id: String,
    /// Number of skills linked when the reference was taken
    pub skill_count: u32,
}

impl WorkTypeRef {
    pub fn from_work_type(work_type: &WorkType, skill_count: u32) -> Self {
        Self {
            id: work_type.id.clone(),
            label: work_type.label.clone(),
            work_category_id: work_type.work_category_id.clone(),
            skill_count,
        }
    }
}
