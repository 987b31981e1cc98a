//! Taxonomy bootstrap from seed files
//!
//! A seed file nests the hierarchy, so a category can't be declared without
//! its focus area and a work type can't be declared without its category.
//! Ids are optional; a missing id is derived from the label and prefixed
//! with the parent id. Two nodes of the same kind that resolve to the same
//! id, or a label that derives to nothing, make the seed invalid. Seeding
//! only ever creates nodes and can be re-run.
//!
//! ```toml
//! [[focus_areas]]
//! id = "design"
//! label = "Design"
//!
//! [[focus_areas.categories]]
//! id = "design-ux"
//! label = "UX"
//!
//! [[focus_areas.categories.work_types]]
//! id = "design-ux-01-research"
//! label = "Research"
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};

use super::entity::{FocusArea, WorkCategory, WorkType};
use super::repository::TaxonomyStore;
use super::slug;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaxonomySeed {
    #[serde(default)]
    pub focus_areas: Vec<FocusAreaSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusAreaSeed {
    #[serde(default)]
    pub id: Option<String>,
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub categories: Vec<CategorySeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySeed {
    #[serde(default)]
    pub id: Option<String>,
    pub label: String,
    #[serde(default)]
    pub work_types: Vec<WorkTypeSeed>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkTypeSeed {
    #[serde(default)]
    pub id: Option<String>,
    pub label: String,
}

/// Counts from applying a seed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedReport {
    pub focus_areas_created: usize,
    pub categories_created: usize,
    pub work_types_created: usize,
    /// Nodes that already existed and were left untouched
    pub unchanged: usize,
}

impl SeedReport {
    pub fn created(&self) -> usize {
        self.focus_areas_created + self.categories_created + self.work_types_created
    }
}

impl TaxonomySeed {
    /// Parse a seed from TOML
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Seed(e.to_string()))
    }

    /// Parse a seed from JSON
    pub fn from_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).map_err(|e| Error::Seed(e.to_string()))
    }

    /// Load a seed file, choosing the format by extension (`.json` or TOML)
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let seed = if is_json(path) {
            Self::from_json(&contents)?
        } else {
            Self::from_toml(&contents)?
        };
        seed.validate()?;
        Ok(seed)
    }

    /// Reject blank labels, labels that derive to an empty id, and ids
    /// claimed by two nodes of the same kind
    pub fn validate(&self) -> Result<()> {
        let mut focus_area_ids = HashMap::new();
        let mut category_ids = HashMap::new();
        let mut work_type_ids = HashMap::new();

        for area in &self.focus_areas {
            check_label("focus area", "the seed", &area.label, area.id.as_deref())?;
            let area_id = area.resolved_id();
            claim(&mut focus_area_ids, "focus area", &area_id, &area.label)?;

            for category in &area.categories {
                check_label("category", &area_id, &category.label, category.id.as_deref())?;
                let category_id = category.resolved_id(&area_id);
                claim(&mut category_ids, "category", &category_id, &category.label)?;

                for work_type in &category.work_types {
                    check_label(
                        "work type",
                        &category_id,
                        &work_type.label,
                        work_type.id.as_deref(),
                    )?;
                    let work_type_id = work_type.resolved_id(&category_id);
                    claim(&mut work_type_ids, "work type", &work_type_id, &work_type.label)?;
                }
            }
        }
        Ok(())
    }

    /// Upsert every node into the store, parents before children
    pub async fn apply(&self, store: &dyn TaxonomyStore) -> Result<SeedReport> {
        self.validate()?;
        let mut report = SeedReport::default();

        for area in &self.focus_areas {
            let area_id = area.resolved_id();
            let focus_area =
                FocusArea::new(&area_id, &area.label).with_description(&area.description);
            if store.upsert_focus_area(&focus_area).await? {
                report.focus_areas_created += 1;
            } else {
                report.unchanged += 1;
            }

            for category in &area.categories {
                let category_id = category.resolved_id(&area_id);
                let work_category = WorkCategory::new(&category_id, &category.label, &area_id);
                if store.upsert_work_category(&work_category).await? {
                    report.categories_created += 1;
                } else {
                    report.unchanged += 1;
                }

                for work_type in &category.work_types {
                    let work_type_id = work_type.resolved_id(&category_id);
                    let node = WorkType::new(&work_type_id, &work_type.label, &category_id);
                    if store.upsert_work_type(&node).await? {
                        report.work_types_created += 1;
                    } else {
                        report.unchanged += 1;
                    }
                }
            }
        }

        info!(
            created = report.created(),
            unchanged = report.unchanged,
            "Taxonomy seed applied"
        );
        Ok(report)
    }
}

impl FocusAreaSeed {
    fn resolved_id(&self) -> String {
        self.id.clone().unwrap_or_else(|| slug::derive(&self.label))
    }
}

impl CategorySeed {
    fn resolved_id(&self, focus_area_id: &str) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| slug::child_id(focus_area_id, &self.label))
    }
}

impl WorkTypeSeed {
    fn resolved_id(&self, category_id: &str) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| slug::child_id(category_id, &self.label))
    }
}

fn check_label(kind: &str, parent: &str, label: &str, id: Option<&str>) -> Result<()> {
    if label.trim().is_empty() {
        return Err(Error::Seed(format!("{} under {} has an empty label", kind, parent)));
    }
    let usable = match id {
        Some(id) => !id.trim().is_empty(),
        None => !slug::derive(label).is_empty(),
    };
    if !usable {
        return Err(Error::Seed(format!(
            "{} '{}' under {} has no usable id",
            kind, label, parent
        )));
    }
    Ok(())
}

/// Record `id` for `label`, failing if another node of the same kind holds it
fn claim(ids: &mut HashMap<String, String>, kind: &str, id: &str, label: &str) -> Result<()> {
    if let Some(existing) = ids.insert(id.to_string(), label.to_string()) {
        return Err(Error::Seed(format!(
            "{} '{}' and '{}' both resolve to id '{}'; give one an explicit id",
            kind, existing, label, id
        )));
    }
    Ok(())
}

pub(crate) fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::taxonomy::InMemoryTaxonomyStore;

    const SEED: &str = r#"
        [[focus_areas]]
        id = "design"
        label = "Design"
        description = "Product and UX design"

        [[focus_areas.categories]]
        id = "design-ux"
        label = "UX"

        [[focus_areas.categories.work_types]]
        id = "design-ux-01-research"
        label = "Research"

        [[focus_areas.categories.work_types]]
        label = "Wireframing"

        [[focus_areas]]
        label = "Operations"

        [[focus_areas.categories]]
        label = "Infrastructure & Cloud"
    "#;

    #[tokio::test]
    async fn test_apply_seed_derives_ids() {
        let store = InMemoryTaxonomyStore::new();
        let seed = TaxonomySeed::from_toml(SEED).unwrap();
        seed.validate().unwrap();

        let report = seed.apply(&store).await.unwrap();
        assert_eq!(report.focus_areas_created, 2);
        assert_eq!(report.categories_created, 2);
        assert_eq!(report.work_types_created, 2);

        assert!(store.work_type_exists("design-ux-wireframing").await.unwrap());
        assert!(
            store
                .get_work_category("operations-infrastructure-cloud")
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_apply_seed_twice_is_noop() {
        let store = InMemoryTaxonomyStore::new();
        let seed = TaxonomySeed::from_toml(SEED).unwrap();

        seed.apply(&store).await.unwrap();
        let second = seed.apply(&store).await.unwrap();

        assert_eq!(second.created(), 0);
        assert_eq!(second.unchanged, 6);
    }

    #[test]
    fn test_validate_rejects_blank_labels() {
        let seed = TaxonomySeed::from_json(
            r#"{"focus_areas":[{"label":"Design","categories":[{"label":"  "}]}]}"#,
        )
        .unwrap();
        assert!(matches!(seed.validate(), Err(Error::Seed(_))));
    }

    #[test]
    fn test_validate_rejects_colliding_sibling_ids() {
        let seed = TaxonomySeed::from_toml(
            r#"
            [[focus_areas]]
            id = "design"
            label = "Design"

            [[focus_areas.categories]]
            label = "UX & Research"

            [[focus_areas.categories]]
            label = "UX Research"
            "#,
        )
        .unwrap();

        let err = seed.validate().unwrap_err();
        assert!(matches!(err, Error::Seed(_)));
        assert!(err.to_string().contains("design-ux-research"));
    }

    #[tokio::test]
    async fn test_apply_refuses_colliding_seed() {
        let store = InMemoryTaxonomyStore::new();
        let seed = TaxonomySeed::from_toml(
            r#"
            [[focus_areas]]
            id = "design"
            label = "Design"

            [[focus_areas.categories]]
            label = "UX & Research"

            [[focus_areas.categories.work_types]]
            label = "Interviews"

            [[focus_areas.categories]]
            label = "UX Research"

            [[focus_areas.categories.work_types]]
            label = "Surveys"
            "#,
        )
        .unwrap();

        assert!(matches!(seed.apply(&store).await, Err(Error::Seed(_))));
        assert!(store.list_focus_areas().await.unwrap().is_empty());
    }

    #[test]
    fn test_validate_rejects_labels_without_slug() {
        let category = TaxonomySeed::from_json(
            r#"{"focus_areas":[{"id":"design","label":"Design","categories":[{"label":"&&"}]}]}"#,
        )
        .unwrap();
        assert!(matches!(category.validate(), Err(Error::Seed(_))));

        let work_type = TaxonomySeed::from_json(
            r#"{"focus_areas":[{"id":"design","label":"Design","categories":[
                {"id":"design-ux","label":"UX","work_types":[{"label":"&&"}]}]}]}"#,
        )
        .unwrap();
        assert!(matches!(work_type.validate(), Err(Error::Seed(_))));

        // An explicit id makes a symbol-only label acceptable
        let explicit = TaxonomySeed::from_json(
            r#"{"focus_areas":[{"id":"design","label":"Design","categories":[
                {"id":"design-amp","label":"&&"}]}]}"#,
        )
        .unwrap();
        assert!(explicit.validate().is_ok());
    }

    #[test]
    fn test_is_json() {
        assert!(is_json(Path::new("seed.JSON")));
        assert!(!is_json(Path::new("seed.toml")));
        assert!(!is_json(Path::new("seed")));
    }
}
