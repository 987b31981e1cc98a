//! SQLite implementation of the TaxonomyStore
//!
//! Uniqueness is enforced by the schema: `skills.normalized_name` carries a
//! unique index and `work_type_skills` is keyed on the pair. Every insert uses
//! `ON CONFLICT DO NOTHING` and inspects `rows_affected`, so two processes
//! racing on the same row both succeed and exactly one of them creates it.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info, warn};

use crate::domain::taxonomy::{
    FocusArea, MAX_ID_ATTEMPTS, Skill, TaxonomyStore, WorkCategory, WorkType, slug,
};
use crate::error::{Error, Result};

/// SQLite implementation of the taxonomy store
#[derive(Clone)]
pub struct SqliteTaxonomyStore {
    pool: SqlitePool,
}

impl SqliteTaxonomyStore {
    /// Create a new SQLite taxonomy store
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn focus_area_exists(&self, id: &str) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM focus_areas WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn work_category_exists(&self, id: &str) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM work_categories WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn find_skill_by_key(&self, key: &str) -> Result<Option<Skill>> {
        let row: Option<SkillRow> =
            sqlx::query_as("SELECT id, name, category, created_at FROM skills WHERE normalized_name = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(SkillRow::into_skill))
    }
}

#[async_trait]
impl TaxonomyStore for SqliteTaxonomyStore {
    // ========== Hierarchy Writes ==========

    async fn upsert_focus_area(&self, focus_area: &FocusArea) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO focus_areas (id, label, description, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(&focus_area.id)
        .bind(&focus_area.label)
        .bind(&focus_area.description)
        .bind(focus_area.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        let created = result.rows_affected() > 0;
        if created {
            info!(focus_area_id = %focus_area.id, "Focus area created");
        } else {
            debug!(focus_area_id = %focus_area.id, "Focus area already present");
        }
        Ok(created)
    }

    async fn upsert_work_category(&self, category: &WorkCategory) -> Result<bool> {
        if !self.focus_area_exists(&category.focus_area_id).await? {
            return Err(Error::FocusAreaNotFound(category.focus_area_id.clone()));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO work_categories (id, label, focus_area_id, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(&category.id)
        .bind(&category.label)
        .bind(&category.focus_area_id)
        .bind(category.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        let created = result.rows_affected() > 0;
        if created {
            info!(work_category_id = %category.id, focus_area_id = %category.focus_area_id, "Work category created");
        }
        Ok(created)
    }

    async fn upsert_work_type(&self, work_type: &WorkType) -> Result<bool> {
        if !self.work_category_exists(&work_type.work_category_id).await? {
            return Err(Error::WorkCategoryNotFound(
                work_type.work_category_id.clone(),
            ));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO work_types (id, label, work_category_id, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(&work_type.id)
        .bind(&work_type.label)
        .bind(&work_type.work_category_id)
        .bind(work_type.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        let created = result.rows_affected() > 0;
        if created {
            info!(work_type_id = %work_type.id, work_category_id = %work_type.work_category_id, "Work type created");
        }
        Ok(created)
    }

    // ========== Skills ==========

    async fn find_skill_by_name_ci(&self, name: &str) -> Result<Option<Skill>> {
        let key = slug::name_key(name);
        if key.is_empty() {
            return Ok(None);
        }
        self.find_skill_by_key(&key).await
    }

    async fn create_skill(&self, name: &str, category: Option<&str>) -> Result<Skill> {
        let display_name = slug::normalize_name(name);
        if display_name.is_empty() {
            return Err(Error::InvalidInput("skill name is empty".to_string()));
        }
        let key = display_name.to_lowercase();
        let base = slug::skill_id_base(&display_name);
        let created_at = Utc::now();

        for attempt in 0..MAX_ID_ATTEMPTS {
            let id = slug::with_suffix(&base, attempt);

            let result = sqlx::query(
                r#"
                INSERT INTO skills (id, name, normalized_name, category, created_at)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(&id)
            .bind(&display_name)
            .bind(&key)
            .bind(category)
            .bind(created_at.to_rfc3339())
            .execute(&self.pool)
            .await?;

            if result.rows_affected() > 0 {
                info!(skill_id = %id, skill_name = %display_name, "Skill created");
                return Ok(Skill {
                    id,
                    name: display_name,
                    category: category.map(str::to_string),
                    created_at,
                });
            }

            // Either the name or the id is taken. A name clash means another
            // writer got there first; an id clash means try the next suffix.
            if let Some(existing) = self.find_skill_by_key(&key).await? {
                return Err(Error::DuplicateSkillName(existing.name));
            }
            debug!(skill_id = %id, skill_name = %display_name, "Derived skill id taken, trying next suffix");
        }

        Err(Error::IdSpaceExhausted(base, MAX_ID_ATTEMPTS))
    }

    async fn list_skills(&self) -> Result<Vec<Skill>> {
        let rows: Vec<SkillRow> =
            sqlx::query_as("SELECT id, name, category, created_at FROM skills ORDER BY normalized_name, id")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(SkillRow::into_skill).collect())
    }

    async fn skills_for_work_type(&self, work_type_id: &str) -> Result<Vec<Skill>> {
        let rows: Vec<SkillRow> = sqlx::query_as(
            r#"
            SELECT s.id, s.name, s.category, s.created_at FROM skills s
            JOIN work_type_skills wts ON wts.skill_id = s.id
            WHERE wts.work_type_id = ?
            ORDER BY s.normalized_name, s.id
            "#,
        )
        .bind(work_type_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(SkillRow::into_skill).collect())
    }

    // ========== Associations ==========

    async fn link_work_type_skill(&self, work_type_id: &str, skill_id: &str) -> Result<bool> {
        if !self.work_type_exists(work_type_id).await? {
            return Err(Error::WorkTypeNotFound(work_type_id.to_string()));
        }
        if !self.skill_exists(skill_id).await? {
            return Err(Error::SkillNotFound(skill_id.to_string()));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO work_type_skills (work_type_id, skill_id, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(work_type_id, skill_id) DO NOTHING
            "#,
        )
        .bind(work_type_id)
        .bind(skill_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        let created = result.rows_affected() > 0;
        if created {
            debug!(work_type_id = %work_type_id, skill_id = %skill_id, "Skill linked to work type");
        }
        Ok(created)
    }

    async fn link_exists(&self, work_type_id: &str, skill_id: &str) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM work_type_skills WHERE work_type_id = ? AND skill_id = ?",
        )
        .bind(work_type_id)
        .bind(skill_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    async fn work_type_skill_counts(&self) -> Result<HashMap<String, u32>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT work_type_id, COUNT(*) AS skill_count
            FROM work_type_skills
            GROUP BY work_type_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, count)| (id, count.max(0) as u32))
            .collect())
    }

    // ========== Existence / Reads ==========

    async fn work_type_exists(&self, work_type_id: &str) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM work_types WHERE id = ?")
            .bind(work_type_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn skill_exists(&self, skill_id: &str) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM skills WHERE id = ?")
            .bind(skill_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn get_focus_area(&self, id: &str) -> Result<Option<FocusArea>> {
        let row: Option<FocusAreaRow> = sqlx::query_as("SELECT * FROM focus_areas WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(FocusAreaRow::into_focus_area))
    }

    async fn get_work_category(&self, id: &str) -> Result<Option<WorkCategory>> {
        let row: Option<WorkCategoryRow> =
            sqlx::query_as("SELECT * FROM work_categories WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(WorkCategoryRow::into_work_category))
    }

    async fn list_focus_areas(&self) -> Result<Vec<FocusArea>> {
        let rows: Vec<FocusAreaRow> = sqlx::query_as("SELECT * FROM focus_areas ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(FocusAreaRow::into_focus_area).collect())
    }

    async fn list_work_categories(&self) -> Result<Vec<WorkCategory>> {
        let rows: Vec<WorkCategoryRow> =
            sqlx::query_as("SELECT * FROM work_categories ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows
            .into_iter()
            .map(WorkCategoryRow::into_work_category)
            .collect())
    }

    async fn list_work_types(&self) -> Result<Vec<WorkType>> {
        let rows: Vec<WorkTypeRow> = sqlx::query_as("SELECT * FROM work_types ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(WorkTypeRow::into_work_type).collect())
    }
}

// ========== Row Types ==========

/// Parse a stored RFC 3339 timestamp, substituting now for a corrupt value
fn parse_timestamp(value: &str, row_id: &str) -> DateTime<Utc> {
    match DateTime::parse_from_rfc3339(value) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(e) => {
            warn!(row_id = %row_id, value = %value, error = %e, "Invalid created_at timestamp, using now");
            Utc::now()
        }
    }
}

#[derive(FromRow)]
struct FocusAreaRow {
    id: String,
    label: String,
    description: String,
    created_at: String,
}

impl FocusAreaRow {
    fn into_focus_area(self) -> FocusArea {
        FocusArea {
            label: self.label,
            description: self.description,
            created_at: parse_timestamp(&self.created_at, &self.id),
            id: self.id,
        }
    }
}

#[derive(FromRow)]
struct WorkCategoryRow {
    id: String,
    label: String,
    focus_area_id: String,
    created_at: String,
}

impl WorkCategoryRow {
    fn into_work_category(self) -> WorkCategory {
        WorkCategory {
            label: self.label,
            focus_area_id: self.focus_area_id,
            created_at: parse_timestamp(&self.created_at, &self.id),
            id: self.id,
        }
    }
}

#[derive(FromRow)]
struct WorkTypeRow {
    id: String,
    label: String,
    work_category_id: String,
    created_at: String,
}

impl WorkTypeRow {
    fn into_work_type(self) -> WorkType {
        WorkType {
            label: self.label,
            work_category_id: self.work_category_id,
            created_at: parse_timestamp(&self.created_at, &self.id),
            id: self.id,
        }
    }
}

#[derive(FromRow)]
struct SkillRow {
    id: String,
    name: String,
    category: Option<String>,
    created_at: String,
}

impl SkillRow {
    fn into_skill(self) -> Skill {
        Skill {
            name: self.name,
            category: self.category,
            created_at: parse_timestamp(&self.created_at, &self.id),
            id: self.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    async fn setup_store() -> SqliteTaxonomyStore {
        let db = Database::in_memory()
            .await
            .expect("Failed to create test database");
        SqliteTaxonomyStore::new(db.pool().clone())
    }

    async fn seed_hierarchy(store: &SqliteTaxonomyStore) {
        store
            .upsert_focus_area(&FocusArea::new("design", "Design"))
            .await
            .unwrap();
        store
            .upsert_work_category(&WorkCategory::new("design-ux", "UX", "design"))
            .await
            .unwrap();
        store
            .upsert_work_type(&WorkType::new("design-ux-01-research", "Research", "design-ux"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_upsert_is_non_destructive() {
        let store = setup_store().await;

        let created = store
            .upsert_focus_area(&FocusArea::new("design", "Design").with_description("original"))
            .await
            .unwrap();
        assert!(created);

        let created = store
            .upsert_focus_area(&FocusArea::new("design", "Renamed").with_description("changed"))
            .await
            .unwrap();
        assert!(!created);

        let area = store.get_focus_area("design").await.unwrap().unwrap();
        assert_eq!(area.label, "Design");
        assert_eq!(area.description, "original");
    }

    #[tokio::test]
    async fn test_upsert_rejects_orphans() {
        let store = setup_store().await;

        let err = store
            .upsert_work_category(&WorkCategory::new("ops-infra", "Infra", "ops"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::FocusAreaNotFound(id) if id == "ops"));

        let err = store
            .upsert_work_type(&WorkType::new("ops-infra-01", "Deploys", "ops-infra"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::WorkCategoryNotFound(_)));
    }

    #[tokio::test]
    async fn test_create_and_find_skill_case_insensitive() {
        let store = setup_store().await;

        let skill = store.create_skill("React.js", Some("frontend")).await.unwrap();
        assert_eq!(skill.id, "skill-reactjs");
        assert_eq!(skill.category.as_deref(), Some("frontend"));

        let found = store.find_skill_by_name_ci("react.js ").await.unwrap().unwrap();
        assert_eq!(found.id, skill.id);
        assert_eq!(found.name, "React.js");

        assert!(store.find_skill_by_name_ci("   ").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_skill_duplicate_name() {
        let store = setup_store().await;

        store.create_skill("User Research", None).await.unwrap();
        let err = store.create_skill("  user   RESEARCH", None).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateSkillName(name) if name == "User Research"));

        assert_eq!(store.list_skills().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_skill_id_collision_suffix() {
        let store = setup_store().await;

        let cpp = store.create_skill("C++", None).await.unwrap();
        let csharp = store.create_skill("C#", None).await.unwrap();
        let c = store.create_skill("C", None).await.unwrap();

        assert_eq!(cpp.id, "skill-c");
        assert_eq!(csharp.id, "skill-c-1");
        assert_eq!(c.id, "skill-c-2");
    }

    #[tokio::test]
    async fn test_create_skill_empty_name() {
        let store = setup_store().await;
        let err = store.create_skill("   ", None).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_link_is_idempotent() {
        let store = setup_store().await;
        seed_hierarchy(&store).await;
        let skill = store.create_skill("Usability Testing", None).await.unwrap();

        assert!(
            store
                .link_work_type_skill("design-ux-01-research", &skill.id)
                .await
                .unwrap()
        );
        assert!(
            !store
                .link_work_type_skill("design-ux-01-research", &skill.id)
                .await
                .unwrap()
        );
        assert!(
            store
                .link_exists("design-ux-01-research", &skill.id)
                .await
                .unwrap()
        );

        let counts = store.work_type_skill_counts().await.unwrap();
        assert_eq!(counts.get("design-ux-01-research"), Some(&1));

        let skills = store
            .skills_for_work_type("design-ux-01-research")
            .await
            .unwrap();
        assert_eq!(skills.len(), 1);
        assert_eq!(skills[0].name, "Usability Testing");
    }

    #[tokio::test]
    async fn test_link_unknown_endpoints() {
        let store = setup_store().await;
        seed_hierarchy(&store).await;
        let skill = store.create_skill("Figma", None).await.unwrap();

        let err = store
            .link_work_type_skill("missing", &skill.id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::WorkTypeNotFound(_)));

        let err = store
            .link_work_type_skill("design-ux-01-research", "skill-missing")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::SkillNotFound(_)));
    }

    #[tokio::test]
    async fn test_concurrent_create_converges() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(
            crate::storage::DatabaseConfig::with_path(dir.path().join("race.db")).max_connections(4),
        )
        .await
        .unwrap();
        let store = SqliteTaxonomyStore::new(db.pool().clone());

        let (a, b) = tokio::join!(
            store.create_skill("Service Design", None),
            store.create_skill("service design", None)
        );

        // Exactly one writer creates the row; the other observes the duplicate.
        let outcomes = [a, b];
        let created = outcomes.iter().filter(|r| r.is_ok()).count();
        let duplicates = outcomes
            .iter()
            .filter(|r| matches!(r, Err(Error::DuplicateSkillName(_))))
            .count();
        assert_eq!(created, 1);
        assert_eq!(duplicates, 1);
        assert_eq!(store.list_skills().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_timestamp_still_reads_row() {
        let store = setup_store().await;
        sqlx::query(
            "INSERT INTO skills (id, name, normalized_name, category, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind("skill-figma")
        .bind("Figma")
        .bind("figma")
        .bind(Option::<String>::None)
        .bind("not-a-timestamp")
        .execute(&store.pool)
        .await
        .unwrap();

        let before = Utc::now();
        let skill = store.find_skill_by_name_ci("FIGMA").await.unwrap().unwrap();
        assert_eq!(skill.id, "skill-figma");
        assert!(skill.created_at >= before);
    }
}
