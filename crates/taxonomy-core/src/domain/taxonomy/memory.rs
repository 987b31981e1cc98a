//! In-memory taxonomy store
//!
//! Same contract as the SQLite store, backed by ordered maps behind a single
//! `RwLock`. Each write holds the lock for its whole check-then-insert, which
//! gives the same uniqueness guarantees the schema gives the SQLite store.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::entity::{FocusArea, Skill, WorkCategory, WorkType};
use super::repository::{MAX_ID_ATTEMPTS, TaxonomyStore};
use super::slug;

#[derive(Debug, Default)]
struct State {
    focus_areas: BTreeMap<String, FocusArea>,
    work_categories: BTreeMap<String, WorkCategory>,
    work_types: BTreeMap<String, WorkType>,
    skills: BTreeMap<String, Skill>,
    /// normalized name -> skill id
    skill_keys: HashMap<String, String>,
    links: BTreeSet<(String, String)>,
}

/// In-memory implementation of [`TaxonomyStore`]
#[derive(Debug, Default)]
pub struct InMemoryTaxonomyStore {
    state: RwLock<State>,
}

impl InMemoryTaxonomyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of work type / skill links
    pub async fn link_count(&self) -> usize {
        self.state.read().await.links.len()
    }
}

#[async_trait]
impl TaxonomyStore for InMemoryTaxonomyStore {
    async fn upsert_focus_area(&self, focus_area: &FocusArea) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.focus_areas.contains_key(&focus_area.id) {
            return Ok(false);
        }
        state
            .focus_areas
            .insert(focus_area.id.clone(), focus_area.clone());
        info!(focus_area_id = %focus_area.id, "Focus area created");
        Ok(true)
    }

    async fn upsert_work_category(&self, category: &WorkCategory) -> Result<bool> {
        let mut state = self.state.write().await;
        if !state.focus_areas.contains_key(&category.focus_area_id) {
            return Err(Error::FocusAreaNotFound(category.focus_area_id.clone()));
        }
        if state.work_categories.contains_key(&category.id) {
            return Ok(false);
        }
        state
            .work_categories
            .insert(category.id.clone(), category.clone());
        info!(work_category_id = %category.id, "Work category created");
        Ok(true)
    }

    async fn upsert_work_type(&self, work_type: &WorkType) -> Result<bool> {
        let mut state = self.state.write().await;
        if !state
            .work_categories
            .contains_key(&work_type.work_category_id)
        {
            return Err(Error::WorkCategoryNotFound(
                work_type.work_category_id.clone(),
            ));
        }
        if state.work_types.contains_key(&work_type.id) {
            return Ok(false);
        }
        state
            .work_types
            .insert(work_type.id.clone(), work_type.clone());
        info!(work_type_id = %work_type.id, "Work type created");
        Ok(true)
    }

    async fn find_skill_by_name_ci(&self, name: &str) -> Result<Option<Skill>> {
        let key = slug::name_key(name);
        let state = self.state.read().await;
        Ok(state
            .skill_keys
            .get(&key)
            .and_then(|id| state.skills.get(id))
            .cloned())
    }

    async fn create_skill(&self, name: &str, category: Option<&str>) -> Result<Skill> {
        let display_name = slug::normalize_name(name);
        if display_name.is_empty() {
            return Err(Error::InvalidInput("skill name is empty".to_string()));
        }
        let key = display_name.to_lowercase();

        let mut state = self.state.write().await;
        if let Some(existing) = state.skill_keys.get(&key).and_then(|id| state.skills.get(id)) {
            return Err(Error::DuplicateSkillName(existing.name.clone()));
        }

        let base = slug::skill_id_base(&display_name);
        let id = (0..MAX_ID_ATTEMPTS)
            .map(|attempt| slug::with_suffix(&base, attempt))
            .find(|candidate| !state.skills.contains_key(candidate))
            .ok_or_else(|| Error::IdSpaceExhausted(base.clone(), MAX_ID_ATTEMPTS))?;

        let skill = Skill {
            id: id.clone(),
            name: display_name,
            category: category.map(str::to_string),
            created_at: Utc::now(),
        };
        state.skill_keys.insert(key, id.clone());
        state.skills.insert(id, skill.clone());
        info!(skill_id = %skill.id, skill_name = %skill.name, "Skill created");
        Ok(skill)
    }

    async fn list_skills(&self) -> Result<Vec<Skill>> {
        let state = self.state.read().await;
        let mut skills: Vec<Skill> = state.skills.values().cloned().collect();
        skills.sort_by(|a, b| a.name_key().cmp(&b.name_key()).then(a.id.cmp(&b.id)));
        Ok(skills)
    }

    async fn skills_for_work_type(&self, work_type_id: &str) -> Result<Vec<Skill>> {
        let state = self.state.read().await;
        let mut skills: Vec<Skill> = state
            .links
            .iter()
            .filter(|(wt, _)| wt == work_type_id)
            .filter_map(|(_, skill_id)| state.skills.get(skill_id).cloned())
            .collect();
        skills.sort_by(|a, b| a.name_key().cmp(&b.name_key()).then(a.id.cmp(&b.id)));
        Ok(skills)
    }

    async fn link_work_type_skill(&self, work_type_id: &str, skill_id: &str) -> Result<bool> {
        let mut state = self.state.write().await;
        if !state.work_types.contains_key(work_type_id) {
            return Err(Error::WorkTypeNotFound(work_type_id.to_string()));
        }
        if !state.skills.contains_key(skill_id) {
            return Err(Error::SkillNotFound(skill_id.to_string()));
        }
        let created = state
            .links
            .insert((work_type_id.to_string(), skill_id.to_string()));
        if created {
            debug!(work_type_id = %work_type_id, skill_id = %skill_id, "Skill linked to work type");
        }
        Ok(created)
    }

    async fn link_exists(&self, work_type_id: &str, skill_id: &str) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state
            .links
            .contains(&(work_type_id.to_string(), skill_id.to_string())))
    }

    async fn work_type_skill_counts(&self) -> Result<HashMap<String, u32>> {
        let state = self.state.read().await;
        let mut counts = HashMap::new();
        for (work_type_id, _) in &state.links {
            *counts.entry(work_type_id.clone()).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn work_type_exists(&self, work_type_id: &str) -> Result<bool> {
        Ok(self.state.read().await.work_types.contains_key(work_type_id))
    }

    async fn skill_exists(&self, skill_id: &str) -> Result<bool> {
        Ok(self.state.read().await.skills.contains_key(skill_id))
    }

    async fn get_focus_area(&self, id: &str) -> Result<Option<FocusArea>> {
        Ok(self.state.read().await.focus_areas.get(id).cloned())
    }

    async fn get_work_category(&self, id: &str) -> Result<Option<WorkCategory>> {
        Ok(self.state.read().await.work_categories.get(id).cloned())
    }

    async fn list_focus_areas(&self) -> Result<Vec<FocusArea>> {
        Ok(self.state.read().await.focus_areas.values().cloned().collect())
    }

    async fn list_work_categories(&self) -> Result<Vec<WorkCategory>> {
        Ok(self
            .state
            .read()
            .await
            .work_categories
            .values()
            .cloned()
            .collect())
    }

    async fn list_work_types(&self) -> Result<Vec<WorkType>> {
        Ok(self.state.read().await.work_types.values().cloned().collect())
    }
}
