//! Mapping engine
//!
//! Applies batches of "attach these skills to this work type" requests.
//! Per-item problems (unknown work type, unresolvable skill name) are recorded
//! in the [`MappingReport`] and processing continues; only persistence
//! failures abort the batch. Names repeated inside one request (compared by
//! normalized name) are processed once; the repeats are counted in
//! `duplicates_in_request` and never as `already_linked`. Each `(work type, skill)` link is its own write,
//! so everything counted as `added` is durable by the time `apply` returns.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::taxonomy::{TaxonomyStore, slug};
use crate::error::{Error, Result};

use super::resolver::SkillResolver;

/// Request to attach skills to one work type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRequest {
    pub work_type_id: String,
    pub skill_names: Vec<String>,
    /// Category tags for skills that may be created, keyed by normalized name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub categories: BTreeMap<String, String>,
}

impl MappingRequest {
    pub fn new<I, S>(work_type_id: impl Into<String>, skill_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            work_type_id: work_type_id.into(),
            skill_names: skill_names.into_iter().map(Into::into).collect(),
            categories: BTreeMap::new(),
        }
    }

    /// Tag a skill name with a category used if the skill gets created
    pub fn with_category(mut self, skill_name: &str, category: impl Into<String>) -> Self {
        self.categories
            .insert(slug::name_key(skill_name), category.into());
        self
    }

    fn category_for(&self, skill_name: &str) -> Option<&str> {
        self.categories
            .get(&slug::name_key(skill_name))
            .map(String::as_str)
    }
}

/// Classification of a single `(work type, skill name)` item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    Added,
    AlreadyLinked,
    ResolutionFailed,
}

impl LinkStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::AlreadyLinked => "already_linked",
            Self::ResolutionFailed => "resolution_failed",
        }
    }
}

/// Per-item outcome recorded in the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkOutcome {
    pub work_type_id: String,
    pub skill_name: String,
    /// `None` when resolution failed, or in a dry run for a skill not yet created
    pub skill_id: Option<String>,
    pub status: LinkStatus,
}

/// Aggregate result of a mapping batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingReport {
    /// Links created by this batch
    pub added: usize,
    /// Links that already existed
    pub already_linked: usize,
    /// Names skipped because an earlier name in the same request normalizes
    /// to the same key
    #[serde(default)]
    pub duplicates_in_request: usize,
    /// Skill rows created by this batch
    pub skills_created: usize,
    /// Requests skipped because their work type does not exist
    pub unknown_work_types: BTreeSet<String>,
    /// Skill names that could not be resolved to a skill
    pub unresolved_skill_names: BTreeSet<String>,
    pub links: Vec<LinkOutcome>,
}

impl MappingReport {
    /// Whether any item was skipped or left unresolved
    pub fn has_unresolved(&self) -> bool {
        !self.unknown_work_types.is_empty() || !self.unresolved_skill_names.is_empty()
    }

    /// Whether the batch changed nothing
    pub fn is_noop(&self) -> bool {
        self.added == 0 && self.skills_created == 0
    }

    /// First occurrence of `name` within its request, counting repeats
    ///
    /// Blank names have no key and are always passed through so the resolver
    /// can reject them.
    fn first_in_request(&mut self, seen: &mut HashSet<String>, name: &str) -> bool {
        let key = slug::name_key(name);
        if key.is_empty() || seen.insert(key) {
            return true;
        }
        debug!(skill_name = %name, "Skipping repeated name in request");
        self.duplicates_in_request += 1;
        false
    }

    fn record(
        &mut self,
        work_type_id: &str,
        skill_name: &str,
        skill_id: Option<String>,
        status: LinkStatus,
    ) {
        match status {
            LinkStatus::Added => self.added += 1,
            LinkStatus::AlreadyLinked => self.already_linked += 1,
            LinkStatus::ResolutionFailed => {
                self.unresolved_skill_names.insert(skill_name.to_string());
            }
        }
        self.links.push(LinkOutcome {
            work_type_id: work_type_id.to_string(),
            skill_name: skill_name.to_string(),
            skill_id,
            status,
        });
    }
}

/// Applies mapping batches through the resolver and the store
#[derive(Clone)]
pub struct MappingEngine {
    store: Arc<dyn TaxonomyStore>,
    resolver: SkillResolver,
}

impl MappingEngine {
    pub fn new(store: Arc<dyn TaxonomyStore>) -> Self {
        let resolver = SkillResolver::new(Arc::clone(&store));
        Self { store, resolver }
    }

    /// Apply a batch, linking every resolvable skill to its work type
    pub async fn apply(&self, requests: &[MappingRequest]) -> Result<MappingReport> {
        let mut report = MappingReport::default();

        for request in requests {
            if !self.store.work_type_exists(&request.work_type_id).await? {
                warn!(work_type_id = %request.work_type_id, "Skipping request for unknown work type");
                report
                    .unknown_work_types
                    .insert(request.work_type_id.clone());
                continue;
            }

            let mut seen = HashSet::new();
            for name in &request.skill_names {
                if !report.first_in_request(&mut seen, name) {
                    continue;
                }
                let resolved = match self
                    .resolver
                    .resolve_with_category(name, request.category_for(name))
                    .await
                {
                    Ok(resolved) => resolved,
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        warn!(skill_name = %name, error = %e, "Skill resolution failed");
                        report.record(
                            &request.work_type_id,
                            name,
                            None,
                            LinkStatus::ResolutionFailed,
                        );
                        continue;
                    }
                };
                if resolved.created {
                    report.skills_created += 1;
                }

                let skill_id = resolved.skill.id;
                match self
                    .store
                    .link_work_type_skill(&request.work_type_id, &skill_id)
                    .await
                {
                    Ok(true) => {
                        report.record(&request.work_type_id, name, Some(skill_id), LinkStatus::Added)
                    }
                    Ok(false) => report.record(
                        &request.work_type_id,
                        name,
                        Some(skill_id),
                        LinkStatus::AlreadyLinked,
                    ),
                    Err(Error::WorkTypeNotFound(_)) => {
                        // Structural change mid-batch; treat like an unknown work type.
                        warn!(work_type_id = %request.work_type_id, "Work type disappeared while linking");
                        report
                            .unknown_work_types
                            .insert(request.work_type_id.clone());
                        break;
                    }
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        warn!(skill_name = %name, error = %e, "Linking skill failed");
                        report.record(
                            &request.work_type_id,
                            name,
                            Some(skill_id),
                            LinkStatus::ResolutionFailed,
                        );
                    }
                }
            }
        }

        info!(
            requests = requests.len(),
            added = report.added,
            already_linked = report.already_linked,
            duplicates_in_request = report.duplicates_in_request,
            skills_created = report.skills_created,
            unknown_work_types = report.unknown_work_types.len(),
            unresolved_skill_names = report.unresolved_skill_names.len(),
            "Mapping batch applied"
        );
        Ok(report)
    }

    /// Classify a batch the way `apply` would, without writing anything
    pub async fn plan(&self, requests: &[MappingRequest]) -> Result<MappingReport> {
        let mut report = MappingReport::default();
        let mut planned_skills: HashSet<String> = HashSet::new();
        let mut planned_links: HashSet<(String, String)> = HashSet::new();

        for request in requests {
            if !self.store.work_type_exists(&request.work_type_id).await? {
                report
                    .unknown_work_types
                    .insert(request.work_type_id.clone());
                continue;
            }

            let mut seen = HashSet::new();
            for name in &request.skill_names {
                if !report.first_in_request(&mut seen, name) {
                    continue;
                }
                let key = slug::name_key(name);
                if key.is_empty() {
                    report.record(&request.work_type_id, name, None, LinkStatus::ResolutionFailed);
                    continue;
                }

                let existing = self.resolver.lookup(name).await?;
                let already = match &existing {
                    Some(skill) => {
                        self.store
                            .link_exists(&request.work_type_id, &skill.id)
                            .await?
                    }
                    None => false,
                };
                if existing.is_none() && planned_skills.insert(key.clone()) {
                    report.skills_created += 1;
                }

                let skill_id = existing.map(|skill| skill.id);
                let newly_planned = planned_links.insert((request.work_type_id.clone(), key));
                let status = if already || !newly_planned {
                    LinkStatus::AlreadyLinked
                } else {
                    LinkStatus::Added
                };
                report.record(&request.work_type_id, name, skill_id, status);
            }
        }

        info!(
            requests = requests.len(),
            would_add = report.added,
            already_linked = report.already_linked,
            "Mapping batch planned (dry run)"
        );
        Ok(report)
    }
}
