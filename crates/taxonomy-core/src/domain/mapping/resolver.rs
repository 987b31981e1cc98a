//! Skill resolution by name
//!
//! Finds an existing skill under case-insensitive matching or creates it.
//! When two resolvers race on the same new name, the store lets exactly one
//! create the row and the loser sees `DuplicateSkillName`; the loser then
//! re-reads and returns the winner's row, so both converge on one skill.

use std::sync::Arc;

use tracing::debug;

use crate::domain::taxonomy::{Skill, TaxonomyStore};
use crate::error::{Error, Result};

/// Outcome of resolving a skill name
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSkill {
    pub skill: Skill,
    /// Whether this call created the skill row
    pub created: bool,
}

/// Find-or-create for skills
#[derive(Clone)]
pub struct SkillResolver {
    store: Arc<dyn TaxonomyStore>,
}

impl SkillResolver {
    pub fn new(store: Arc<dyn TaxonomyStore>) -> Self {
        Self { store }
    }

    /// Resolve a name to a skill, creating it if needed
    pub async fn resolve(&self, name: &str) -> Result<Skill> {
        Ok(self.resolve_with_category(name, None).await?.skill)
    }

    /// Resolve a name, tagging a newly created skill with `category`
    ///
    /// The category is only applied on creation; existing skills keep theirs.
    pub async fn resolve_with_category(
        &self,
        name: &str,
        category: Option<&str>,
    ) -> Result<ResolvedSkill> {
        if let Some(skill) = self.store.find_skill_by_name_ci(name).await? {
            return Ok(ResolvedSkill {
                skill,
                created: false,
            });
        }

        match self.store.create_skill(name, category).await {
            Ok(skill) => Ok(ResolvedSkill {
                skill,
                created: true,
            }),
            Err(Error::DuplicateSkillName(winner)) => {
                debug!(skill_name = %name, winner = %winner, "Lost skill creation race, re-resolving");
                let skill = self
                    .store
                    .find_skill_by_name_ci(name)
                    .await?
                    .ok_or_else(|| Error::SkillNotFound(name.to_string()))?;
                Ok(ResolvedSkill {
                    skill,
                    created: false,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Look up without creating
    pub async fn lookup(&self, name: &str) -> Result<Option<Skill>> {
        self.store.find_skill_by_name_ci(name).await
    }
}
