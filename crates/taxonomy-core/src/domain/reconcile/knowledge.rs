//! Skill suggestions per work type
//!
//! The knowledge base is the data that drives a reconciliation pass. It maps
//! work type ids to the skills that should be attached to them:
//!
//! ```toml
//! [suggestions]
//! "design-ux-01-research" = [
//!     "User Research",
//!     { name = "Figma", category = "tooling" },
//! ]
//! ```
//!
//! The same shape is accepted as JSON when the file ends in `.json`.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::mapping::MappingRequest;
use crate::domain::taxonomy::{is_json, slug};
use crate::error::{Error, Result};

/// One suggested skill, either a bare name or a name with a category tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SuggestedSkill {
    Name(String),
    Detailed {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        category: Option<String>,
    },
}

impl SuggestedSkill {
    pub fn name(&self) -> &str {
        match self {
            Self::Name(name) => name,
            Self::Detailed { name, .. } => name,
        }
    }

    pub fn category(&self) -> Option<&str> {
        match self {
            Self::Name(_) => None,
            Self::Detailed { category, .. } => category.as_deref(),
        }
    }
}

impl From<&str> for SuggestedSkill {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    #[serde(default)]
    suggestions: BTreeMap<String, Vec<SuggestedSkill>>,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let kb: Self = toml::from_str(contents).map_err(|e| Error::KnowledgeBase(e.to_string()))?;
        kb.validate()?;
        Ok(kb)
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let kb: Self =
            serde_json::from_str(contents).map_err(|e| Error::KnowledgeBase(e.to_string()))?;
        kb.validate()?;
        Ok(kb)
    }

    /// Load from a `.json` or TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        if is_json(path) {
            Self::from_json(&contents)
        } else {
            Self::from_toml(&contents)
        }
    }

    /// Add suggestions for a work type
    pub fn with_suggestions<I, S>(mut self, work_type_id: impl Into<String>, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SuggestedSkill>,
    {
        self.suggestions
            .entry(work_type_id.into())
            .or_default()
            .extend(skills.into_iter().map(Into::into));
        self
    }

    pub fn suggestions_for(&self, work_type_id: &str) -> &[SuggestedSkill] {
        self.suggestions
            .get(work_type_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of work types with suggestions
    pub fn len(&self) -> usize {
        self.suggestions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suggestions.is_empty()
    }

    /// Build the mapping request for a work type
    ///
    /// Suggestions are deduplicated by normalized name, keeping the first
    /// spelling and the first category seen. Returns `None` when the work
    /// type has no suggestions.
    pub fn request_for(&self, work_type_id: &str) -> Option<MappingRequest> {
        let suggestions = self.suggestions_for(work_type_id);
        if suggestions.is_empty() {
            return None;
        }

        let mut seen = HashSet::new();
        let mut request = MappingRequest::new(work_type_id, Vec::<String>::new());
        for suggestion in suggestions {
            if !seen.insert(slug::name_key(suggestion.name())) {
                continue;
            }
            request.skill_names.push(suggestion.name().to_string());
            if let Some(category) = suggestion.category() {
                request = request.with_category(suggestion.name(), category);
            }
        }
        Some(request)
    }

    fn validate(&self) -> Result<()> {
        for (work_type_id, suggestions) in &self.suggestions {
            if work_type_id.trim().is_empty() {
                return Err(Error::KnowledgeBase("empty work type id".to_string()));
            }
            if let Some(blank) = suggestions.iter().find(|s| s.name().trim().is_empty()) {
                return Err(Error::KnowledgeBase(format!(
                    "blank skill name {:?} suggested for '{}'",
                    blank.name(),
                    work_type_id
                )));
            }
        }
        Ok(())
    }
}
