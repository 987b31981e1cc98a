//! Mapping batch files
//!
//! ```toml
//! [[requests]]
//! work_type_id = "design-ux-01-research"
//! skill_names = ["User Research", "Usability Testing"]
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::taxonomy::is_json;
use crate::error::{Error, Result};

use super::engine::MappingRequest;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingBatch {
    #[serde(default)]
    pub requests: Vec<MappingRequest>,
}

impl MappingBatch {
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::InvalidInput(format!("mapping batch: {}", e)))
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        serde_json::from_str(contents)
            .map_err(|e| Error::InvalidInput(format!("mapping batch: {}", e)))
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_batch() {
        let batch = MappingBatch::from_toml(
            r#"
            [[requests]]
            work_type_id = "wt-a"
            skill_names = ["Figma", "Sketch"]

            [[requests]]
            work_type_id = "wt-b"
            skill_names = ["Miro"]
            categories = { miro = "tooling" }
            "#,
        )
        .unwrap();

        assert_eq!(batch.requests.len(), 2);
        assert_eq!(batch.requests[0].skill_names, vec!["Figma", "Sketch"]);
        assert_eq!(
            batch.requests[1].categories.get("miro").map(String::as_str),
            Some("tooling")
        );
    }

    #[test]
    fn test_missing_fields_rejected() {
        assert!(matches!(
            MappingBatch::from_json(r#"{"requests":[{"work_type_id":"wt-a"}]}"#),
            Err(Error::InvalidInput(_))
        ));
    }
}
