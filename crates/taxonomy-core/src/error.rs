//! Error types for the taxonomy engine

use thiserror::Error;

/// Result type alias using the taxonomy Error
pub type Result<T> = std::result::Result<T, Error>;

/// Taxonomy error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Structural errors (E001-E099)
    #[error("Focus area '{0}' not found. Run `taxonomy coverage` to see known focus areas.")]
    FocusAreaNotFound(String),

    #[error("Work category '{0}' not found.")]
    WorkCategoryNotFound(String),

    #[error("Work type '{0}' not found.")]
    WorkTypeNotFound(String),

    #[error("Skill '{0}' not found. Run `taxonomy skills list` to see all skills.")]
    SkillNotFound(String),

    // Uniqueness races (E100-E199)
    #[error("Skill '{0}' already exists under a case-insensitive match")]
    DuplicateSkillName(String),

    #[error("No free identifier derived from '{0}' after {1} attempts")]
    IdSpaceExhausted(String, u32),

    // Database errors (E400-E499)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    // Knowledge base / seed errors (E500-E599)
    #[error("Knowledge base error: {0}")]
    KnowledgeBase(String),

    #[error("Seed file error: {0}")]
    Seed(String),

    // Input errors (E800-E899)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Generic errors
    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::FocusAreaNotFound(_) => "E001",
            Self::WorkCategoryNotFound(_) => "E002",
            Self::WorkTypeNotFound(_) => "E003",
            Self::SkillNotFound(_) => "E004",
            Self::DuplicateSkillName(_) => "E100",
            Self::IdSpaceExhausted(..) => "E101",
            Self::Database(_) => "E400",
            Self::KnowledgeBase(_) => "E500",
            Self::Seed(_) => "E501",
            Self::InvalidInput(_) => "E800",
            Self::Other(_) | Self::Io(_) => "E9999",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::FocusAreaNotFound(_) => Some("taxonomy coverage".to_string()),
            Self::SkillNotFound(_) => Some("taxonomy skills list".to_string()),
            Self::Database(_) => Some("taxonomy doctor".to_string()),
            _ => None,
        }
    }

    /// Whether this error must abort the current batch
    ///
    /// Only persistence and I/O failures are fatal. Structural errors and
    /// uniqueness races are recorded per item by the callers.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Io(_))
    }
}
