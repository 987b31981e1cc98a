//! Taxonomy Core Library
//!
//! Keeps a four-level work taxonomy (focus area → work category → work type
//! → skill) consistent while it grows, and measures how well it is covered:
//! - Storage (SQLite with versioned migrations)
//! - Identifier derivation and case-insensitive skill uniqueness
//! - Idempotent batch mapping of skills onto work types
//! - Coverage analysis with a configurable saturation threshold
//! - Reconciliation passes driven by a knowledge base of suggestions

pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod storage;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::domain::coverage::{CoverageAnalyzer, CoverageReport, CoverageScope};
    pub use crate::domain::mapping::{MappingEngine, MappingReport, MappingRequest, SkillResolver};
    pub use crate::domain::reconcile::{KnowledgeBase, PassReport, ReconciliationOrchestrator};
    pub use crate::domain::taxonomy::{InMemoryTaxonomyStore, TaxonomySeed, TaxonomyStore};
    pub use crate::error::{Error, Result};
    pub use crate::infrastructure::taxonomy::SqliteTaxonomyStore;
    pub use crate::storage::{Database, DatabaseConfig};
}

#[cfg(test)]
mod config_tests;
