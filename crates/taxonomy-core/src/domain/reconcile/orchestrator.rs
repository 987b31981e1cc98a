//! Reconciliation passes
//!
//! A pass measures coverage, turns every unsaturated work type into a
//! mapping request from the knowledge base, applies the batch and measures
//! again. Passes only ever add links, so coverage should never drop between
//! the two measurements; a drop means something else removed data and is
//! reported, not treated as a failure.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::coverage::{CoverageAnalyzer, CoverageRegression, CoverageReport, CoverageScope};
use crate::domain::mapping::{MappingEngine, MappingReport, MappingRequest};
use crate::domain::taxonomy::TaxonomyStore;
use crate::error::Result;

use super::knowledge::KnowledgeBase;

/// Why a gap could not be acted on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapKind {
    /// Unsaturated work type with nothing suggested for it
    NoSuggestions,
    /// Category without work types; nothing can be linked
    EmptyCategory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedGap {
    pub kind: GapKind,
    pub id: String,
    pub label: String,
    /// Skills linked when the pass started
    pub skill_count: u32,
}

/// Result of one reconciliation pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassReport {
    pub run_id: Uuid,
    pub dry_run: bool,
    pub scope: CoverageScope,
    pub before: CoverageReport,
    pub after: CoverageReport,
    pub mapping: MappingReport,
    pub unresolved_gaps: Vec<UnresolvedGap>,
    pub regressions: Vec<CoverageRegression>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl PassReport {
    /// Unknown work types or unresolved skill names remain
    pub fn has_unresolved(&self) -> bool {
        self.mapping.has_unresolved()
    }

    /// Coverage points gained by the pass
    pub fn coverage_delta(&self) -> f64 {
        self.after.coverage_pct - self.before.coverage_pct
    }
}

/// Runs analyze → map → re-analyze passes over one scope
pub struct ReconciliationOrchestrator {
    analyzer: CoverageAnalyzer,
    engine: MappingEngine,
    scope: CoverageScope,
    dry_run: bool,
}

impl ReconciliationOrchestrator {
    pub fn new(store: Arc<dyn TaxonomyStore>, threshold: u32) -> Result<Self> {
        Ok(Self {
            analyzer: CoverageAnalyzer::new(Arc::clone(&store), threshold)?,
            engine: MappingEngine::new(store),
            scope: CoverageScope::All,
            dry_run: false,
        })
    }

    pub fn with_default_threshold(store: Arc<dyn TaxonomyStore>) -> Self {
        Self {
            analyzer: CoverageAnalyzer::with_default_threshold(Arc::clone(&store)),
            engine: MappingEngine::new(store),
            scope: CoverageScope::All,
            dry_run: false,
        }
    }

    pub fn scope(mut self, scope: CoverageScope) -> Self {
        self.scope = scope;
        self
    }

    /// Plan the batch instead of applying it
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn threshold(&self) -> u32 {
        self.analyzer.threshold()
    }

    /// Run one pass
    pub async fn run(&self, knowledge: &KnowledgeBase) -> Result<PassReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(
            run_id = %run_id,
            scope = %self.scope,
            threshold = self.threshold(),
            dry_run = self.dry_run,
            "Reconciliation pass started"
        );

        let before = self.analyzer.analyze(&self.scope).await?;

        let mut requests: Vec<MappingRequest> = Vec::new();
        let mut unresolved_gaps = Vec::new();
        for work_type in &before.unsaturated_work_types {
            match knowledge.request_for(&work_type.id) {
                Some(request) => requests.push(request),
                None => {
                    debug!(work_type_id = %work_type.id, "No suggestions for gap");
                    unresolved_gaps.push(UnresolvedGap {
                        kind: GapKind::NoSuggestions,
                        id: work_type.id.clone(),
                        label: work_type.label.clone(),
                        skill_count: work_type.skill_count,
                    });
                }
            }
        }
        for category in &before.uncovered_categories {
            let has_work_types = before
                .unsaturated_work_types
                .iter()
                .any(|wt| wt.work_category_id == category.id);
            if !has_work_types {
                unresolved_gaps.push(UnresolvedGap {
                    kind: GapKind::EmptyCategory,
                    id: category.id.clone(),
                    label: category.label.clone(),
                    skill_count: 0,
                });
            }
        }

        let mapping = if self.dry_run {
            self.engine.plan(&requests).await?
        } else {
            self.engine.apply(&requests).await?
        };

        let after = self.analyzer.analyze(&self.scope).await?;
        let regressions = before.regressions_against(&after);
        for regression in &regressions {
            warn!(
                run_id = %run_id,
                scope = %regression.scope,
                before_pct = regression.before_pct,
                after_pct = regression.after_pct,
                "Coverage decreased during reconciliation pass"
            );
        }

        let report = PassReport {
            run_id,
            dry_run: self.dry_run,
            scope: self.scope.clone(),
            before,
            after,
            mapping,
            unresolved_gaps,
            regressions,
            started_at,
            finished_at: Utc::now(),
        };

        info!(
            run_id = %run_id,
            requests = requests.len(),
            added = report.mapping.added,
            already_linked = report.mapping.already_linked,
            unresolved_gaps = report.unresolved_gaps.len(),
            coverage_before = report.before.coverage_pct,
            coverage_after = report.after.coverage_pct,
            "Reconciliation pass finished"
        );
        Ok(report)
    }
}

impl std::fmt::Debug for ReconciliationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationOrchestrator")
            .field("scope", &self.scope)
            .field("threshold", &self.threshold())
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::taxonomy::{FocusArea, InMemoryTaxonomyStore, WorkCategory, WorkType};
    use crate::error::Error;

    async fn setup() -> Arc<dyn TaxonomyStore> {
        let store = InMemoryTaxonomyStore::new();
        store
            .upsert_focus_area(&FocusArea::new("design", "Design"))
            .await
            .unwrap();
        store
            .upsert_work_category(&WorkCategory::new("design-ux", "UX", "design"))
            .await
            .unwrap();
        store
            .upsert_work_category(&WorkCategory::new("design-motion", "Motion", "design"))
            .await
            .unwrap();
        for id in ["design-ux-01-research", "design-ux-02-wireframes"] {
            store
                .upsert_work_type(&WorkType::new(id, id, "design-ux"))
                .await
                .unwrap();
        }
        Arc::new(store)
    }

    fn knowledge() -> KnowledgeBase {
        KnowledgeBase::new().with_suggestions(
            "design-ux-01-research",
            ["User Research", "Usability Testing", "user research"],
        )
    }

    #[tokio::test]
    async fn test_pass_increases_coverage() {
        let store = setup().await;
        let orchestrator = ReconciliationOrchestrator::new(store, 2).unwrap();

        let report = orchestrator.run(&knowledge()).await.unwrap();

        assert_eq!(report.mapping.added, 2);
        assert_eq!(report.before.coverage_pct, 0.0);
        assert!((report.after.coverage_pct - 50.0).abs() < 1e-9);
        assert!(report.coverage_delta() > 0.0);
        assert!(report.regressions.is_empty());
        assert!(!report.has_unresolved());

        let kinds: Vec<_> = report
            .unresolved_gaps
            .iter()
            .map(|g| (g.kind, g.id.as_str()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (GapKind::NoSuggestions, "design-ux-02-wireframes"),
                (GapKind::EmptyCategory, "design-motion"),
            ]
        );
    }

    #[tokio::test]
    async fn test_rerun_is_noop_and_monotonic() {
        let store = setup().await;
        let orchestrator = ReconciliationOrchestrator::new(store, 4).unwrap();
        let kb = knowledge();

        let first = orchestrator.run(&kb).await.unwrap();
        let second = orchestrator.run(&kb).await.unwrap();

        assert_eq!(second.mapping.added, 0);
        assert_eq!(second.mapping.already_linked, first.mapping.added);
        assert!(second.regressions.is_empty());
        assert!(second.after.coverage_pct >= first.after.coverage_pct);
        assert_ne!(first.run_id, second.run_id);
    }

    #[tokio::test]
    async fn test_dry_run_writes_nothing() {
        let store = setup().await;
        let orchestrator = ReconciliationOrchestrator::new(Arc::clone(&store), 4)
            .unwrap()
            .dry_run(true);

        let report = orchestrator.run(&knowledge()).await.unwrap();

        assert!(report.dry_run);
        assert_eq!(report.mapping.added, 2);
        assert_eq!(report.after, report.before);
        assert!(store.list_skills().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_work_type_in_knowledge_is_ignored_outside_scope() {
        let store = setup().await;
        let orchestrator = ReconciliationOrchestrator::new(store, 4)
            .unwrap()
            .scope(CoverageScope::WorkCategory("design-ux".into()));

        let kb = knowledge().with_suggestions("legal-contracts-01", ["Drafting"]);
        let report = orchestrator.run(&kb).await.unwrap();

        // Only gaps from the analysis are requested
        assert!(report.mapping.unknown_work_types.is_empty());
        assert_eq!(report.mapping.added, 2);
    }

    #[tokio::test]
    async fn test_unknown_scope_is_fatal() {
        let store = setup().await;
        let orchestrator = ReconciliationOrchestrator::with_default_threshold(store)
            .scope(CoverageScope::FocusArea("legal".into()));

        assert!(matches!(
            orchestrator.run(&knowledge()).await,
            Err(Error::FocusAreaNotFound(_))
        ));
    }
}
