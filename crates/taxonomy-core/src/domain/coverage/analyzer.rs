//! Coverage analysis over the taxonomy hierarchy
//!
//! - a work type is *skilled* with at least one linked skill and *saturated*
//!   with at least `threshold` linked skills
//! - a category is *covered* when one of its work types is skilled
//! - a focus area has *full depth* when all of its categories are covered
//!
//! The coverage percentage is skilled / total work types and is computed
//! independently of the covered/saturated checks. Analysis is a read-only
//! snapshot; running it concurrently with a mapping batch may or may not
//! observe links from that batch.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::taxonomy::{
    CategoryRef, FocusArea, TaxonomyStore, WorkCategory, WorkType, WorkTypeRef,
};
use crate::error::{Error, Result};

/// Saturation threshold used when none is configured
pub const DEFAULT_SATURATION_THRESHOLD: u32 = 4;

/// Tolerance for comparing coverage percentages
const PCT_EPSILON: f64 = 1e-9;

/// Part of the taxonomy an analysis covers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CoverageScope {
    All,
    FocusArea(String),
    WorkCategory(String),
}

impl fmt::Display for CoverageScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::FocusArea(id) => write!(f, "focus-area:{}", id),
            Self::WorkCategory(id) => write!(f, "category:{}", id),
        }
    }
}

/// Coverage figures for one focus area
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusAreaCoverage {
    pub focus_area_id: String,
    pub label: String,
    pub total_work_types: usize,
    pub skilled_work_types: usize,
    pub coverage_pct: f64,
    pub total_categories: usize,
    pub covered_categories: usize,
    /// Every category in the focus area is covered
    pub full_depth: bool,
}

/// Result of a coverage analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub scope: CoverageScope,
    pub threshold: u32,
    pub total_work_types: usize,
    pub skilled_work_types: usize,
    pub saturated_work_types: usize,
    pub coverage_pct: f64,
    pub uncovered_categories: Vec<CategoryRef>,
    pub unsaturated_work_types: Vec<WorkTypeRef>,
    pub focus_areas: Vec<FocusAreaCoverage>,
}

impl CoverageReport {
    pub fn focus_area(&self, id: &str) -> Option<&FocusAreaCoverage> {
        self.focus_areas.iter().find(|fa| fa.focus_area_id == id)
    }

    /// Every category in scope is covered
    pub fn is_fully_covered(&self) -> bool {
        self.uncovered_categories.is_empty()
    }

    /// Every work type in scope reached the threshold
    pub fn is_saturated(&self) -> bool {
        self.unsaturated_work_types.is_empty()
    }

    /// Scopes whose coverage dropped between `self` (earlier) and `later`
    ///
    /// Compares the overall percentage and each focus area present in both.
    pub fn regressions_against(&self, later: &CoverageReport) -> Vec<CoverageRegression> {
        let mut regressions = Vec::new();

        if later.coverage_pct + PCT_EPSILON < self.coverage_pct {
            regressions.push(CoverageRegression {
                scope: self.scope.to_string(),
                before_pct: self.coverage_pct,
                after_pct: later.coverage_pct,
            });
        }

        for before in &self.focus_areas {
            if let Some(after) = later.focus_area(&before.focus_area_id) {
                if after.coverage_pct + PCT_EPSILON < before.coverage_pct {
                    regressions.push(CoverageRegression {
                        scope: CoverageScope::FocusArea(before.focus_area_id.clone()).to_string(),
                        before_pct: before.coverage_pct,
                        after_pct: after.coverage_pct,
                    });
                }
            }
        }

        regressions
    }
}

/// A scope whose coverage percentage decreased
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageRegression {
    pub scope: String,
    pub before_pct: f64,
    pub after_pct: f64,
}

/// Coverage percentage; an empty scope has nothing uncovered
pub fn coverage_pct(skilled: usize, total: usize) -> f64 {
    if total == 0 {
        100.0
    } else {
        skilled as f64 / total as f64 * 100.0
    }
}

/// Read-only coverage traversal
#[derive(Clone)]
pub struct CoverageAnalyzer {
    store: Arc<dyn TaxonomyStore>,
    threshold: u32,
}

impl CoverageAnalyzer {
    /// Create an analyzer with an explicit saturation threshold (must be ≥ 1)
    pub fn new(store: Arc<dyn TaxonomyStore>, threshold: u32) -> Result<Self> {
        if threshold == 0 {
            return Err(Error::InvalidInput(
                "saturation threshold must be at least 1".to_string(),
            ));
        }
        Ok(Self { store, threshold })
    }

    pub fn with_default_threshold(store: Arc<dyn TaxonomyStore>) -> Self {
        Self {
            store,
            threshold: DEFAULT_SATURATION_THRESHOLD,
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Analyze coverage for a scope
    pub async fn analyze(&self, scope: &CoverageScope) -> Result<CoverageReport> {
        let (focus_areas, categories) = self.scoped_nodes(scope).await?;
        let category_ids: HashSet<&str> = categories.iter().map(|c| c.id.as_str()).collect();

        let work_types: Vec<WorkType> = self
            .store
            .list_work_types()
            .await?
            .into_iter()
            .filter(|wt| category_ids.contains(wt.work_category_id.as_str()))
            .collect();
        let counts = self.store.work_type_skill_counts().await?;

        let mut by_category: HashMap<&str, Vec<(&WorkType, u32)>> = HashMap::new();
        for work_type in &work_types {
            let count = counts.get(&work_type.id).copied().unwrap_or(0);
            by_category
                .entry(work_type.work_category_id.as_str())
                .or_default()
                .push((work_type, count));
        }

        let mut skilled = 0;
        let mut saturated = 0;
        let mut unsaturated_work_types = Vec::new();
        for work_type in &work_types {
            let count = counts.get(&work_type.id).copied().unwrap_or(0);
            if count >= 1 {
                skilled += 1;
            }
            if count >= self.threshold {
                saturated += 1;
            } else {
                unsaturated_work_types.push(WorkTypeRef::from_work_type(work_type, count));
            }
        }

        let mut uncovered_categories = Vec::new();
        // focus area id -> (total categories, covered categories, total work types, skilled work types)
        let mut per_area: BTreeMap<&str, (usize, usize, usize, usize)> = BTreeMap::new();
        for category in &categories {
            let members = by_category
                .get(category.id.as_str())
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let category_skilled = members.iter().filter(|(_, count)| *count >= 1).count();
            let covered = category_skilled > 0;
            if !covered {
                uncovered_categories.push(CategoryRef::from(category));
            }

            let entry = per_area
                .entry(category.focus_area_id.as_str())
                .or_insert((0, 0, 0, 0));
            entry.0 += 1;
            if covered {
                entry.1 += 1;
            }
            entry.2 += members.len();
            entry.3 += category_skilled;
        }

        let focus_areas = focus_areas
            .iter()
            .map(|area| {
                let (total_categories, covered_categories, total, skilled) = per_area
                    .get(area.id.as_str())
                    .copied()
                    .unwrap_or((0, 0, 0, 0));
                FocusAreaCoverage {
                    focus_area_id: area.id.clone(),
                    label: area.label.clone(),
                    total_work_types: total,
                    skilled_work_types: skilled,
                    coverage_pct: coverage_pct(skilled, total),
                    total_categories,
                    covered_categories,
                    full_depth: covered_categories == total_categories,
                }
            })
            .collect();

        let report = CoverageReport {
            scope: scope.clone(),
            threshold: self.threshold,
            total_work_types: work_types.len(),
            skilled_work_types: skilled,
            saturated_work_types: saturated,
            coverage_pct: coverage_pct(skilled, work_types.len()),
            uncovered_categories,
            unsaturated_work_types,
            focus_areas,
        };

        debug!(
            scope = %scope,
            total = report.total_work_types,
            skilled = report.skilled_work_types,
            saturated = report.saturated_work_types,
            coverage_pct = report.coverage_pct,
            "Coverage analyzed"
        );
        Ok(report)
    }

    /// Focus areas and categories inside the scope, ordered by id
    async fn scoped_nodes(
        &self,
        scope: &CoverageScope,
    ) -> Result<(Vec<FocusArea>, Vec<WorkCategory>)> {
        match scope {
            CoverageScope::All => Ok((
                self.store.list_focus_areas().await?,
                self.store.list_work_categories().await?,
            )),
            CoverageScope::FocusArea(id) => {
                let area = self
                    .store
                    .get_focus_area(id)
                    .await?
                    .ok_or_else(|| Error::FocusAreaNotFound(id.clone()))?;
                let categories = self
                    .store
                    .list_work_categories()
                    .await?
                    .into_iter()
                    .filter(|c| &c.focus_area_id == id)
                    .collect();
                Ok((vec![area], categories))
            }
            CoverageScope::WorkCategory(id) => {
                let category = self
                    .store
                    .get_work_category(id)
                    .await?
                    .ok_or_else(|| Error::WorkCategoryNotFound(id.clone()))?;
                let area = self
                    .store
                    .get_focus_area(&category.focus_area_id)
                    .await?
                    .ok_or_else(|| Error::FocusAreaNotFound(category.focus_area_id.clone()))?;
                Ok((vec![area], vec![category]))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::mapping::{MappingEngine, MappingRequest};
    use crate::domain::taxonomy::InMemoryTaxonomyStore;

    /// design: ux (research, wireframes), visual (branding)
    /// ops: infra (deploys), empty category "ops-empty"
    async fn setup() -> Arc<dyn TaxonomyStore> {
        let store = InMemoryTaxonomyStore::new();
        for (id, label) in [("design", "Design"), ("ops", "Operations")] {
            store.upsert_focus_area(&FocusArea::new(id, label)).await.unwrap();
        }
        for (id, area) in [
            ("design-ux", "design"),
            ("design-visual", "design"),
            ("ops-infra", "ops"),
            ("ops-empty", "ops"),
        ] {
            store
                .upsert_work_category(&WorkCategory::new(id, id, area))
                .await
                .unwrap();
        }
        for (id, category) in [
            ("design-ux-research", "design-ux"),
            ("design-ux-wireframes", "design-ux"),
            ("design-visual-branding", "design-visual"),
            ("ops-infra-deploys", "ops-infra"),
        ] {
            store
                .upsert_work_type(&WorkType::new(id, id, category))
                .await
                .unwrap();
        }
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_empty_links_reports_everything_uncovered() {
        let store = setup().await;
        let analyzer = CoverageAnalyzer::with_default_threshold(store);

        let report = analyzer.analyze(&CoverageScope::All).await.unwrap();
        assert_eq!(report.total_work_types, 4);
        assert_eq!(report.skilled_work_types, 0);
        assert_eq!(report.coverage_pct, 0.0);
        assert_eq!(report.uncovered_categories.len(), 4);
        assert_eq!(report.unsaturated_work_types.len(), 4);
        assert!(!report.is_fully_covered());
    }

    #[tokio::test]
    async fn test_coverage_and_saturation() {
        let store = setup().await;
        let engine = MappingEngine::new(Arc::clone(&store));
        engine
            .apply(&[
                MappingRequest::new("design-ux-research", ["A", "B"]),
                MappingRequest::new("design-visual-branding", ["C"]),
            ])
            .await
            .unwrap();

        let analyzer = CoverageAnalyzer::new(store, 2).unwrap();
        let report = analyzer.analyze(&CoverageScope::All).await.unwrap();

        assert_eq!(report.skilled_work_types, 2);
        assert_eq!(report.saturated_work_types, 1);
        assert!((report.coverage_pct - 50.0).abs() < 1e-9);

        let uncovered: Vec<_> = report.uncovered_categories.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(uncovered, vec!["ops-empty", "ops-infra"]);

        let design = report.focus_area("design").unwrap();
        assert!(design.full_depth);
        assert_eq!(design.covered_categories, 2);
        assert!((design.coverage_pct - 200.0 / 3.0).abs() < 1e-9);

        let ops = report.focus_area("ops").unwrap();
        assert!(!ops.full_depth);
        assert_eq!(ops.coverage_pct, 0.0);
    }

    #[tokio::test]
    async fn test_scoped_analysis() {
        let store = setup().await;
        let analyzer = CoverageAnalyzer::with_default_threshold(store);

        let report = analyzer
            .analyze(&CoverageScope::FocusArea("design".into()))
            .await
            .unwrap();
        assert_eq!(report.total_work_types, 3);
        assert_eq!(report.focus_areas.len(), 1);

        let report = analyzer
            .analyze(&CoverageScope::WorkCategory("design-ux".into()))
            .await
            .unwrap();
        assert_eq!(report.total_work_types, 2);
        assert_eq!(report.uncovered_categories.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_scope() {
        let store = setup().await;
        let analyzer = CoverageAnalyzer::with_default_threshold(store);

        assert!(matches!(
            analyzer.analyze(&CoverageScope::FocusArea("legal".into())).await,
            Err(Error::FocusAreaNotFound(_))
        ));
        assert!(matches!(
            analyzer.analyze(&CoverageScope::WorkCategory("legal-x".into())).await,
            Err(Error::WorkCategoryNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_zero_threshold_rejected() {
        let store = setup().await;
        assert!(matches!(
            CoverageAnalyzer::new(store, 0),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_coverage_pct_empty_scope() {
        assert_eq!(coverage_pct(0, 0), 100.0);
        assert_eq!(coverage_pct(1, 4), 25.0);
    }

    #[test]
    fn test_regressions_against() {
        let make = |pct: f64, area_pct: f64| CoverageReport {
            scope: CoverageScope::All,
            threshold: 4,
            total_work_types: 4,
            skilled_work_types: 0,
            saturated_work_types: 0,
            coverage_pct: pct,
            uncovered_categories: vec![],
            unsaturated_work_types: vec![],
            focus_areas: vec![FocusAreaCoverage {
                focus_area_id: "design".into(),
                label: "Design".into(),
                total_work_types: 4,
                skilled_work_types: 0,
                coverage_pct: area_pct,
                total_categories: 1,
                covered_categories: 0,
                full_depth: false,
            }],
        };

        assert!(make(50.0, 50.0).regressions_against(&make(75.0, 50.0)).is_empty());

        let regressions = make(50.0, 50.0).regressions_against(&make(25.0, 25.0));
        assert_eq!(regressions.len(), 2);
        assert_eq!(regressions[0].scope, "all");
        assert_eq!(regressions[1].scope, "focus-area:design");
    }
}
