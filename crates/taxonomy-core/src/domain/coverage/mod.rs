//! Coverage analysis
//!
//! Read-only measurement of how much of the taxonomy has skills attached.
//! See [`CoverageAnalyzer`] for the rules.

mod analyzer;

pub use analyzer::{
    CoverageAnalyzer, CoverageRegression, CoverageReport, CoverageScope, DEFAULT_SATURATION_THRESHOLD,
    FocusAreaCoverage, coverage_pct,
};
