//! Domain layer
//!
//! - [`taxonomy`]: hierarchy entities, identifier derivation and the store seam
//! - [`mapping`]: skill resolution and batch linking
//! - [`coverage`]: read-only coverage analysis
//! - [`reconcile`]: analyze/map/re-analyze passes

pub mod coverage;
pub mod mapping;
pub mod reconcile;
pub mod taxonomy;
