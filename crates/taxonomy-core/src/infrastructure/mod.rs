//! Infrastructure layer
//!
//! Implementations of domain seams backed by external systems.

pub mod taxonomy;
