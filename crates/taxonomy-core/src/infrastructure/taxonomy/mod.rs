//! SQLite implementation of the taxonomy store

mod repository;

pub use repository::SqliteTaxonomyStore;
