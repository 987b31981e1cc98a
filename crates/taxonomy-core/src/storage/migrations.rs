//! Database migrations
//!
//! This module manages SQLite schema migrations for the taxonomy store.
//! Migrations are versioned and applied automatically on database connection.

use sqlx::SqlitePool;

/// Current schema version
pub const CURRENT_VERSION: i32 = 2;

/// SQL for creating the migrations tracking table
const CREATE_MIGRATIONS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS _migrations (
        version INTEGER PRIMARY KEY NOT NULL,
        applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    );
"#;

/// Migration 1: Taxonomy hierarchy and skills
const MIGRATION_V1: &str = r#"
    -- Top-level persona/domain groupings
    CREATE TABLE IF NOT EXISTS focus_areas (
        id TEXT PRIMARY KEY NOT NULL,
        label TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        created_at TEXT NOT NULL
    );

    -- Thematic groupings, each owned by exactly one focus area
    CREATE TABLE IF NOT EXISTS work_categories (
        id TEXT PRIMARY KEY NOT NULL,
        label TEXT NOT NULL,
        focus_area_id TEXT NOT NULL REFERENCES focus_areas(id) ON DELETE RESTRICT,
        created_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_work_categories_focus_area_id ON work_categories(focus_area_id);

    -- Classifiable units of work that skills attach to
    CREATE TABLE IF NOT EXISTS work_types (
        id TEXT PRIMARY KEY NOT NULL,
        label TEXT NOT NULL,
        work_category_id TEXT NOT NULL REFERENCES work_categories(id) ON DELETE RESTRICT,
        created_at TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_work_types_work_category_id ON work_types(work_category_id);

    -- Skills; normalized_name is the natural key
    CREATE TABLE IF NOT EXISTS skills (
        id TEXT PRIMARY KEY NOT NULL,
        name TEXT NOT NULL COLLATE NOCASE,
        normalized_name TEXT NOT NULL,
        category TEXT,
        created_at TEXT NOT NULL
    );

    CREATE UNIQUE INDEX IF NOT EXISTS idx_skills_normalized_name ON skills(normalized_name);
"#;

/// Migration 2: Work type to skill associations
const MIGRATION_V2: &str = r#"
    CREATE TABLE IF NOT EXISTS work_type_skills (
        work_type_id TEXT NOT NULL REFERENCES work_types(id) ON DELETE RESTRICT,
        skill_id TEXT NOT NULL REFERENCES skills(id) ON DELETE RESTRICT,
        created_at TEXT NOT NULL,
        PRIMARY KEY (work_type_id, skill_id)
    );

    CREATE INDEX IF NOT EXISTS idx_work_type_skills_skill_id ON work_type_skills(skill_id);
"#;

/// Get the current schema version from the database
async fn get_current_version(pool: &SqlitePool) -> anyhow::Result<i32> {
    sqlx::raw_sql(CREATE_MIGRATIONS_TABLE).execute(pool).await?;

    let row: Option<(Option<i32>,)> = sqlx::query_as("SELECT MAX(version) FROM _migrations")
        .fetch_optional(pool)
        .await?;

    Ok(row.and_then(|(v,)| v).unwrap_or(0))
}

/// Record that a migration has been applied
async fn record_migration(pool: &SqlitePool, version: i32) -> anyhow::Result<()> {
    sqlx::query("INSERT OR IGNORE INTO _migrations (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;
    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    let current_version = get_current_version(pool).await?;

    tracing::info!(
        current_version = current_version,
        target_version = CURRENT_VERSION,
        "Checking database migrations"
    );

    if current_version >= CURRENT_VERSION {
        tracing::debug!("Database is up to date");
        return Ok(());
    }

    if current_version < 1 {
        tracing::info!("Applying migration v1: Taxonomy hierarchy and skills");
        sqlx::raw_sql(MIGRATION_V1).execute(pool).await?;
        record_migration(pool, 1).await?;
    }

    if current_version < 2 {
        tracing::info!("Applying migration v2: Work type skill associations");
        sqlx::raw_sql(MIGRATION_V2).execute(pool).await?;
        record_migration(pool, 2).await?;
    }

    tracing::info!("Database migrations completed");
    Ok(())
}

/// Check if the database needs migrations
pub async fn needs_migration(pool: &SqlitePool) -> anyhow::Result<bool> {
    let current_version = get_current_version(pool).await?;
    Ok(current_version < CURRENT_VERSION)
}

/// Get migration status information
pub async fn migration_status(pool: &SqlitePool) -> anyhow::Result<MigrationStatus> {
    let current_version = get_current_version(pool).await?;
    Ok(MigrationStatus {
        current_version,
        target_version: CURRENT_VERSION,
        needs_migration: current_version < CURRENT_VERSION,
    })
}

/// Migration status information
#[derive(Debug, Clone)]
pub struct MigrationStatus {
    /// Current schema version in the database
    pub current_version: i32,
    /// Target schema version (latest)
    pub target_version: i32,
    /// Whether migrations need to be run
    pub needs_migration: bool,
}
