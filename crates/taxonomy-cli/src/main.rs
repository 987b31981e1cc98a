//! Taxonomy CLI - keep the work taxonomy consistent and measure its coverage

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::anyhow;
use clap::{Parser, Subcommand};
use serde::Serialize;
use taxonomy_core::config::Config;
use taxonomy_core::domain::coverage::{CoverageAnalyzer, CoverageReport, CoverageScope};
use taxonomy_core::domain::mapping::{
    LinkStatus, MappingBatch, MappingEngine, MappingReport, ResolvedSkill, SkillResolver,
};
use taxonomy_core::domain::reconcile::{KnowledgeBase, PassReport, ReconciliationOrchestrator};
use taxonomy_core::domain::taxonomy::{SeedReport, TaxonomySeed, TaxonomyStore};
use taxonomy_core::infrastructure::taxonomy::SqliteTaxonomyStore;
use taxonomy_core::storage::Database;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "taxonomy")]
#[command(author, version, about = "Taxonomy consistency and coverage reconciliation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Database file (overrides database.path from the config)
    #[arg(long, global = true, env = "TAXONOMY_DATABASE")]
    database: Option<PathBuf>,
}

#[derive(Clone, Copy, Default, PartialEq, Eq, Debug, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a reconciliation pass: analyze, map suggested skills, re-analyze
    Reconcile {
        /// Restrict the pass to one focus area
        #[arg(long, conflicts_with = "all", required_unless_present = "all")]
        focus_area: Option<String>,
        /// Reconcile every focus area
        #[arg(long)]
        all: bool,
        /// Saturation threshold (overrides coverage.saturation_threshold)
        #[arg(long)]
        threshold: Option<u32>,
        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,
        /// Knowledge base file (overrides reconcile.knowledge_base)
        #[arg(long)]
        knowledge: Option<PathBuf>,
    },

    /// Create taxonomy nodes from a TOML or JSON seed file
    Seed { file: PathBuf },

    /// Apply a mapping batch file
    Apply {
        file: PathBuf,
        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Show coverage
    Coverage {
        #[arg(long, conflicts_with = "category")]
        focus_area: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// Saturation threshold (overrides coverage.saturation_threshold)
        #[arg(long)]
        threshold: Option<u32>,
    },

    /// Inspect and resolve skills
    Skills {
        #[command(subcommand)]
        action: SkillAction,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Run health check
    Doctor,
}

#[derive(Subcommand)]
enum SkillAction {
    /// List skills, optionally only those linked to a work type
    List {
        #[arg(short, long)]
        work_type: Option<String>,
    },
    /// Look up a skill by name (case-insensitive)
    Resolve {
        name: String,
        /// Create the skill when no match exists
        #[arg(long)]
        create: bool,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// List all configuration values
    List,
    /// Reset configuration to defaults
    Reset,
    /// Show config file path
    Path,
}

/// How a successful command finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Clean,
    /// Unknown or unresolved items remain
    Unresolved,
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Clean => ExitCode::SUCCESS,
            Outcome::Unresolved => ExitCode::from(1),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let default_level = if cli.quiet { "taxonomy=warn" } else { "taxonomy=info" };
    let directive = match default_level.parse() {
        Ok(directive) => directive,
        Err(e) => {
            eprintln!("Error: invalid log directive: {}", e);
            return ExitCode::from(2);
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(outcome) => outcome.into(),
        Err(e) => {
            report_error(&e);
            ExitCode::from(2)
        }
    }
}

fn report_error(error: &anyhow::Error) {
    match error.downcast_ref::<taxonomy_core::Error>() {
        Some(core) => {
            eprintln!("Error [{}]: {}", core.code(), core);
            if let Some(suggestion) = core.suggestion() {
                eprintln!("  Try: {}", suggestion);
            }
        }
        None => eprintln!("Error: {:#}", error),
    }
}

async fn run(cli: Cli) -> anyhow::Result<Outcome> {
    let ctx = Globals {
        format: cli.format,
        quiet: cli.quiet,
        database: cli.database,
    };

    match cli.command {
        Commands::Reconcile {
            focus_area,
            all,
            threshold,
            dry_run,
            knowledge,
        } => {
            let scope = match (focus_area, all) {
                (Some(id), _) => CoverageScope::FocusArea(id),
                (None, true) => CoverageScope::All,
                (None, false) => return Err(anyhow!("pass --focus-area <id> or --all")),
            };
            cmd_reconcile(&ctx, scope, threshold, dry_run, knowledge.as_deref()).await
        }

        Commands::Seed { file } => cmd_seed(&ctx, &file).await,

        Commands::Apply { file, dry_run } => cmd_apply(&ctx, &file, dry_run).await,

        Commands::Coverage {
            focus_area,
            category,
            threshold,
        } => {
            let scope = match (focus_area, category) {
                (Some(id), _) => CoverageScope::FocusArea(id),
                (None, Some(id)) => CoverageScope::WorkCategory(id),
                (None, None) => CoverageScope::All,
            };
            cmd_coverage(&ctx, scope, threshold).await
        }

        Commands::Skills { action } => cmd_skills(&ctx, action).await,

        Commands::Config { action } => cmd_config(&ctx, action),

        Commands::Doctor => cmd_doctor(&ctx).await,
    }
}

/// Global flags shared by every command
struct Globals {
    format: OutputFormat,
    quiet: bool,
    database: Option<PathBuf>,
}

impl Globals {
    fn json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Text output is printed unless quiet; JSON is always printed
    fn text(&self) -> bool {
        !self.json() && !self.quiet
    }

    async fn open(&self, config: &Config) -> anyhow::Result<(Database, Arc<dyn TaxonomyStore>)> {
        let mut db_config = config.database_config();
        if let Some(path) = &self.database {
            db_config.path = path.clone();
        }
        debug!(path = %db_config.path.display(), "Opening taxonomy database");

        let db = Database::new(db_config).await?;
        let store: Arc<dyn TaxonomyStore> = Arc::new(SqliteTaxonomyStore::new(db.pool().clone()));
        Ok((db, store))
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn outcome_for(mapping: &MappingReport) -> Outcome {
    if mapping.has_unresolved() {
        Outcome::Unresolved
    } else {
        Outcome::Clean
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

async fn cmd_reconcile(
    ctx: &Globals,
    scope: CoverageScope,
    threshold: Option<u32>,
    dry_run: bool,
    knowledge: Option<&Path>,
) -> anyhow::Result<Outcome> {
    let config = Config::load()?;
    let knowledge_path = knowledge
        .map(Path::to_path_buf)
        .or_else(|| config.reconcile.knowledge_base.clone())
        .ok_or_else(|| {
            anyhow!("No knowledge base: pass --knowledge <file> or set reconcile.knowledge_base")
        })?;
    let knowledge = KnowledgeBase::load(&knowledge_path)?;
    info!(
        path = %knowledge_path.display(),
        work_types = knowledge.len(),
        "Knowledge base loaded"
    );

    let (db, store) = ctx.open(&config).await?;
    let threshold = threshold.unwrap_or(config.coverage.saturation_threshold);
    let orchestrator = ReconciliationOrchestrator::new(store, threshold)?
        .scope(scope)
        .dry_run(dry_run);

    let report = orchestrator.run(&knowledge).await?;
    db.close().await;

    if ctx.json() {
        print_json(&report)?;
    } else if ctx.text() {
        print_pass(&report);
    }
    Ok(outcome_for(&report.mapping))
}

async fn cmd_seed(ctx: &Globals, file: &Path) -> anyhow::Result<Outcome> {
    let config = Config::load()?;
    let seed = TaxonomySeed::load(file)?;
    let (db, store) = ctx.open(&config).await?;

    let report = seed.apply(store.as_ref()).await?;
    db.close().await;

    if ctx.json() {
        print_json(&report)?;
    } else if ctx.text() {
        print_seed(&report);
    }
    Ok(Outcome::Clean)
}

async fn cmd_apply(ctx: &Globals, file: &Path, dry_run: bool) -> anyhow::Result<Outcome> {
    let config = Config::load()?;
    let batch = MappingBatch::load(file)?;
    let (db, store) = ctx.open(&config).await?;

    let engine = MappingEngine::new(store);
    let report = if dry_run {
        engine.plan(&batch.requests).await?
    } else {
        engine.apply(&batch.requests).await?
    };
    db.close().await;

    if ctx.json() {
        print_json(&report)?;
    } else if ctx.text() {
        if dry_run {
            println!("Dry run: nothing was written.");
        }
        print_mapping(&report);
    }
    Ok(outcome_for(&report))
}

async fn cmd_coverage(
    ctx: &Globals,
    scope: CoverageScope,
    threshold: Option<u32>,
) -> anyhow::Result<Outcome> {
    let config = Config::load()?;
    let (db, store) = ctx.open(&config).await?;

    let threshold = threshold.unwrap_or(config.coverage.saturation_threshold);
    let analyzer = CoverageAnalyzer::new(store, threshold)?;
    let report = analyzer.analyze(&scope).await?;
    db.close().await;

    if ctx.json() {
        print_json(&report)?;
    } else if ctx.text() {
        print_coverage(&report);
    }
    Ok(Outcome::Clean)
}

async fn cmd_skills(ctx: &Globals, action: SkillAction) -> anyhow::Result<Outcome> {
    let config = Config::load()?;
    let (db, store) = ctx.open(&config).await?;

    let outcome = match action {
        SkillAction::List { work_type } => {
            let skills = match &work_type {
                Some(id) => {
                    if !store.work_type_exists(id).await? {
                        return Err(taxonomy_core::Error::WorkTypeNotFound(id.clone()).into());
                    }
                    store.skills_for_work_type(id).await?
                }
                None => store.list_skills().await?,
            };

            if ctx.json() {
                print_json(&skills)?;
            } else if ctx.text() {
                if skills.is_empty() {
                    println!("No skills found.");
                }
                for skill in &skills {
                    match &skill.category {
                        Some(category) => println!("{}  {} [{}]", skill.id, skill.name, category),
                        None => println!("{}  {}", skill.id, skill.name),
                    }
                }
            }
            Outcome::Clean
        }
        SkillAction::Resolve { name, create } => {
            let resolver = SkillResolver::new(store);
            let resolved = if create {
                Some(resolver.resolve_with_category(&name, None).await?)
            } else {
                resolver
                    .lookup(&name)
                    .await?
                    .map(|skill| ResolvedSkill {
                        skill,
                        created: false,
                    })
            };

            match resolved {
                Some(resolved) => {
                    if ctx.json() {
                        print_json(&resolved.skill)?;
                    } else if ctx.text() {
                        let note = if resolved.created { " (created)" } else { "" };
                        println!("{}  {}{}", resolved.skill.id, resolved.skill.name, note);
                    }
                    Outcome::Clean
                }
                None => {
                    if ctx.json() {
                        print_json(&serde_json::Value::Null)?;
                    } else if ctx.text() {
                        println!("No skill matches '{}'.", name);
                        println!("\nCreate it with: taxonomy skills resolve \"{}\" --create", name);
                    }
                    Outcome::Unresolved
                }
            }
        }
    };

    db.close().await;
    Ok(outcome)
}

fn cmd_config(ctx: &Globals, action: ConfigAction) -> anyhow::Result<Outcome> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            let value = config.get(&key)?;
            println!("{}", value);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            if !ctx.quiet {
                println!("Set {} = {}", key, value);
            }
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let items = config.list()?;
            if ctx.json() {
                let map: std::collections::BTreeMap<_, _> = items.into_iter().collect();
                print_json(&map)?;
            } else {
                for (key, value) in items {
                    println!("{} = {}", key, value);
                }
            }
        }
        ConfigAction::Reset => {
            Config::reset()?;
            if !ctx.quiet {
                println!("Configuration reset to defaults.");
            }
        }
        ConfigAction::Path => {
            let path = Config::config_path()?;
            println!("{}", path.display());
        }
    }
    Ok(Outcome::Clean)
}

async fn cmd_doctor(ctx: &Globals) -> anyhow::Result<Outcome> {
    let quiet = ctx.quiet;
    if !quiet {
        println!("Taxonomy Health Check");
        println!("=====================");
        println!();
    }

    let mut all_ok = true;

    let config = match Config::load() {
        Ok(config) => {
            if !quiet {
                println!("[OK] Configuration: Valid");
            }
            config
        }
        Err(e) => {
            all_ok = false;
            if !quiet {
                println!("[!!] Configuration: Error - {:#}", e);
            }
            Config::default()
        }
    };

    if !quiet {
        match Config::config_path() {
            Ok(path) if path.exists() => println!("[OK] Config file: {}", path.display()),
            Ok(path) => println!("[--] Config file: {} (using defaults)", path.display()),
            Err(e) => println!("[!!] Config file: {:#}", e),
        }
    }

    match ctx.open(&config).await {
        Ok((db, store)) => {
            match db.health_check().await {
                Ok(()) => {
                    if !quiet {
                        println!("[OK] Database: {}", db.path().display());
                    }
                }
                Err(e) => {
                    all_ok = false;
                    if !quiet {
                        println!("[!!] Database: {:#}", e);
                    }
                }
            }

            let status = db.migration_status().await?;
            if status.needs_migration {
                all_ok = false;
                if !quiet {
                    println!(
                        "[!!] Schema: version {} (expected {})",
                        status.current_version, status.target_version
                    );
                }
            } else if !quiet {
                println!("[OK] Schema: version {}", status.current_version);
            }

            if !quiet {
                let focus_areas = store.list_focus_areas().await?.len();
                let work_types = store.list_work_types().await?.len();
                let skills = store.list_skills().await?.len();
                println!(
                    "[--] Taxonomy: {} focus areas, {} work types, {} skills",
                    focus_areas, work_types, skills
                );
            }
            db.close().await;
        }
        Err(e) => {
            all_ok = false;
            if !quiet {
                println!("[!!] Database: {:#}", e);
            }
        }
    }

    if !quiet {
        println!();
        if all_ok {
            println!("All checks passed.");
        } else {
            println!("Some checks failed.");
        }
    }

    if all_ok {
        Ok(Outcome::Clean)
    } else {
        Err(anyhow!("Some health checks failed"))
    }
}

// ============================================================================
// Text Rendering
// ============================================================================

fn print_seed(report: &SeedReport) {
    println!("Seed applied.");
    println!("  Focus areas created: {}", report.focus_areas_created);
    println!("  Categories created:  {}", report.categories_created);
    println!("  Work types created:  {}", report.work_types_created);
    println!("  Unchanged:           {}", report.unchanged);
}

fn print_mapping(report: &MappingReport) {
    println!("Added: {}", report.added);
    println!("Already linked: {}", report.already_linked);
    println!("Skills created: {}", report.skills_created);
    if report.duplicates_in_request > 0 {
        println!("Repeated names skipped: {}", report.duplicates_in_request);
    }

    if !report.unknown_work_types.is_empty() {
        println!("\nUnknown work types:");
        for id in &report.unknown_work_types {
            println!("  - {}", id);
        }
    }
    if !report.unresolved_skill_names.is_empty() {
        println!("\nUnresolved skill names:");
        for name in &report.unresolved_skill_names {
            println!("  - {:?}", name);
        }
    }

    let failed = report
        .links
        .iter()
        .filter(|link| link.status == LinkStatus::ResolutionFailed)
        .count();
    if failed > 0 {
        println!("\n{} item(s) failed to resolve.", failed);
    }
}

fn print_coverage(report: &CoverageReport) {
    println!(
        "Coverage ({}, threshold {}): {:.1}%",
        report.scope, report.threshold, report.coverage_pct
    );
    println!(
        "  Work types: {} total, {} skilled, {} saturated",
        report.total_work_types, report.skilled_work_types, report.saturated_work_types
    );

    for area in &report.focus_areas {
        let depth = if area.full_depth { "full depth" } else { "partial" };
        println!(
            "  {} ({}): {:.1}%, {}/{} categories covered, {}",
            area.label,
            area.focus_area_id,
            area.coverage_pct,
            area.covered_categories,
            area.total_categories,
            depth
        );
    }

    if !report.uncovered_categories.is_empty() {
        println!("\nUncovered categories:");
        for category in &report.uncovered_categories {
            println!("  - {} ({})", category.id, category.label);
        }
    }
    if !report.unsaturated_work_types.is_empty() {
        println!("\nUnsaturated work types:");
        for work_type in &report.unsaturated_work_types {
            println!(
                "  - {} ({} of {})",
                work_type.id, work_type.skill_count, report.threshold
            );
        }
    }
}

fn print_pass(report: &PassReport) {
    let mode = if report.dry_run { " (dry run)" } else { "" };
    println!("Reconciliation pass {}{}", report.run_id, mode);
    println!(
        "  Coverage: {:.1}% -> {:.1}%",
        report.before.coverage_pct, report.after.coverage_pct
    );
    println!();
    print_mapping(&report.mapping);

    if !report.unresolved_gaps.is_empty() {
        println!("\nGaps without suggestions:");
        for gap in &report.unresolved_gaps {
            println!("  - {} ({})", gap.id, gap.label);
        }
    }
    for regression in &report.regressions {
        println!(
            "\nWarning: coverage for {} dropped from {:.1}% to {:.1}%",
            regression.scope, regression.before_pct, regression.after_pct
        );
    }
}
