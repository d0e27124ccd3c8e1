//! `card-automation` CLI entry-point.
//!
//! Available sub-commands:
//! - `migrate`: run pending database migrations.
//! - `validate`: validate a value stream JSON file.
//! - `path`: print the statuses a move crosses.
//! - `simulate`: replay a scenario file against in-memory stores.
//! - `import-rules`: load rule definitions into the database.
//! - `consume`: match JSON-lines lifecycle events from stdin against the database.
//! - `history`: print recent execution logs of a rule.

mod config;
mod consume;
mod scenario;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use engine::{is_rollback, resolve_path, validate_workflow, RuleDefinition, WorkflowDefinition};

#[derive(Parser)]
#[command(
    name = "card-automation",
    about = "Card lifecycle rule trigger and execution engine",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run pending database migrations.
    Migrate {
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,
    },
    /// Validate a value stream JSON file and print its linear order.
    Validate {
        /// Path to the value stream JSON file.
        path: PathBuf,
    },
    /// Print the statuses crossed moving a card between two statuses.
    Path {
        /// Path to the value stream JSON file.
        workflow: PathBuf,
        from: String,
        to: String,
    },
    /// Replay a scenario file with dry-run actions.
    Simulate {
        scenario: PathBuf,
        /// Executor config JSON file.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Actually sleep between retry attempts.
        #[arg(long)]
        wait: bool,
    },
    /// Insert or replace rule definitions from a JSON array file.
    ImportRules {
        path: PathBuf,
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,
    },
    /// Consume JSON-lines lifecycle events from stdin with dry-run actions.
    Consume {
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,
        /// Executor config JSON file.
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value_t = 10)]
        max_connections: u32,
    },
    /// Print the most recent execution logs of a rule.
    History {
        rule_id: Uuid,
        #[arg(long, default_value_t = 20)]
        limit: i64,
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Migrate { database_url } => {
            info!("Running migrations");
            let pool = db::pool::create_pool(&database_url, 2)
                .await
                .context("failed to connect to database")?;
            db::pool::run_migrations(&pool).await.context("migration failed")?;
            info!("Migrations applied successfully");
        }
        Command::Validate { path } => {
            let workflow = read_workflow(&path)?;
            let order = validate_workflow(&workflow)
                .with_context(|| format!("value stream '{}' is invalid", workflow.id))?;
            println!("value stream '{}' is valid. Linear order: {order:?}", workflow.id);
        }
        Command::Path { workflow, from, to } => {
            let workflow = read_workflow(&workflow)?;
            validate_workflow(&workflow)?;
            let path: Vec<&str> = resolve_path(&workflow, &from, &to)?
                .into_iter()
                .map(|s| s.id.as_str())
                .collect();
            let direction = if is_rollback(&workflow, &from, &to)? { "rollback" } else { "move" };
            println!("{direction}: {}", path.join(" -> "));
        }
        Command::Simulate { scenario: path, config, wait } => {
            let config = config::load_executor_config(config.as_deref())?;
            let scenario = scenario::Scenario::load(&path)?;
            let reports = scenario::run(scenario, config, wait).await?;
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
        Command::ImportRules { path, database_url } => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            let rules: Vec<RuleDefinition> = serde_json::from_str(&content)
                .with_context(|| format!("invalid rule list in {}", path.display()))?;
            let pool = db::pool::create_pool(&database_url, 2)
                .await
                .context("failed to connect to database")?;
            for rule in &rules {
                db::repository::rules::upsert_rule(
                    &pool,
                    rule.id,
                    rule.card_type_id,
                    rule.enabled,
                    serde_json::to_value(rule)?,
                )
                .await
                .with_context(|| format!("failed to store rule {}", rule.id))?;
            }
            info!("Imported {} rule(s)", rules.len());
        }
        Command::Consume { database_url, config, max_connections } => {
            let config = config::load_executor_config(config.as_deref())?;
            consume::run(&database_url, max_connections, config).await?;
        }
        Command::History { rule_id, limit, database_url } => {
            let pool = db::pool::create_pool(&database_url, 2)
                .await
                .context("failed to connect to database")?;
            let rows = db::repository::execution_logs::list_rule_executions(&pool, rule_id, limit).await?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }

    Ok(())
}

fn read_workflow(path: &Path) -> Result<WorkflowDefinition> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read file {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("invalid value stream JSON in {}", path.display()))
}
