//! notes-migrate: schema migration CLI for the notes service
//!
//! `notes-migrate --direction up` applies every pending change-set;
//! `notes-migrate --direction down` rolls back the most recent one.

mod config;

use std::str::FromStr;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use notes_migrate::{connect, notes_registry, Direction, MigrationRunner};

#[derive(Parser)]
#[command(name = "notes-migrate")]
#[command(about = "Schema migration tool for the notes service database")]
struct Cli {
    /// Migration direction: `up` applies all pending change-sets, `down`
    /// rolls back the single most recent one
    #[arg(long, default_value = "up")]
    direction: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    // Validated before any database interaction
    let direction = Direction::from_str(&cli.direction)?;

    let database_url = config::database_url()?;
    let pool = connect(&database_url).await?;
    let runner = MigrationRunner::new(pool, notes_registry()?);

    match direction {
        Direction::Up => {
            let report = runner.apply_pending().await?;
            info!(
                "Migrations up completed: {} applied, {} already in place ({} ms)",
                report.applied.len(),
                report.skipped,
                report.execution_time_ms
            );
        }
        Direction::Down => {
            let report = runner.rollback_one().await?;
            match report.rolled_back {
                Some(version) => info!("Rolled back change-set v{}", version),
                None => info!("No applied change-sets to roll back"),
            }
        }
    }

    Ok(())
}
