//! Tourbook - tour catalog maintenance tool

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tourbook::{config::AppConfig, repository::Repository, services::Services};

#[derive(Parser)]
#[command(name = "tourbook", version, about = "Tour catalog maintenance")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run database migrations
    Migrate,
    /// Import tours from a JSON array file
    Import { path: PathBuf },
    /// Delete every tour, secret ones included
    Purge,
    /// Print per-difficulty statistics of well rated tours
    Stats,
    /// Print tour starts per month of a year
    MonthlyPlan { year: i32 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::load()?;
    let _guard = init_tracing(&config);

    tracing::info!("Starting Tourbook v{}", env!("CARGO_PKG_VERSION"));

    let repository = Repository::connect(&config.database).await?;
    tracing::info!("Connected to database");

    repository.migrate().await?;
    tracing::info!("Database migrations completed");

    let services = Services::new(repository);

    match cli.command {
        Command::Migrate => {}
        Command::Import { path } => {
            let json = tokio::fs::read_to_string(&path).await?;
            let tours = services.tours.import_json(&json).await?;
            println!("Imported {} tours from {}", tours.len(), path.display());
        }
        Command::Purge => {
            let deleted = services.tours.purge().await?;
            println!("Deleted {} tours", deleted);
        }
        Command::Stats => {
            let stats = services.tours.tour_stats().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::MonthlyPlan { year } => {
            let plan = services.tours.monthly_plan(year).await?;
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
    }

    Ok(())
}

/// Install the global subscriber. The returned guard flushes file logs on drop.
fn init_tracing(config: &AppConfig) -> WorkerGuard {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("tourbook={}", config.logging.level).into());

    let (writer, guard) = match config.logging.file.as_deref().map(Path::new) {
        Some(path) => {
            let directory = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let prefix = path
                .file_name()
                .map(|name| name.to_os_string())
                .unwrap_or_else(|| "tourbook.log".into());
            tracing_appender::non_blocking(tracing_appender::rolling::daily(directory, prefix))
        }
        None => tracing_appender::non_blocking(std::io::stderr()),
    };

    let registry = tracing_subscriber::registry().with(filter);
    let layer = tracing_subscriber::fmt::layer().with_writer(writer);
    if config.json_logs() {
        registry.with(layer.json()).init();
    } else {
        registry.with(layer.pretty()).init();
    }

    guard
}
