//! Bank back office CLI
//!
//! Generates reports from the PostgreSQL store and keeps aggregate relation
//! sets in sync.
//!
//! # Usage
//!
//! ```bash
//! bank-reports migrate
//! bank-reports report --output-dir out clients-by-deposit --from 2024-01-01 --to 2024-03-31
//! bank-reports report deposits-by-credit-program
//! bank-reports sync set client-deposits <CLIENT_ID> --target <DEPOSIT_ID>
//! ```
//!
//! # Environment Variables
//!
//! * `BANK_DATABASE_URL` - PostgreSQL connection string
//! * `BANK_LOG_LEVEL` - Log level when `RUST_LOG` is unset (default: info)
//! * `BANK_OUTPUT_DIR` - Where reports are written (default: reports)
//! * `BANK_MAX_CONNECTIONS` - Pool size (default: 10)

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use core_kernel::{AdapterHealth, HealthCheckable};
use domain_banking::{RelationshipSynchronizer, ReportService};
use infra_db::{create_pool, run_migrations, PostgresBankAdapter};

mod commands;
mod config;

use crate::config::AppConfig;

#[derive(Debug, Parser)]
#[command(name = "bank-reports")]
#[command(about = "Bank back office - reports and relation sync", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply the database schema migrations
    Migrate,
    /// Check database connectivity
    Health,
    /// Generate a report file
    Report(commands::report::ReportArgs),
    /// Relation set maintenance
    Sync(commands::sync::SyncArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = AppConfig::from_env().context("loading BANK_* configuration")?;

    init_tracing(&config.log_level);

    let pool = create_pool(config.database()).await?;
    let adapter = PostgresBankAdapter::new(pool.clone());

    match cli.command {
        Commands::Migrate => {
            run_migrations(&pool).await?;
            tracing::info!("Database schema is up to date");
        }
        Commands::Health => {
            let result = adapter.health_check().await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if result.status != AdapterHealth::Healthy {
                anyhow::bail!("database is not healthy");
            }
        }
        Commands::Report(args) => {
            let service = ReportService::new(Arc::new(adapter));
            let cancel = CancellationToken::new();
            tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

            let path = commands::report::execute(args, &service, &config.output_dir, &cancel).await?;
            println!("{}", path.display());
        }
        Commands::Sync(args) => {
            let synchronizer = RelationshipSynchronizer::new(Arc::new(adapter));
            let output = commands::sync::execute(args, &synchronizer).await?;
            println!("{output}");
        }
    }

    pool.close().await;
    Ok(())
}

/// Initializes the tracing subscriber for structured logging
///
/// `RUST_LOG` wins over the configured level when both are set.
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();
}

/// Cancels report generation on Ctrl+C
async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::warn!("Received Ctrl+C, cancelling report generation");
            cancel.cancel();
        }
        Err(e) => tracing::warn!(error = %e, "Could not install Ctrl+C handler"),
    }
}
