use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod baseline;
mod classify;
mod config;
mod db;
mod error;
mod interval;
mod models;
mod report;
mod scoring;
mod total;

use config::{ScoringArgs, ScoringConfig, DEFAULT_REFERENCE_DATE};
use models::{ScoreRow, TotalScoreRow};

#[derive(Parser)]
#[command(name = "workload-scoring")]
#[command(about = "Support agent workload scoring from ticket history", long_about = None)]
struct Cli {
    /// Log at debug level unless RUST_LOG is set
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load synthetic ticket history ending the day before the reference date
    Seed {
        #[arg(long, default_value_t = DEFAULT_REFERENCE_DATE)]
        reference_date: NaiveDate,
    },
    /// Import raw tickets from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Score agent workload and append the results
    Score {
        #[command(flatten)]
        scoring: ScoringArgs,
        /// Score without persisting results
        #[arg(long)]
        dry_run: bool,
        /// Provenance tag stored with every result row
        #[arg(long, default_value = "workload-scoring")]
        developer: String,
        /// Print all result tables as JSON
        #[arg(long)]
        json: bool,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Generate a markdown workload report
    Report {
        #[command(flatten)]
        scoring: ScoringArgs,
        #[arg(long, default_value = "workload-report.md")]
        out: PathBuf,
    },
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    by_status: &'a [ScoreRow],
    totals: &'a [TotalScoreRow],
    by_channel: &'a [ScoreRow],
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to the ticket store Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed { reference_date } => {
            let stored = db::seed(&pool, reference_date).await?;
            println!("Seeded {stored} tickets ending before {reference_date}.");
        }
        Commands::Import { csv } => {
            let summary = db::import_csv(&pool, &csv).await?;
            println!("Stored {} tickets from {}.", summary.stored, csv.display());
            if summary.unscored > 0 {
                println!(
                    "{} of them are neither closed nor solved and will not be scored.",
                    summary.unscored
                );
            }
        }
        Commands::Score {
            scoring: args,
            dry_run,
            developer,
            json,
            limit,
        } => {
            let config = ScoringConfig::from(&args);
            config.validate()?;

            let records = db::fetch_records(&pool, &config).await?;
            let run = scoring::run(&records, &config)?;

            if json {
                let output = JsonOutput {
                    by_status: &run.by_status.rows,
                    totals: &run.totals.rows,
                    by_channel: &run.by_channel.rows,
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else if run.totals.rows.is_empty() {
                println!("No agents found for this window.");
            } else {
                let mut totals: Vec<&TotalScoreRow> = run.totals.rows.iter().collect();
                totals.sort_by(|a, b| {
                    b.score_value
                        .partial_cmp(&a.score_value)
                        .unwrap_or(std::cmp::Ordering::Equal)
                });

                println!("Most loaded agents as of {}:", config.reference_date);
                for total in totals.iter().take(limit) {
                    let statuses = run
                        .by_status
                        .rows
                        .iter()
                        .filter(|row| row.assignee_id == total.assignee_id)
                        .map(|row| format!("{} {}", row.status, row.score_value))
                        .collect::<Vec<_>>()
                        .join(", ");
                    println!(
                        "- {} total {:.2} ({})",
                        total.assignee_id, total.score_value, statuses
                    );
                }
            }

            let skipped = run.by_status.skipped.len()
                + run.by_channel.skipped.len()
                + run.totals.skipped.len();
            if skipped > 0 {
                println!("Skipped {skipped} slices; see the log for reasons.");
            }

            if dry_run {
                info!("dry run, results not persisted");
            } else {
                let provenance = db::Provenance::new(developer, config.reference_date);
                let summary = db::persist_run(&pool, &run, &provenance).await?;
                println!(
                    "Stored {} status, {} total and {} channel rows under run {}.",
                    summary.status_rows,
                    summary.total_rows,
                    summary.channel_rows,
                    provenance.run_id
                );
            }
        }
        Commands::Report { scoring: args, out } => {
            let config = ScoringConfig::from(&args);
            config.validate()?;

            let records = db::fetch_records(&pool, &config).await?;
            let run = scoring::run(&records, &config)?;
            let report = report::build_report(&config, &run)?;
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
