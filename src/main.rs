use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use job_importer::apis::greenhouse::GreenhouseBoard;
use job_importer::config::{Config, SinkConfig};
use job_importer::logging;
use job_importer::normalize::normalize;
use job_importer::pipeline::{Importer, RunSummary};
use job_importer::sink::{InMemorySink, JobSink, JsonFileSink, SupabaseSink};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "job_importer")]
#[command(about = "Imports Greenhouse job postings into a Supabase jobs table")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, normalize and upsert jobs for the configured companies
    Run {
        /// Path to the TOML config file (defaults to ./config.toml if present)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Specific board tokens to import (comma-separated)
        #[arg(long)]
        companies: Option<String>,
        /// Normalize without writing anywhere
        #[arg(long, conflicts_with = "output_dir")]
        dry_run: bool,
        /// Write normalized jobs to a JSON file in this directory instead of Supabase
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Normalize a saved board response and print the result as JSON
    Normalize {
        /// File holding either `{"jobs": [...]}` or a bare array of jobs
        #[arg(long)]
        input: PathBuf,
        /// Company display name to stamp on each record
        #[arg(long)]
        company: String,
    },
    /// List configured board tokens and display names
    Companies {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = logging::init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            companies,
            dry_run,
            output_dir,
        } => {
            println!("🚀 Job Importer started...");
            let config = Config::load(config.as_deref()).context("Failed to load configuration")?;
            let selected = config.select_companies(companies.as_deref())?;

            let sink: Arc<dyn JobSink> = if dry_run {
                info!("Dry run: records are kept in memory only");
                Arc::new(InMemorySink::new())
            } else if let Some(dir) = output_dir {
                Arc::new(JsonFileSink::new(dir))
            } else {
                let sink_config = SinkConfig::from_env().context("Failed to load Supabase settings")?;
                let timeout = Duration::from_secs(config.greenhouse.timeout_seconds);
                Arc::new(SupabaseSink::new(sink_config, timeout)?)
            };
            let board = Arc::new(GreenhouseBoard::new(&config.greenhouse)?);

            let importer = Importer::new(board, sink, selected);
            let summary = importer.run().await;
            print_summary(&summary);

            if !summary.is_successful() {
                if let Some(e) = &summary.flush_error {
                    error!("Imported records were not persisted: {}", e);
                    anyhow::bail!("imported records were not persisted: {}", e);
                }
                error!("Every company failed to import");
                anyhow::bail!("every company failed to import");
            }
        }
        Commands::Normalize { input, company } => {
            let content = std::fs::read_to_string(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let body: serde_json::Value = serde_json::from_str(&content)?;
            let jobs = match body {
                serde_json::Value::Array(jobs) => jobs,
                other => GreenhouseBoard::extract_jobs(other)?,
            };

            let mut records = Vec::with_capacity(jobs.len());
            for (index, raw) in jobs.iter().enumerate() {
                match normalize(raw, &company) {
                    Ok(record) => records.push(record),
                    Err(e) => {
                        warn!("Skipping job at index {}: {}", index, e);
                        eprintln!("⚠️  Skipping job at index {}: {}", index, e);
                    }
                }
            }
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Commands::Companies { config } => {
            let config = Config::load(config.as_deref()).context("Failed to load configuration")?;
            for company in config.select_companies(None)? {
                println!("{:<20} {}", company.token, company.display_name);
            }
        }
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("\n📊 Import results (run {}):", summary.run_id);
    for company in &summary.companies {
        match &company.fetch_error {
            Some(e) => println!("   {} ({}): failed - {}", company.display_name, company.token, e),
            None => println!(
                "   {} ({}): {} found, {} imported, {} failed",
                company.display_name,
                company.token,
                company.total_jobs,
                company.imported,
                company.failures.len()
            ),
        }
    }
    println!(
        "   Total: {} imported, {} failed, {} of {} companies failed",
        summary.records_imported(),
        summary.records_failed(),
        summary.companies_failed(),
        summary.companies.len()
    );

    if let Some(e) = &summary.flush_error {
        println!("\n⚠️  Failed to write output: {}", e);
    }
}
