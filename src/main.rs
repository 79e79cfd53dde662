//! # segsync
//!
//! Mirrors the membership of a marketing segment into a local record and
//! posts a `Joined Segment` / `Left Segment` event for every member whose
//! membership changed since the last run.
//!
//! ```bash
//! # One cycle, configured from the environment
//! SEGSYNC_SEGMENT_ID=XyZ123 SEGSYNC_API_KEY=pk_... segsync
//!
//! # Inspect the record
//! segsync status --state /var/lib/segsync/cache.json
//!
//! # Exercise the reconciler against a drifting in-memory segment
//! segsync simulate --runs 500 --population 2000
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::*;
use segsync_sdk::{JsonFileStore, RunOutcome, SegmentSync, StateStore, SyncConfig};
use simulate::{simulate, SimulationParams};
use tracing_subscriber::EnvFilter;

pub mod simulate;

// ─── CLI ───────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "segsync")]
#[command(about = "Segment membership sync with join/leave lifecycle events")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one sync cycle (the default)
    Run(RunArgs),
    /// Show the persisted membership record
    Status {
        /// Path of the record (overrides SEGSYNC_STATE_PATH)
        #[arg(long)]
        state: Option<PathBuf>,
    },
    /// Simulate many cycles against an in-memory segment and check convergence
    Simulate {
        #[arg(long, default_value_t = 200)]
        runs: usize,
        #[arg(long, default_value_t = 500)]
        population: usize,
        /// Chance a member flips in or out between runs
        #[arg(long, default_value_t = 0.05)]
        churn: f64,
        /// Chance a member's deliveries are rejected
        #[arg(long, default_value_t = 0.02)]
        failure_rate: f64,
        /// Chance a run observes an empty segment
        #[arg(long, default_value_t = 0.05)]
        empty_rate: f64,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

#[derive(Args, Default)]
struct RunArgs {
    /// Path of the record (overrides SEGSYNC_STATE_PATH)
    #[arg(long)]
    state: Option<PathBuf>,
    /// Segment identifier (overrides SEGSYNC_SEGMENT_ID)
    #[arg(long)]
    segment_id: Option<String>,
    /// Segment name attached to events (overrides SEGSYNC_SEGMENT_NAME)
    #[arg(long)]
    segment_name: Option<String>,
    /// Members per page (overrides SEGSYNC_PAGE_SIZE)
    #[arg(long)]
    page_size: Option<usize>,
    /// Reconcile even if the segment comes back empty
    #[arg(long)]
    allow_empty: bool,
}

// ─── Configuration ─────────────────────────────────────────────────────────

/// Environment first, then command line overrides.
fn load_config(args: &RunArgs) -> Result<SyncConfig> {
    let overrides: [(&str, Option<String>); 5] = [
        ("SEGSYNC_SEGMENT_ID", args.segment_id.clone()),
        ("SEGSYNC_SEGMENT_NAME", args.segment_name.clone()),
        ("SEGSYNC_PAGE_SIZE", args.page_size.map(|n| n.to_string())),
        (
            "SEGSYNC_STATE_PATH",
            args.state.as_ref().map(|p| p.display().to_string()),
        ),
        (
            "SEGSYNC_ALLOW_EMPTY",
            args.allow_empty.then(|| "true".to_string()),
        ),
    ];

    let config = SyncConfig::from_lookup(|key| {
        overrides
            .iter()
            .find(|(k, _)| *k == key)
            .and_then(|(_, v)| v.clone())
            .or_else(|| std::env::var(key).ok())
    })?;

    tracing::info!(
        segment_id = %config.segment_id,
        segment_name = %config.segment_name,
        base_url = %config.base_url,
        page_size = config.page_size,
        state_path = %config.state_path.display(),
        allow_empty_segment = config.allow_empty_segment,
        "segsync configuration loaded"
    );
    Ok(config)
}

// ─── Commands ──────────────────────────────────────────────────────────────

async fn run_cycle(args: RunArgs) -> Result<()> {
    let config = load_config(&args)?;
    let sync = SegmentSync::from_config(config)?;

    // Failures are logged; the exit code does not distinguish them.
    match sync.run_once().await {
        Ok(RunOutcome::Applied(summary)) => tracing::info!(
            added = summary.added.len(),
            removed = summary.removed.len(),
            failed = summary.report.failures(),
            "Cycle complete"
        ),
        Ok(RunOutcome::Unchanged { members }) => {
            tracing::info!(members, "Cycle complete, nothing to do")
        }
        Ok(RunOutcome::SkippedEmpty) => tracing::warn!("No profiles fetched, cycle skipped"),
        Err(e) => tracing::error!(error = %e, "Cycle failed"),
    }
    Ok(())
}

fn show_status(state: Option<PathBuf>) {
    let path = state
        .or_else(|| std::env::var("SEGSYNC_STATE_PATH").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(segsync_store::file::DEFAULT_STATE_PATH));
    let store = JsonFileStore::new(&path);
    let record = store.load();

    let bar = "═".repeat(60);
    println!("\n{}", bar.bright_cyan());
    println!("  {}", format!("Record: {}", path.display()).bold().bright_white());
    println!("{}", bar.bright_cyan());

    let updated = match record.last_updated {
        Some(ts) => ts.to_rfc3339().bright_green().to_string(),
        None => "never".dimmed().to_string(),
    };
    println!("  {} {}", "last updated:".bold(), updated);
    println!(
        "  {} {}",
        "members:".bold(),
        record.members.len().to_string().bright_yellow()
    );

    if record.members.is_empty() {
        println!("  {}", "(no members)".dimmed());
    } else {
        for identity in &record.members {
            println!("  {} {}", "•".bright_green(), identity);
        }
    }
}

async fn run_simulation(params: SimulationParams) {
    let stats = simulate(params).await;
    stats.print();

    if stats.converged() {
        println!(
            "\n  {} {}",
            "✓".bright_green().bold(),
            "RECORD MIRRORED THE SEGMENT AFTER EVERY RUN".bright_green().bold()
        );
    } else {
        println!(
            "\n  {} {}",
            "✗".bright_red().bold(),
            format!("DIVERGENCE DETECTED in {} runs", stats.divergences)
                .bright_red()
                .bold()
        );
    }
}

// ─── Entry point ───────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run(RunArgs::default())) {
        Commands::Run(args) => run_cycle(args).await?,
        Commands::Status { state } => show_status(state),
        Commands::Simulate {
            runs,
            population,
            churn,
            failure_rate,
            empty_rate,
            seed,
        } => {
            let params = SimulationParams {
                runs,
                population,
                churn: churn.clamp(0.0, 1.0),
                failure_rate: failure_rate.clamp(0.0, 1.0),
                empty_rate: empty_rate.clamp(0.0, 1.0),
                seed,
            };
            run_simulation(params).await;
        }
    }

    Ok(())
}
