use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use hrms_kernel::{
    config::Config,
    services::retention::{RetentionReport, run_retention_sweep},
    state::AppState,
};
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Clears selfie photos and reverse-geocoded addresses from clock records
/// past the retention window. Clock times, GPS and face flags are kept.
#[derive(Debug, Parser)]
#[command(name = "retention-sweep", version, about)]
struct Cli {
    /// Report what would be cleared without touching any record.
    #[arg(long)]
    dry_run: bool,

    /// Treat every record with media as eligible, regardless of age.
    #[arg(long)]
    force: bool,

    /// Records fetched per batch (overrides BATCH_SIZE).
    #[arg(long, value_name = "N")]
    batch: Option<u32>,

    /// Print the final report as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Debug-level logging.
    #[arg(short, long)]
    verbose: bool,
}

fn print_summary(report: &RetentionReport) {
    let s = &report.summary;
    println!("── Retention sweep ─────────────────────────────");
    if let Some(cutoff) = report.cutoff {
        println!("  cutoff            {}", cutoff.to_rfc3339());
    }
    println!("  processed         {}", report.processed);
    if report.dry_run {
        println!("  would clear       {}", report.planned);
    } else {
        println!("  cleared           {}", report.deleted);
    }
    println!("  skipped           {}", report.skipped);
    println!("  errors            {}", report.errors);
    if report.cancelled {
        println!("  (cancelled before completion)");
    }
    println!("── Compliance ──────────────────────────────────");
    println!("  records w/ media  {}", s.total);
    println!("  pending           {}", s.pending);
    println!("  overdue           {}", s.overdue);
    println!("  completed         {}", s.completed);
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // ─── Logging ──────────────────────────────────────────────────────────────
    let default_filter = if cli.verbose {
        "hrms_kernel=debug,retention_sweep=debug"
    } else {
        "hrms_kernel=info,retention_sweep=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    // ─── Config ───────────────────────────────────────────────────────────────
    let mut config = Config::from_env().context("loading configuration")?;
    config.retention.dry_run = cli.dry_run;
    config.retention.force = cli.force;
    if let Some(batch) = cli.batch {
        config.retention.batch_size = batch;
    }
    config.retention.validate().context("validating retention options")?;
    let retention = config.retention.clone();

    // ─── Database ─────────────────────────────────────────────────────────────
    let state = AppState::connect(config)
        .await
        .context("connecting to the database")?;

    // ─── Cancellation ─────────────────────────────────────────────────────────
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing the current batch");
            on_signal.cancel();
        }
    });

    // ─── Sweep ────────────────────────────────────────────────────────────────
    let report = run_retention_sweep(state.store.as_ref(), &retention, Utc::now(), &cancel)
        .await
        .context("running the retention sweep")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }
    info!("Retention sweep exiting with code {}", report.exit_code());
    Ok(ExitCode::from(report.exit_code()))
}
