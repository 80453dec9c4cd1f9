//! # ifg-reconcile CLI (`ifgr`)
//!
//! Reconciliation and tagging commands for the interferogram pipeline.
//!
//! ## Usage
//!
//! ```bash
//! ifgr --config ./config/ifgr.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ifgr tag --context ctx.json` | Tag interferograms per AOI as validated/invalid/in-progress |
//! | `ifgr denylist` | Denylist missing products whose jobs failed terminally |
//! | `ifgr greylist --context ctx.json` | Greylist the expected product of one failed job |
//! | `ifgr denylist-from-job --context ctx.json` | Denylist the expected product of one failed job |
//! | `ifgr enumerate --context ctx.json` | Submit re-enumeration jobs from a denylist product |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ifg_reconcile::product::ExclusionKind;
use ifg_reconcile::{config, context, denylist, enumerate, from_job, tag::AoiState, tagger};

/// Interferogram pipeline reconciliation: missing-product detection,
/// failure denylisting, and per-AOI validation tagging.
#[derive(Parser)]
#[command(
    name = "ifgr",
    about = "Set reconciliation, failure denylisting, and AOI tagging for a SAR interferogram pipeline",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ifgr.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tag interferograms per AOI based on acquisition-list coverage.
    ///
    /// For every AOI over the trigger product's extent, derives
    /// validated/invalid/in-progress from set relationships among the
    /// acquisition-list, interferogram, and blacklist collections, and
    /// rewrites each interferogram's state tag. Idempotent.
    Tag {
        /// Path to the run context (JSON) of the trigger product.
        #[arg(long, default_value = "_context.json")]
        context: PathBuf,
    },

    /// Generate denylist products for terminally failed pairings.
    ///
    /// Reconciles acquisition plans against produced interferograms and
    /// the existing denylist, confirms failures against the job registry,
    /// and writes/submits one denylist product per confirmed candidate.
    Denylist,

    /// Generate a greylist product from one failed job.
    ///
    /// Reads the failed job's run context, and greylists its expected
    /// product unless one already exists or the retry count is below the
    /// configured requirement.
    Greylist {
        /// Path to the failed job's run context (JSON).
        #[arg(long, default_value = "_context.json")]
        context: PathBuf,
    },

    /// Generate a denylist product from one failed job.
    ///
    /// Same flow as `greylist`, but the expected product is denylisted
    /// permanently instead of greylisted.
    DenylistFromJob {
        /// Path to the failed job's run context (JSON).
        #[arg(long, default_value = "_context.json")]
        context: PathBuf,
    },

    /// Submit re-enumeration jobs for the AOIs a denylist product covers.
    Enumerate {
        /// Path to the denylist product's run context (JSON).
        #[arg(long, default_value = "_context.json")]
        context: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Tag { context } => {
            let ctx = context::load_context(&context)?;
            let outcomes = tagger::run_tagging(&cfg, &ctx).await?;
            println!("tagging run");
            println!("  AOIs evaluated: {}", outcomes.len());
            for outcome in &outcomes {
                match outcome.state {
                    AoiState::Skipped => {
                        println!("  {}: skipped (no acquisition lists in scope)", outcome.aoi);
                    }
                    state => {
                        println!(
                            "  {}: {} ({} products tagged)",
                            outcome.aoi, state, outcome.tagged
                        );
                    }
                }
                for missing in &outcome.missing {
                    println!("    missing interferogram for: {missing}");
                }
            }
            println!("ok");
        }
        Commands::Denylist => {
            let summary = denylist::run_denylist(&cfg).await?;
            println!("denylist run");
            println!("  acquisition plans: {}", summary.plans);
            println!("  produced interferograms: {}", summary.produced);
            println!("  already denylisted: {}", summary.excluded);
            println!("  missing: {}", summary.missing);
            println!("  terminally failed candidates: {}", summary.candidates);
            println!("  submitted: {}", summary.submitted);
            println!("  duplicates skipped: {}", summary.duplicates);
            println!("  failed: {}", summary.failed);
            println!("ok");
        }
        Commands::Greylist { context } => {
            let ctx = context::load_context(&context)?;
            let outcome = from_job::run_from_job(&cfg, &ctx, ExclusionKind::Greylist).await?;
            report_from_job("greylist", outcome);
        }
        Commands::DenylistFromJob { context } => {
            let ctx = context::load_context(&context)?;
            let outcome = from_job::run_from_job(&cfg, &ctx, ExclusionKind::Denylist).await?;
            report_from_job("denylist", outcome);
        }
        Commands::Enumerate { context } => {
            let ctx = context::load_context(&context)?;
            let submitted = enumerate::run_enumerate(&cfg, &ctx).await?;
            println!("enumeration jobs submitted: {submitted}");
            println!("ok");
        }
    }

    Ok(())
}

fn report_from_job(list: &str, outcome: from_job::FromJobOutcome) {
    match outcome {
        from_job::FromJobOutcome::Submitted(label) => {
            println!("{list} product submitted: {label}");
        }
        from_job::FromJobOutcome::Duplicate(id) => {
            println!("{list} product already exists: {id}");
        }
        from_job::FromJobOutcome::BelowRetryThreshold => {
            println!("retry count below requirement; nothing to do");
        }
        from_job::FromJobOutcome::SubmissionFailed(label) => {
            println!("{list} submission failed: {label} (directory left on disk)");
        }
    }
    println!("ok");
}
