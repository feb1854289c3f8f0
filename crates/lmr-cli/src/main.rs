use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use tracing::info;
use uuid::Uuid;

use lmr_artifacts::{write_reconciliation_artifacts, WriteArtifactsArgs};
use lmr_config::{institution_entry, ReconcileSettings};
use lmr_store::{run_reconciliation, ReconcileArgs};

#[derive(Parser)]
#[command(name = "lmr")]
#[command(about = "Lab mapping reconciliation CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile one institution's snapshot store into canonical artifacts
    Reconcile {
        /// Institution label the run is scoped to
        #[arg(long)]
        institution: String,

        /// Snapshot storage root (overrides institutions.<label>.root)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Rank ceiling N (overrides snapshot.expected_count)
        #[arg(long)]
        expected: Option<u32>,

        /// Canonical list output path (overrides institutions.<label>.list_out)
        #[arg(long)]
        list_out: Option<PathBuf>,

        /// Diagnostics report output path (overrides institutions.<label>.report_out)
        #[arg(long)]
        report_out: Option<PathBuf>,

        /// Snapshot filename prefix (overrides snapshot.prefix)
        #[arg(long)]
        prefix: Option<String>,

        /// Reader threads for the store scan (overrides scan.workers)
        #[arg(long)]
        workers: Option<usize>,

        /// Layered config paths in merge order
        #[arg(long = "config")]
        config_paths: Vec<String>,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> site -> local)
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

fn main() -> Result<()> {
    // Load .env.local if present (dev convenience). Silent if the file does
    // not exist; deployments inject env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Reconcile {
            institution,
            root,
            expected,
            list_out,
            report_out,
            prefix,
            workers,
            config_paths,
        } => {
            // Correlates log lines of one invocation; never written to artifacts.
            let run_id = Uuid::new_v4();

            let (config_json, config_hash) = load_effective_config(&config_paths)?;
            if let Some(hash) = &config_hash {
                info!(run_id = %run_id, config_hash = %hash, "config loaded");
            }

            let settings = ReconcileSettings::from_config_json(&config_json)?;
            let entry = institution_entry(&config_json, &institution)?;

            // Precedence: explicit flag, then config, then built-in default.
            let expected_count = expected.unwrap_or(settings.expected_count);
            if !(1..=100_000).contains(&expected_count) {
                bail!("snapshot.expected_count out of bounds (1..=100000): {expected_count}");
            }
            let prefix = prefix.unwrap_or(settings.prefix);
            let workers = workers.unwrap_or(settings.workers);
            if workers > 128 {
                bail!("scan.workers out of bounds (0..=128): {workers}");
            }

            let (cfg_root, cfg_list, cfg_report) = match entry {
                Some(e) => (Some(e.root), Some(e.list_out), Some(e.report_out)),
                None => (None, None, None),
            };
            let root = require_path(root, cfg_root, "--root", &institution, "root")?;
            let list_out = require_path(list_out, cfg_list, "--list-out", &institution, "list_out")?;
            let report_out =
                require_path(report_out, cfg_report, "--report-out", &institution, "report_out")?;

            info!(
                run_id = %run_id,
                institution = %institution,
                root = %root.display(),
                expected_count,
                workers,
                "reconcile run starting"
            );

            let outcome = run_reconciliation(&ReconcileArgs {
                root,
                institution: institution.clone(),
                prefix,
                expected_count,
                workers,
            })?;

            let written = write_reconciliation_artifacts(WriteArtifactsArgs {
                list_out: &list_out,
                report_out: &report_out,
                canonical: &outcome.canonical,
                report: &outcome.report,
            })?;

            let s = &outcome.report.summary;
            println!("institution={}", s.institution);
            println!(
                "files_scanned={} records_normalized={} parse_failures={}",
                s.files_scanned, s.records_normalized, s.parse_failures
            );
            println!(
                "canonical={} missing={} duplicate_groups={} out_of_range={} no_rank={}",
                s.rank_groups,
                s.missing_count,
                s.duplicate_groups,
                s.out_of_range_count,
                s.no_rank_count
            );
            if !outcome.report.missing_ranks.is_empty() {
                println!("missing_ranges={}", outcome.report.missing_ranges);
            }
            println!(
                "complete={} perfect={}",
                outcome.report.complete, outcome.report.perfect
            );
            println!("list_out={}", written.list_path.display());
            println!("report_out={}", written.report_path.display());
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = lmr_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// Merge config layers into one effective document. No `--config` flags means
/// an empty document: built-in defaults apply and nothing is configured.
fn load_effective_config(paths: &[String]) -> Result<(Value, Option<String>)> {
    if paths.is_empty() {
        return Ok((serde_json::json!({}), None));
    }
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let loaded = lmr_config::load_layered_yaml(&path_refs)?;
    Ok((loaded.config_json, Some(loaded.config_hash)))
}

fn require_path(
    flag: Option<PathBuf>,
    configured: Option<PathBuf>,
    flag_name: &str,
    institution: &str,
    config_key: &str,
) -> Result<PathBuf> {
    flag.or(configured).with_context(|| {
        format!("missing {flag_name} (or configure institutions.{institution}.{config_key})")
    })
}
