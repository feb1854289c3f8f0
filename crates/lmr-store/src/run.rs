//! One-shot reconciliation run: walk, scan, resolve, validate.
//!
//! The emitter is deliberately not called here; callers decide where (and
//! whether) the artifacts land. This keeps the run itself side-effect free
//! apart from reading the store.

use std::path::PathBuf;

use tracing::info;

use lmr_reconcile::{
    build_report, partition_records, resolve, CanonicalMapping, ReconciliationReport, ScanStats,
};

use crate::scan::scan_store;
use crate::walker::SnapshotWalker;

/// Parameters for one institution's pass.
#[derive(Clone, Debug)]
pub struct ReconcileArgs {
    /// Storage root holding the snapshot files.
    pub root: PathBuf,
    /// Institution label the run is scoped to.
    pub institution: String,
    /// Snapshot filename prefix, e.g. `mapping_snapshot_`.
    pub prefix: String,
    /// Rank ceiling N; canonical ranks are `1..=N`.
    pub expected_count: u32,
    /// Reader threads for the scan. `0` and `1` both mean sequential.
    pub workers: usize,
}

/// The two values handed to downstream tooling.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Canonical mappings sorted ascending by rank.
    pub canonical: Vec<CanonicalMapping>,
    pub report: ReconciliationReport,
}

/// Run the full pipeline over one store.
///
/// # Errors
/// Fails only when the root itself is unreadable. Per-file problems surface
/// inside the report, never here.
pub fn run_reconciliation(args: &ReconcileArgs) -> anyhow::Result<ReconcileOutcome> {
    let walker = SnapshotWalker::open(args.root.as_path(), args.prefix.as_str())?;
    let scan = scan_store(&walker, &args.institution, args.workers);

    info!(
        institution = %args.institution,
        files_scanned = scan.files_scanned,
        records = scan.records.len(),
        parse_failures = scan.parse_failures.len(),
        "store scan complete"
    );

    let stats = ScanStats {
        files_scanned: scan.files_scanned,
        records_normalized: scan.records.len(),
        parse_failures: scan.parse_failures,
    };
    let resolution = resolve(partition_records(scan.records, args.expected_count));
    let report = build_report(&args.institution, args.expected_count, &resolution, stats);
    let canonical: Vec<CanonicalMapping> = resolution.canonical.into_values().collect();

    info!(
        institution = %args.institution,
        canonical = canonical.len(),
        complete = report.complete,
        perfect = report.perfect,
        "reconciliation finished"
    );

    Ok(ReconcileOutcome { canonical, report })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
