use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use lmr_reconcile::{CanonicalMapping, ReconciliationReport};

pub struct WriteArtifactsArgs<'a> {
    /// Ordered canonical list, e.g. ../exports/seoul_a/canonical.json
    pub list_out: &'a Path,
    /// Diagnostics report, e.g. ../exports/seoul_a/report.json
    pub report_out: &'a Path,
    pub canonical: &'a [CanonicalMapping],
    pub report: &'a ReconciliationReport,
}

#[derive(Debug)]
pub struct WriteArtifactsResult {
    pub list_path: PathBuf,
    pub report_path: PathBuf,
}

/// Persist the two run deliverables.
///
/// Output is deterministic for a given run outcome: pretty-printed JSON with
/// a trailing newline and no clock or host data, so re-running over the same
/// store rewrites byte-identical files. Any write failure is fatal to the
/// run; there is no partial-success report.
pub fn write_reconciliation_artifacts(
    args: WriteArtifactsArgs<'_>,
) -> Result<WriteArtifactsResult> {
    write_json_artifact(args.list_out, &args.canonical, "canonical list")?;
    write_json_artifact(args.report_out, args.report, "diagnostics report")?;
    Ok(WriteArtifactsResult {
        list_path: args.list_out.to_path_buf(),
        report_path: args.report_out.to_path_buf(),
    })
}

fn write_json_artifact<T: Serialize>(path: &Path, value: &T, what: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create output dir failed: {}", parent.display()))?;
        }
    }
    let json =
        serde_json::to_string_pretty(value).with_context(|| format!("serialize {what} failed"))?;
    fs::write(path, format!("{json}\n"))
        .with_context(|| format!("write {what} failed: {}", path.display()))?;
    Ok(())
}
