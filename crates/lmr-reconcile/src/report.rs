//! Report shapes: the diagnostics document handed to downstream tooling.
//!
//! Field names follow the exporter contract (camelCase). A report is built
//! once per run by the validator and never mutated afterwards.

use serde::Serialize;

use crate::{ParseFailure, SnapshotRecord};

/// Aggregate counts for one institution's reconciliation pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationSummary {
    pub institution: String,
    pub expected_count: u32,
    pub files_scanned: usize,
    pub records_normalized: usize,
    pub parse_failures: usize,
    /// Distinct in-range ranks that received at least one record.
    pub rank_groups: usize,
    pub duplicate_groups: usize,
    pub missing_count: usize,
    pub out_of_range_count: usize,
    pub no_rank_count: usize,
}

/// One contested rank: how many records claimed it and which one won.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateRankEntry {
    pub rank: u32,
    pub count: usize,
    pub winner_source_file: String,
    /// Full membership, winner first. Losing records are preserved so an
    /// operator can review what the resolution discarded.
    pub items: Vec<SnapshotRecord>,
}

/// Diagnostics for one institution's reconciliation run.
///
/// `complete` means every rank in `1..=expectedCount` is present exactly
/// once. `perfect` additionally requires that no rank was ever contested:
/// a resolved duplicate still discarded an edit somebody made.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationReport {
    pub summary: ReconciliationSummary,
    pub missing_ranks: Vec<u32>,
    /// Human-oriented rendering of `missing_ranks`, e.g. `"57-58, 102"`.
    pub missing_ranges: String,
    pub duplicate_ranks: Vec<DuplicateRankEntry>,
    pub out_of_range_ranks: Vec<SnapshotRecord>,
    pub no_rank_items: Vec<SnapshotRecord>,
    pub parse_failures: Vec<ParseFailure>,
    pub complete: bool,
    pub perfect: bool,
}
