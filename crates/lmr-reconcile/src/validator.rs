//! Integrity Validator: prove or disprove the completeness contract.
//!
//! # Purpose
//! Computes the [`ReconciliationReport`] for one run from the resolver's
//! [`Resolution`] plus the file-level scan statistics.
//!
//! # Invariants
//! - Every diagnostic category is computed independently; there is no early
//!   exit. A report is either whole or not produced.
//! - All collections in the report are sorted (ranks ascending, records and
//!   failures by source path), so two runs over the same inputs emit
//!   byte-identical reports.

use crate::resolver::Resolution;
use crate::{DuplicateRankEntry, ParseFailure, ReconciliationReport, ReconciliationSummary};

/// File-level counters gathered while walking and normalizing the store.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Snapshot files the walker yielded (readable or not).
    pub files_scanned: usize,
    /// Files that normalized into a record.
    pub records_normalized: usize,
    /// Files that could not be read or parsed.
    pub parse_failures: Vec<ParseFailure>,
}

/// Build the diagnostics report for one institution's pass.
pub fn build_report(
    institution: &str,
    expected_count: u32,
    resolution: &Resolution,
    stats: ScanStats,
) -> ReconciliationReport {
    let missing_ranks: Vec<u32> = (1..=expected_count)
        .filter(|r| !resolution.canonical.contains_key(r))
        .collect();

    let duplicate_ranks: Vec<DuplicateRankEntry> = resolution
        .duplicate_groups
        .iter()
        .map(|group| DuplicateRankEntry {
            rank: group.rank,
            count: group.members.len(),
            winner_source_file: group
                .winner()
                .map(|w| w.source_file.clone())
                .unwrap_or_default(),
            items: group.members.clone(),
        })
        .collect();

    let mut parse_failures = stats.parse_failures;
    parse_failures.sort_by(|a, b| a.source_file.cmp(&b.source_file));

    let complete =
        resolution.canonical.len() == expected_count as usize && missing_ranks.is_empty();
    let perfect = complete && duplicate_ranks.is_empty();

    ReconciliationReport {
        summary: ReconciliationSummary {
            institution: institution.to_string(),
            expected_count,
            files_scanned: stats.files_scanned,
            records_normalized: stats.records_normalized,
            parse_failures: parse_failures.len(),
            rank_groups: resolution.canonical.len(),
            duplicate_groups: duplicate_ranks.len(),
            missing_count: missing_ranks.len(),
            out_of_range_count: resolution.out_of_range.len(),
            no_rank_count: resolution.no_rank.len(),
        },
        missing_ranges: compress_ranges(&missing_ranks),
        missing_ranks,
        duplicate_ranks,
        out_of_range_ranks: resolution.out_of_range.clone(),
        no_rank_items: resolution.no_rank.clone(),
        parse_failures,
        complete,
        perfect,
    }
}

/// Render an ascending rank list as compressed contiguous ranges.
///
/// `[57, 58, 102]` becomes `"57-58, 102"`; an empty list becomes `""`.
pub fn compress_ranges(ranks: &[u32]) -> String {
    let mut iter = ranks.iter().copied();
    let Some(mut start) = iter.next() else {
        return String::new();
    };
    let mut end = start;
    let mut parts: Vec<String> = Vec::new();
    for rank in iter {
        if rank == end + 1 {
            end = rank;
            continue;
        }
        parts.push(render_run(start, end));
        start = rank;
        end = rank;
    }
    parts.push(render_run(start, end));
    parts.join(", ")
}

fn render_run(start: u32, end: u32) -> String {
    if start == end {
        start.to_string()
    } else {
        format!("{start}-{end}")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
