//! Rank Resolver: partition normalized records and elect one winner per rank.
//!
//! # Purpose
//! Classifies every [`SnapshotRecord`] against the run's expected rank range
//! and collapses each contested rank to a single [`CanonicalMapping`].
//!
//! # Invariants
//! - Canonical ranks are unique: at most one mapping per rank.
//! - Every canonical rank lies in `1..=expected_count`.
//! - Winner election is a pure total order: latest capture time wins, an
//!   unknown capture time loses to any known one, and remaining ties go to
//!   the lexicographically larger source path. Source paths are unique per
//!   run (one record per file), so no tie survives.
//! - Losing records are never discarded; they stay in their duplicate group
//!   for the report.

use std::collections::BTreeMap;

use crate::{CanonicalMapping, CaptureTime, DeclaredRank, SnapshotRecord};

// ---------------------------------------------------------------------------
// Partition
// ---------------------------------------------------------------------------

/// Records bucketed by rank class, ready for winner election.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RankBuckets {
    /// Records whose declared rank lies in `1..=expected_count`, keyed by rank.
    pub in_range: BTreeMap<u32, Vec<SnapshotRecord>>,
    /// Records with a numeric rank outside the expected range.
    pub out_of_range: Vec<SnapshotRecord>,
    /// Records with no usable rank (absent, non-numeric, or zero).
    pub no_rank: Vec<SnapshotRecord>,
}

/// Partition records into rank buckets.
///
/// Rank zero is treated as "no rank declared" rather than out-of-range: the
/// capture tool writes `0` when the operator never assigned a position.
/// Negative ranks are genuinely out of range.
pub fn partition_records(records: Vec<SnapshotRecord>, expected_count: u32) -> RankBuckets {
    let mut buckets = RankBuckets::default();
    for rec in records {
        match rec.item_rank {
            DeclaredRank::Value(r) if r >= 1 && r <= i64::from(expected_count) => {
                buckets.in_range.entry(r as u32).or_default().push(rec);
            }
            DeclaredRank::Value(0) | DeclaredRank::Missing => buckets.no_rank.push(rec),
            DeclaredRank::Value(_) => buckets.out_of_range.push(rec),
        }
    }
    // Pass-through buckets are report content; order them here so downstream
    // output never depends on arrival order.
    buckets
        .out_of_range
        .sort_by(|a, b| (a.item_rank, &a.source_file).cmp(&(b.item_rank, &b.source_file)));
    buckets.no_rank.sort_by(|a, b| a.source_file.cmp(&b.source_file));
    buckets
}

// ---------------------------------------------------------------------------
// Winner election
// ---------------------------------------------------------------------------

/// All records that declared the same in-range rank, highest priority first.
///
/// Only built for contested ranks, so `members` always holds at least two
/// records; `members[0]` is the one that reached the canonical dataset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub rank: u32,
    pub members: Vec<SnapshotRecord>,
}

impl DuplicateGroup {
    /// The record elected for this rank.
    pub fn winner(&self) -> Option<&SnapshotRecord> {
        self.members.first()
    }
}

/// Outcome of winner election over one partition.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Resolution {
    /// One elected mapping per contested-or-not in-range rank, keyed by rank.
    pub canonical: BTreeMap<u32, CanonicalMapping>,
    /// Full membership of every rank that was declared more than once.
    pub duplicate_groups: Vec<DuplicateGroup>,
    /// Carried through from [`RankBuckets`], already sorted.
    pub out_of_range: Vec<SnapshotRecord>,
    pub no_rank: Vec<SnapshotRecord>,
}

/// Election priority. Compared as a tuple, so capture time dominates and the
/// source path only breaks exact-time (or both-unknown) ties.
fn priority(rec: &SnapshotRecord) -> (CaptureTime, &str) {
    (rec.captured_at, rec.source_file.as_str())
}

/// Elect one winner per in-range rank.
pub fn resolve(buckets: RankBuckets) -> Resolution {
    let mut canonical = BTreeMap::new();
    let mut duplicate_groups = Vec::new();

    for (rank, mut members) in buckets.in_range {
        members.sort_by(|a, b| priority(b).cmp(&priority(a)));
        let Some(winner) = members.first() else {
            continue;
        };
        canonical.insert(rank, CanonicalMapping::from_record(rank, winner.clone()));
        if members.len() > 1 {
            duplicate_groups.push(DuplicateGroup { rank, members });
        }
    }

    // BTreeMap iteration already yields ranks ascending, so the groups are in
    // rank order without a further sort.
    Resolution {
        canonical,
        duplicate_groups,
        out_of_range: buckets.out_of_range,
        no_rank: buckets.no_rank,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
