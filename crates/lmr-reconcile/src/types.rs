use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rank of a lab item as declared in a snapshot file.
///
/// The declared value is kept verbatim: validity (in range, out of range,
/// zero) is decided by the resolver, not here. A missing or non-numeric rank
/// field normalizes to [`DeclaredRank::Missing`], never to zero, so an
/// explicit `"itemRank": 0` stays distinguishable from an absent field.
///
/// Serializes untagged: `Value(40)` → `40`, `Missing` → `null`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum DeclaredRank {
    /// Rank field was present and integral.
    Value(i64),
    /// Rank field absent or not an integer.
    Missing,
}

impl DeclaredRank {
    /// The declared integer, if one was present.
    pub fn value(&self) -> Option<i64> {
        match self {
            DeclaredRank::Value(v) => Some(*v),
            DeclaredRank::Missing => None,
        }
    }
}

/// Capture instant of a snapshot, normalized to UTC.
///
/// `Unknown` covers both an absent and an unparseable timestamp and sorts
/// below every known instant, so a record without a usable capture time is
/// always dominated in conflict resolution (variant order carries the
/// derived `Ord`).
///
/// Serializes untagged: `At(t)` → RFC 3339 string, `Unknown` → `null`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CaptureTime {
    /// No parseable capture timestamp. Lowest resolution priority.
    Unknown,
    /// Parsed capture instant.
    At(DateTime<Utc>),
}

impl CaptureTime {
    /// `true` when a real capture instant is known.
    pub fn is_known(&self) -> bool {
        matches!(self, CaptureTime::At(_))
    }
}

/// One snapshot file's decision data, immutable once normalized.
///
/// Produced by the normalizer, consumed by the resolver; only the winning
/// record per rank survives into [`CanonicalMapping`]. Losing and unrankable
/// records are retained verbatim for diagnostics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRecord {
    /// Owning scope for rank uniqueness. Defaulted to the run's institution
    /// label when the file omits it.
    pub institution: String,
    /// Source lab-item identity (display/audit only, not globally unique).
    pub lab_item_id: String,
    pub lab_item_name: String,
    /// Descriptive metadata, never validated.
    pub lab_unit: String,
    pub lab_sample_type: String,
    /// Declared rank within the institution's top-N list.
    pub item_rank: DeclaredRank,
    /// Chosen classification code; empty when no selection was made.
    pub assigned_code: String,
    pub assigned_code_name: String,
    /// Sole tie-break key for conflicting ranks.
    pub captured_at: CaptureTime,
    /// Relative path of the originating snapshot. Audit trail plus the
    /// deterministic last-resort tie-break; never compared as content.
    pub source_file: String,
}

/// Reconciled, authoritative record for one (institution, rank) pair.
///
/// `rank` lies in `[1, expected_count]` by construction: only in-range
/// bucket members are ever promoted, so an out-of-range record cannot enter
/// this type. At most one exists per (institution, rank) per run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalMapping {
    pub institution: String,
    pub rank: u32,
    pub lab_item_id: String,
    pub lab_item_name: String,
    pub lab_unit: String,
    pub lab_sample_type: String,
    pub assigned_code: String,
    pub assigned_code_name: String,
    pub captured_at: CaptureTime,
    pub source_file: String,
}

impl CanonicalMapping {
    /// Promote the winning record of a rank group.
    pub fn from_record(rank: u32, rec: SnapshotRecord) -> Self {
        debug_assert!(rank >= 1);
        Self {
            institution: rec.institution,
            rank,
            lab_item_id: rec.lab_item_id,
            lab_item_name: rec.lab_item_name,
            lab_unit: rec.lab_unit,
            lab_sample_type: rec.lab_sample_type,
            assigned_code: rec.assigned_code,
            assigned_code_name: rec.assigned_code_name,
            captured_at: rec.captured_at,
            source_file: rec.source_file,
        }
    }
}

/// A snapshot file that could not be read or parsed as a JSON object.
///
/// Recorded in the diagnostics report, never raised: one corrupt file must
/// not stop reconciliation of the rest of the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseFailure {
    pub source_file: String,
    pub reason: String,
}

impl ParseFailure {
    pub fn new(source_file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            reason: reason.into(),
        }
    }
}
