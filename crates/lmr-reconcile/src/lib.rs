//! lmr-reconcile
//!
//! Snapshot Reconciliation and Rank-Integrity Engine
//!
//! Architectural decisions:
//! - Latest capture wins per rank
//! - Unknown capture time loses to any known time
//! - Remaining ties break to the lexicographically larger source path
//! - Canonical ranks are unique and lie in 1..=expected_count
//! - Non-canonical records are retained verbatim for the report
//! - One malformed file never stops a run
//!
//! Deterministic, pure logic. No IO, no wall-clock. The store layer feeds
//! bytes in; artifacts leave through the emitter.

mod normalizer;
mod report;
mod resolver;
mod types;
mod validator;

pub use normalizer::normalize_snapshot;
pub use report::*;
pub use resolver::{partition_records, resolve, DuplicateGroup, RankBuckets, Resolution};
pub use types::*;
pub use validator::{build_report, compress_ranges, ScanStats};
