//! lmr-store
//!
//! Snapshot store access for the reconciliation engine
//!
//! Architectural decisions:
//! - Discovery is name-based only (`<prefix>*.json`); contents stay unread
//! - Unreadable root fails the run; unreadable file becomes a parse failure
//! - Scan parallelism is an optional reader pool, invisible to callers
//! - All outputs are ordered by source path, never by scheduling
//!
//! This is the only crate that touches the store filesystem. Resolution and
//! validation stay in `lmr-reconcile`; artifact writes in `lmr-artifacts`.

mod run;
mod scan;
mod walker;

pub use run::{run_reconciliation, ReconcileArgs, ReconcileOutcome};
pub use scan::{scan_store, ScanOutcome};
pub use walker::{SnapshotFile, SnapshotWalker};
