//! Store scan: read every discovered snapshot and normalize it.
//!
//! # Purpose
//! Bridges the walker (paths) and the pure engine (records): reads bytes,
//! normalizes them, and collects per-file failures without stopping.
//!
//! # Invariants
//! - A file that cannot be read or parsed becomes a [`ParseFailure`]; the
//!   scan itself never fails.
//! - With `workers > 1` files are read on a scoped worker pool and fanned in
//!   over a channel. Arrival order is scheduling-dependent, so the outcome is
//!   re-sorted by source path before return; parallel and sequential scans of
//!   the same store are indistinguishable to callers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

use tracing::debug;

use lmr_reconcile::{normalize_snapshot, ParseFailure, SnapshotRecord};

use crate::walker::{SnapshotFile, SnapshotWalker};

/// Everything one scan learned about the store, before resolution.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Successfully normalized records, sorted by source path.
    pub records: Vec<SnapshotRecord>,
    /// Snapshot files the walker yielded, readable or not.
    pub files_scanned: usize,
    /// Per-file read and parse failures, sorted by source path.
    pub parse_failures: Vec<ParseFailure>,
}

enum Scanned {
    Record(SnapshotRecord),
    Failed(ParseFailure),
}

fn read_and_normalize(file: &SnapshotFile, institution: &str) -> Scanned {
    match std::fs::read(&file.path) {
        Ok(bytes) => match normalize_snapshot(&bytes, &file.source_file, institution) {
            Ok(rec) => Scanned::Record(rec),
            Err(fail) => Scanned::Failed(fail),
        },
        Err(err) => Scanned::Failed(ParseFailure::new(
            &file.source_file,
            format!("unreadable: {err}"),
        )),
    }
}

/// Scan one institution's store.
///
/// `workers` is the number of reader threads; `0` and `1` both mean
/// sequential. Parallelism only spreads file IO and JSON parsing; all
/// resolution stays single-threaded downstream.
pub fn scan_store(walker: &SnapshotWalker, institution: &str, workers: usize) -> ScanOutcome {
    let files: Vec<SnapshotFile> = walker.files().collect();
    let files_scanned = files.len();

    let mut records = Vec::with_capacity(files.len());
    let mut parse_failures = Vec::new();

    if workers <= 1 || files.len() < 2 {
        for file in &files {
            match read_and_normalize(file, institution) {
                Scanned::Record(rec) => records.push(rec),
                Scanned::Failed(fail) => parse_failures.push(fail),
            }
        }
    } else {
        let next = AtomicUsize::new(0);
        let (tx, rx) = mpsc::channel();
        thread::scope(|scope| {
            for _ in 0..workers.min(files.len()) {
                let tx = tx.clone();
                let next = &next;
                let files = &files;
                scope.spawn(move || loop {
                    let idx = next.fetch_add(1, Ordering::Relaxed);
                    let Some(file) = files.get(idx) else { break };
                    if tx.send(read_and_normalize(file, institution)).is_err() {
                        break;
                    }
                });
            }
            // All senders are clones; dropping the original lets the receive
            // loop end when the last worker finishes.
            drop(tx);
            for scanned in rx {
                match scanned {
                    Scanned::Record(rec) => records.push(rec),
                    Scanned::Failed(fail) => parse_failures.push(fail),
                }
            }
        });
    }

    // Identity order is the source path, not walk or arrival order.
    records.sort_by(|a, b| a.source_file.cmp(&b.source_file));
    parse_failures.sort_by(|a, b| a.source_file.cmp(&b.source_file));

    debug!(
        files_scanned,
        records = records.len(),
        failures = parse_failures.len(),
        "store scan finished"
    );

    ScanOutcome {
        records,
        files_scanned,
        parse_failures,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
