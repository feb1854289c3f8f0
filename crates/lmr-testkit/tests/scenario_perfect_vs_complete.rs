//! The complete/perfect distinction.
//!
//! Contract under test:
//!   - a full, never-contested range is complete AND perfect
//!   - a resolved duplicate keeps the set complete but not perfect: the
//!     resolution discarded an edit somebody made
//!   - the run label scopes the report even when files carry their own
//!     institution strings

use anyhow::Result;
use lmr_store::{run_reconciliation, ReconcileArgs, ReconcileOutcome};
use lmr_testkit::{capture_stamp, FixtureSnapshot, SnapshotStoreBuilder};
use std::path::Path;
use tempfile::TempDir;

fn reconcile(root: &Path, expected: u32) -> Result<ReconcileOutcome> {
    run_reconciliation(&ReconcileArgs {
        root: root.to_path_buf(),
        institution: "SEOUL_A".to_string(),
        prefix: "mapping_snapshot_".to_string(),
        expected_count: expected,
        workers: 1,
    })
}

#[test]
fn uncontested_full_range_is_perfect() -> Result<()> {
    let dir = TempDir::new()?;
    let mut store = SnapshotStoreBuilder::new(dir.path());
    for rank in 1..=5 {
        store.add(&FixtureSnapshot::ranked(rank).with_captured_at(&capture_stamp(1, 6)))?;
    }

    let outcome = reconcile(dir.path(), 5)?;
    assert!(outcome.report.complete);
    assert!(outcome.report.perfect);
    assert_eq!(outcome.report.summary.duplicate_groups, 0);

    Ok(())
}

#[test]
fn resolved_duplicate_downgrades_perfect_only() -> Result<()> {
    let dir = TempDir::new()?;
    let mut store = SnapshotStoreBuilder::new(dir.path());
    for rank in 1..=5 {
        store.add(&FixtureSnapshot::ranked(rank).with_captured_at(&capture_stamp(1, 6)))?;
    }
    store.add_named(
        "redo/mapping_snapshot_3.json",
        &FixtureSnapshot::ranked(3).with_captured_at(&capture_stamp(8, 17)),
    )?;

    let outcome = reconcile(dir.path(), 5)?;
    assert!(outcome.report.complete);
    assert!(!outcome.report.perfect);
    assert_eq!(outcome.report.summary.duplicate_groups, 1);
    assert_eq!(outcome.canonical.len(), 5);

    Ok(())
}

#[test]
fn run_label_scopes_the_report_not_the_files() -> Result<()> {
    let dir = TempDir::new()?;
    let mut store = SnapshotStoreBuilder::new(dir.path());
    // A record declaring a foreign label and one declaring none at all.
    store.add(
        &FixtureSnapshot::ranked(1)
            .with_institution("BUSAN_B")
            .with_captured_at(&capture_stamp(1, 6)),
    )?;
    store.add(
        &FixtureSnapshot::ranked(2)
            .with_institution("")
            .with_captured_at(&capture_stamp(1, 6)),
    )?;

    let outcome = reconcile(dir.path(), 2)?;
    assert_eq!(outcome.report.summary.institution, "SEOUL_A");
    assert!(outcome.report.complete);
    // Declared labels are audit data and survive; absent ones inherit scope.
    assert_eq!(outcome.canonical[0].institution, "BUSAN_B");
    assert_eq!(outcome.canonical[1].institution, "SEOUL_A");

    Ok(())
}
