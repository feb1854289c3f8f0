use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;

/// Infrastructure failures are the only non-zero exits: an unreadable root,
/// unusable arguments. Data-quality findings never fail the process.
#[test]
fn cli_fails_on_unreadable_root_and_bad_arguments() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let list_out = dir.path().join("canonical.json");
    let report_out = dir.path().join("report.json");

    // Nonexistent root is fatal.
    let mut cmd = assert_cmd::Command::cargo_bin("lmr-cli")?;
    cmd.arg("reconcile")
        .arg("--institution")
        .arg("SEOUL_A")
        .arg("--root")
        .arg(dir.path().join("absent"))
        .arg("--list-out")
        .arg(&list_out)
        .arg("--report-out")
        .arg(&report_out);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("snapshot root unreadable"));

    // Output targets must come from a flag or config; neither is present.
    let store = dir.path().join("store");
    fs::create_dir_all(&store)?;
    let mut cmd2 = assert_cmd::Command::cargo_bin("lmr-cli")?;
    cmd2.arg("reconcile")
        .arg("--institution")
        .arg("SEOUL_A")
        .arg("--root")
        .arg(&store)
        .arg("--report-out")
        .arg(&report_out);
    cmd2.assert()
        .failure()
        .stderr(predicate::str::contains("missing --list-out"));

    // The flag obeys the same ceiling bounds as the snapshot.expected_count
    // config key. Zero makes the range empty.
    let mut cmd3 = assert_cmd::Command::cargo_bin("lmr-cli")?;
    cmd3.arg("reconcile")
        .arg("--institution")
        .arg("SEOUL_A")
        .arg("--root")
        .arg(&store)
        .arg("--expected")
        .arg("0")
        .arg("--list-out")
        .arg(&list_out)
        .arg("--report-out")
        .arg(&report_out);
    cmd3.assert()
        .failure()
        .stderr(predicate::str::contains("expected_count out of bounds"));

    // An absurd ceiling is rejected up front, before the missing-rank scan
    // would size anything to it.
    let mut cmd4 = assert_cmd::Command::cargo_bin("lmr-cli")?;
    cmd4.arg("reconcile")
        .arg("--institution")
        .arg("SEOUL_A")
        .arg("--root")
        .arg(&store)
        .arg("--expected")
        .arg("4000000000")
        .arg("--list-out")
        .arg(&list_out)
        .arg("--report-out")
        .arg(&report_out);
    cmd4.assert()
        .failure()
        .stderr(predicate::str::contains("expected_count out of bounds"));

    Ok(())
}

/// An empty but readable store is a completed run: nothing found, everything
/// missing, exit 0.
#[test]
fn cli_empty_store_is_a_completed_run() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let store = dir.path().join("store");
    fs::create_dir_all(&store)?;
    let report_out = dir.path().join("report.json");

    let mut cmd = assert_cmd::Command::cargo_bin("lmr-cli")?;
    cmd.arg("reconcile")
        .arg("--institution")
        .arg("SEOUL_A")
        .arg("--root")
        .arg(&store)
        .arg("--expected")
        .arg("3")
        .arg("--list-out")
        .arg(dir.path().join("canonical.json"))
        .arg("--report-out")
        .arg(&report_out);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("files_scanned=0"))
        .stdout(predicate::str::contains("missing_ranges=1-3"));

    let report: serde_json::Value = serde_json::from_str(&fs::read_to_string(&report_out)?)?;
    assert_eq!(report["summary"]["missingCount"], 3);
    assert_eq!(report["complete"], false);

    Ok(())
}
