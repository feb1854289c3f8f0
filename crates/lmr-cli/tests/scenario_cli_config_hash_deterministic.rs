use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;

const BASE_YAML: &str = "snapshot:\n  prefix: mapping_snapshot_\n  expected_count: 200\n";
const LOCAL_YAML: &str = "snapshot:\n  expected_count: 50\n";

/// `config-hash` must print the same hash for the same layer stack, and a
/// different one as soon as an override layer changes the effective config.
#[test]
fn cli_config_hash_is_deterministic_and_layer_sensitive() -> anyhow::Result<()> {
    let dir = tempfile::TempDir::new()?;
    let base = dir.path().join("base.yaml");
    let local = dir.path().join("local.yaml");
    fs::write(&base, BASE_YAML)?;
    fs::write(&local, LOCAL_YAML)?;

    let run = |paths: &[&std::path::Path]| -> anyhow::Result<String> {
        let mut cmd = assert_cmd::Command::cargo_bin("lmr-cli")?;
        cmd.arg("config-hash");
        for p in paths {
            cmd.arg(p);
        }
        let out = cmd.assert().success().get_output().stdout.clone();
        Ok(String::from_utf8(out)?)
    };

    let first = run(&[&base])?;
    let second = run(&[&base])?;
    assert_eq!(first, second);
    assert!(first.starts_with("config_hash="), "{first}");

    let layered = run(&[&base, &local])?;
    assert_ne!(first, layered);
    assert!(layered.contains("\"expected_count\":50"), "{layered}");

    Ok(())
}

/// Unreadable layer paths are an error, not an empty config.
#[test]
fn cli_config_hash_fails_on_missing_layer() -> anyhow::Result<()> {
    let mut cmd = assert_cmd::Command::cargo_bin("lmr-cli")?;
    cmd.arg("config-hash").arg("/nonexistent/base.yaml");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("failed to read yaml path"));
    Ok(())
}
