use anyhow::{bail, Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::PathBuf;

/// Default snapshot filename prefix written by the capture tool.
pub const DEFAULT_SNAPSHOT_PREFIX: &str = "mapping_snapshot_";
/// Default rank ceiling N; canonical ranks are `1..=N`.
pub const DEFAULT_EXPECTED_COUNT: u32 = 200;
/// Default scan worker count (sequential).
pub const DEFAULT_WORKERS: usize = 1;

/// The effective config after layering, plus its identity hash.
///
/// The hash is taken over the canonical (sorted-key, compact) JSON rendering
/// of the merged document, so two operators running with equivalent config
/// layers can compare a single hex string.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

/// Load and merge YAML config layers from disk. Earlier paths are base,
/// later paths override.
pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let raw =
            fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}"))?;
        docs.push(raw);
    }

    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

/// Merge YAML documents in order: earlier docs are base, later docs override.
pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        // An empty layer (or one holding only comments) parses to null; it
        // must not clobber everything below it.
        if v_json.is_null() {
            continue;
        }
        merged = deep_merge(merged, v_json);
    }

    let canonical_json = canonicalize_json(&merged)?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}

fn canonicalize_json(v: &Value) -> Result<String> {
    // serde_json's Map keeps keys sorted, so a compact serialization of the
    // merged value is already canonical.
    let s = serde_json::to_string(v).context("canonical json serialize failed")?;
    Ok(s)
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let out = hasher.finalize();
    hex::encode(out)
}

// ---------------------------------------------------------------------------
// Typed reads
// ---------------------------------------------------------------------------

/// Engine settings read from the effective config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileSettings {
    pub prefix: String,
    pub expected_count: u32,
    pub workers: usize,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_SNAPSHOT_PREFIX.to_string(),
            expected_count: DEFAULT_EXPECTED_COUNT,
            workers: DEFAULT_WORKERS,
        }
    }
}

impl ReconcileSettings {
    /// Read engine settings from the effective config.
    ///
    /// All keys are optional:
    /// - snapshot.prefix (string; default "mapping_snapshot_")
    /// - snapshot.expected_count (integer or string; default 200)
    /// - scan.workers (integer or string; default 1)
    pub fn from_config_json(cfg: &Value) -> Result<Self> {
        let prefix = cfg
            .pointer("/snapshot/prefix")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_SNAPSHOT_PREFIX)
            .to_string();

        let expected_count =
            read_count(cfg, "/snapshot/expected_count", u64::from(DEFAULT_EXPECTED_COUNT))?;
        if !(1..=100_000).contains(&expected_count) {
            bail!("snapshot.expected_count out of bounds (1..=100000): {expected_count}");
        }

        let workers = read_count(cfg, "/scan/workers", DEFAULT_WORKERS as u64)?;
        if workers > 128 {
            bail!("scan.workers out of bounds (0..=128): {workers}");
        }

        Ok(Self {
            prefix,
            expected_count: expected_count as u32,
            workers: workers as usize,
        })
    }
}

/// One institution's storage root and output targets, as configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstitutionEntry {
    pub root: PathBuf,
    pub list_out: PathBuf,
    pub report_out: PathBuf,
}

/// Look up an institution's entry under `institutions.<label>`.
///
/// Returns `Ok(None)` when the label is not configured at all; an entry that
/// exists but lacks a required key is an error.
pub fn institution_entry(cfg: &Value, label: &str) -> Result<Option<InstitutionEntry>> {
    let pointer = format!("/institutions/{}", escape_pointer_token(label));
    let Some(entry) = cfg.pointer(&pointer) else {
        return Ok(None);
    };

    let path_of = |key: &str| -> Result<PathBuf> {
        entry
            .get(key)
            .and_then(Value::as_str)
            .map(PathBuf::from)
            .with_context(|| format!("config missing institutions.{label}.{key}"))
    };

    Ok(Some(InstitutionEntry {
        root: path_of("root")?,
        list_out: path_of("list_out")?,
        report_out: path_of("report_out")?,
    }))
}

/// Accept an integer or a numeric string at `pointer`, else the default.
fn read_count(cfg: &Value, pointer: &str, default: u64) -> Result<u64> {
    match cfg.pointer(pointer) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Number(n)) => n
            .as_u64()
            .with_context(|| format!("{pointer} must be a non-negative integer")),
        Some(Value::String(s)) => s
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{pointer} must be a non-negative integer")),
        Some(_) => bail!("{pointer} must be a non-negative integer"),
    }
}

fn escape_pointer_token(s: &str) -> String {
    s.replace('~', "~0").replace('/', "~1")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = r#"
snapshot:
  prefix: mapping_snapshot_
  expected_count: 200
scan:
  workers: 1
institutions:
  SEOUL_A:
    root: /data/seoul_a/snapshots
    list_out: /data/seoul_a/out/canonical.json
    report_out: /data/seoul_a/out/report.json
"#;

    const OVERRIDE: &str = r#"
snapshot:
  expected_count: 50
"#;

    // --- Layering and hashing ---

    #[test]
    fn later_layer_overrides_scalar_keeps_rest() {
        let cfg = load_layered_yaml_from_strings(&[BASE, OVERRIDE]).unwrap();
        let settings = ReconcileSettings::from_config_json(&cfg.config_json).unwrap();
        assert_eq!(settings.expected_count, 50);
        assert_eq!(settings.prefix, "mapping_snapshot_");
        assert_eq!(settings.workers, 1);
    }

    #[test]
    fn hash_is_stable_for_equivalent_layers() {
        let a = load_layered_yaml_from_strings(&[BASE]).unwrap();
        let b = load_layered_yaml_from_strings(&[BASE]).unwrap();
        assert_eq!(a.config_hash, b.config_hash);
        assert_eq!(a.config_hash.len(), 64);
    }

    #[test]
    fn hash_changes_when_a_value_changes() {
        let a = load_layered_yaml_from_strings(&[BASE]).unwrap();
        let b = load_layered_yaml_from_strings(&[BASE, OVERRIDE]).unwrap();
        assert_ne!(a.config_hash, b.config_hash);
    }

    #[test]
    fn key_order_does_not_affect_hash() {
        let reordered = r#"
scan:
  workers: 1
snapshot:
  expected_count: 200
  prefix: mapping_snapshot_
institutions:
  SEOUL_A:
    report_out: /data/seoul_a/out/report.json
    root: /data/seoul_a/snapshots
    list_out: /data/seoul_a/out/canonical.json
"#;
        let a = load_layered_yaml_from_strings(&[BASE]).unwrap();
        let b = load_layered_yaml_from_strings(&[reordered]).unwrap();
        assert_eq!(a.config_hash, b.config_hash);
    }

    #[test]
    fn empty_layer_is_a_no_op() {
        let a = load_layered_yaml_from_strings(&[BASE]).unwrap();
        let b = load_layered_yaml_from_strings(&[BASE, "", "# only a comment\n"]).unwrap();
        assert_eq!(a.config_hash, b.config_hash);
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        let err = load_layered_yaml_from_strings(&["snapshot: [unclosed"]).unwrap_err();
        assert!(err.to_string().contains("invalid yaml"));
    }

    #[test]
    fn file_layers_load_in_order() {
        let dir = tempfile::TempDir::new().unwrap();
        let base = dir.path().join("base.yaml");
        let local = dir.path().join("local.yaml");
        fs::write(&base, BASE).unwrap();
        fs::write(&local, OVERRIDE).unwrap();

        let cfg = load_layered_yaml(&[
            base.to_str().unwrap(),
            local.to_str().unwrap(),
        ])
        .unwrap();
        let settings = ReconcileSettings::from_config_json(&cfg.config_json).unwrap();
        assert_eq!(settings.expected_count, 50);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_layered_yaml(&["/nonexistent/config.yaml"]).unwrap_err();
        assert!(err.to_string().contains("failed to read yaml path"));
    }

    // --- Typed reads ---

    #[test]
    fn absent_sections_fall_back_to_defaults() {
        let cfg = load_layered_yaml_from_strings(&["other: 1"]).unwrap();
        let settings = ReconcileSettings::from_config_json(&cfg.config_json).unwrap();
        assert_eq!(settings, ReconcileSettings::default());
    }

    #[test]
    fn counts_accept_numeric_strings() {
        let cfg = load_layered_yaml_from_strings(&[
            "snapshot:\n  expected_count: \"120\"\nscan:\n  workers: \"4\"\n",
        ])
        .unwrap();
        let settings = ReconcileSettings::from_config_json(&cfg.config_json).unwrap();
        assert_eq!(settings.expected_count, 120);
        assert_eq!(settings.workers, 4);
    }

    #[test]
    fn zero_expected_count_is_rejected() {
        let cfg = load_layered_yaml_from_strings(&["snapshot:\n  expected_count: 0\n"]).unwrap();
        let err = ReconcileSettings::from_config_json(&cfg.config_json).unwrap_err();
        assert!(err.to_string().contains("expected_count out of bounds"));
    }

    #[test]
    fn negative_count_is_rejected() {
        let cfg = load_layered_yaml_from_strings(&["scan:\n  workers: -2\n"]).unwrap();
        let err = ReconcileSettings::from_config_json(&cfg.config_json).unwrap_err();
        assert!(err.to_string().contains("non-negative integer"));
    }

    // --- Institution lookup ---

    #[test]
    fn configured_institution_resolves() {
        let cfg = load_layered_yaml_from_strings(&[BASE]).unwrap();
        let entry = institution_entry(&cfg.config_json, "SEOUL_A")
            .unwrap()
            .unwrap();
        assert_eq!(entry.root, PathBuf::from("/data/seoul_a/snapshots"));
        assert_eq!(
            entry.report_out,
            PathBuf::from("/data/seoul_a/out/report.json")
        );
    }

    #[test]
    fn unconfigured_institution_is_none() {
        let cfg = load_layered_yaml_from_strings(&[BASE]).unwrap();
        assert!(institution_entry(&cfg.config_json, "BUSAN_B")
            .unwrap()
            .is_none());
    }

    #[test]
    fn half_configured_institution_is_an_error() {
        let cfg = load_layered_yaml_from_strings(&[
            "institutions:\n  BUSAN_B:\n    root: /data/busan_b\n",
        ])
        .unwrap();
        let err = institution_entry(&cfg.config_json, "BUSAN_B").unwrap_err();
        assert!(err
            .to_string()
            .contains("config missing institutions.BUSAN_B.list_out"));
    }
}
