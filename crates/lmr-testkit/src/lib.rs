use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// One snapshot file's content, with every field overridable so tests can
/// express junk input as easily as clean input.
#[derive(Clone, Debug)]
pub struct FixtureSnapshot {
    pub institution: String,
    pub lab_item_id: String,
    pub lab_item_name: String,
    pub lab_unit: String,
    pub lab_sample_type: String,
    pub item_rank: Value,
    pub code: String,
    pub code_name: String,
    pub captured_at: Value,
}

impl FixtureSnapshot {
    /// A clean snapshot declaring `rank`, with derived lab-item identity and
    /// no capture timestamp.
    pub fn ranked(rank: i64) -> Self {
        Self {
            institution: "SEOUL_A".to_string(),
            lab_item_id: format!("L{rank:04}"),
            lab_item_name: format!("Lab item {rank}"),
            lab_unit: "mg/dL".to_string(),
            lab_sample_type: "Serum".to_string(),
            item_rank: json!(rank),
            code: format!("{rank}-0"),
            code_name: format!("Standard code for item {rank}"),
            captured_at: Value::Null,
        }
    }

    pub fn with_captured_at(mut self, raw: &str) -> Self {
        self.captured_at = json!(raw);
        self
    }

    /// Replace the declared rank with an arbitrary JSON value.
    pub fn with_raw_rank(mut self, rank: Value) -> Self {
        self.item_rank = rank;
        self
    }

    pub fn with_institution(mut self, label: impl Into<String>) -> Self {
        self.institution = label.into();
        self
    }

    pub fn with_code(mut self, code: impl Into<String>, name: impl Into<String>) -> Self {
        self.code = code.into();
        self.code_name = name.into();
        self
    }

    /// The JSON body as the capture tool would have written it.
    pub fn body(&self) -> Value {
        json!({
            "capturedAt": self.captured_at,
            "institutionContext": {
                "institution": self.institution,
                "labItemId": self.lab_item_id,
                "labItemName": self.lab_item_name,
                "labUnit": self.lab_unit,
                "labSampleType": self.lab_sample_type,
                "itemRank": self.item_rank,
            },
            "selectedCodes": [{ "code": self.code, "name": self.code_name }]
        })
    }
}

/// Writes snapshot fixture files under a store root, handing back the
/// store-relative path of every file it creates.
pub struct SnapshotStoreBuilder {
    root: PathBuf,
    prefix: String,
    seq: u32,
}

impl SnapshotStoreBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            prefix: "mapping_snapshot_".to_string(),
            seq: 0,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `snap` at the store root under the next sequential name.
    pub fn add(&mut self, snap: &FixtureSnapshot) -> Result<String> {
        let name = self.next_name();
        self.add_named(&name, snap)
    }

    /// Write `snap` below `rel_dir` under the next sequential name.
    pub fn add_in(&mut self, rel_dir: &str, snap: &FixtureSnapshot) -> Result<String> {
        let name = format!("{rel_dir}/{}", self.next_name());
        self.add_named(&name, snap)
    }

    /// Write `snap` at an explicit store-relative path.
    pub fn add_named(&mut self, rel: &str, snap: &FixtureSnapshot) -> Result<String> {
        let bytes =
            serde_json::to_vec_pretty(&snap.body()).context("serialize fixture snapshot")?;
        self.write(rel, &bytes)
    }

    /// Write arbitrary bytes at a store-relative path, for malformed fixtures.
    pub fn add_raw(&mut self, rel: &str, bytes: &[u8]) -> Result<String> {
        self.write(rel, bytes)
    }

    fn next_name(&mut self) -> String {
        self.seq += 1;
        format!("{}2024_{:04}.json", self.prefix, self.seq)
    }

    fn write(&self, rel: &str, bytes: &[u8]) -> Result<String> {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create fixture dir: {}", parent.display()))?;
        }
        fs::write(&path, bytes).with_context(|| format!("write fixture: {}", path.display()))?;
        Ok(rel.to_string())
    }
}

/// RFC 3339 capture stamp on a fixed fixture day.
pub fn capture_stamp(day: u32, hour: u32) -> String {
    format!("2024-03-{day:02}T{hour:02}:00:00Z")
}
