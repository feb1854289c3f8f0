//! Snapshot Store Walker: file discovery under an institution's root.
//!
//! # Purpose
//! Enumerates snapshot files beneath a storage root, however deeply the
//! capture tool nested them. Discovery only: the walker never reads file
//! contents and never holds parsed data.
//!
//! # Invariants
//! - A file is a snapshot iff its name starts with the configured prefix and
//!   ends with `.json`. Nothing is inferred from the rest of the name.
//! - Yield order is deterministic for a fixed tree (sorted per directory).
//! - An unreadable root is fatal at `open`. An unreadable subdirectory
//!   mid-walk is logged and skipped; the run continues.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::warn;
use walkdir::WalkDir;

/// One discovered snapshot file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotFile {
    /// Path on disk, as opened.
    pub path: PathBuf,
    /// Store-relative path with forward slashes. This is the record identity
    /// used in reports and tie-breaking, so it must not vary by platform.
    pub source_file: String,
}

/// Discovers snapshot files under one institution's storage root.
#[derive(Debug)]
pub struct SnapshotWalker {
    root: PathBuf,
    prefix: String,
}

impl SnapshotWalker {
    /// Open a store root, verifying up front that it is a readable directory.
    ///
    /// # Errors
    /// Fails when the root does not exist, is not a directory, or cannot be
    /// listed. This is the one unrecoverable discovery failure.
    pub fn open(root: impl Into<PathBuf>, prefix: impl Into<String>) -> anyhow::Result<Self> {
        let root = root.into();
        let meta = fs::metadata(&root)
            .with_context(|| format!("snapshot root unreadable: {}", root.display()))?;
        anyhow::ensure!(
            meta.is_dir(),
            "snapshot root is not a directory: {}",
            root.display()
        );
        fs::read_dir(&root)
            .with_context(|| format!("snapshot root unreadable: {}", root.display()))?;
        Ok(Self {
            root,
            prefix: prefix.into(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lazily yield matching snapshot files in deterministic order.
    pub fn files(&self) -> impl Iterator<Item = SnapshotFile> + '_ {
        WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    warn!(error = %err, "skipping unreadable store entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter_map(move |entry| {
                let name = entry.file_name().to_str()?;
                if !name.starts_with(&self.prefix) || !name.ends_with(".json") {
                    return None;
                }
                Some(SnapshotFile {
                    source_file: relative_source(&self.root, entry.path()),
                    path: entry.into_path(),
                })
            })
    }
}

/// Root-relative path with `/` separators regardless of platform.
fn relative_source(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    parts.join("/")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
