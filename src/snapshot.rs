//! Local snapshot of the output tree.
//!
//! The index is built once per run by walking the whole output root and
//! mapping every base file name to the paths carrying it. A record's
//! canonical copy and its milestone links share one file name, so each entry
//! is a set of paths.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{MirrorError, Result};
use crate::types::record_filename;

#[derive(Debug, Default)]
pub struct SnapshotIndex {
    entries: HashMap<String, BTreeSet<PathBuf>>,
}

impl SnapshotIndex {
    /// Scan `root` recursively.
    ///
    /// A missing root is a cold start and yields an empty index. Symlinks are
    /// indexed as entries of their own and never followed.
    pub fn build(root: &Path) -> Result<Self> {
        let mut index = SnapshotIndex::default();

        if !root.exists() {
            tracing::debug!("Output root {} does not exist yet", root.display());
            return Ok(index);
        }
        if !root.is_dir() {
            return Err(MirrorError::Config(format!(
                "output root {} is not a directory",
                root.display()
            )));
        }

        let root = std::path::absolute(root).map_err(|e| MirrorError::Storage {
            operation: "resolve",
            item_type: "directory",
            path: root.to_path_buf(),
            source: e,
        })?;

        for entry in WalkDir::new(&root).follow_links(false) {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone());
                MirrorError::Storage {
                    operation: "scan",
                    item_type: "directory",
                    path,
                    source: e.into(),
                }
            })?;

            if entry.file_type().is_dir() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            index.insert(name, entry.into_path());
        }

        tracing::debug!(
            "Indexed {} file name(s) under {}",
            index.entries.len(),
            root.display()
        );
        Ok(index)
    }

    /// Record `path` under `filename`.
    pub fn insert(&mut self, filename: String, path: PathBuf) {
        self.entries.entry(filename).or_default().insert(path);
    }

    /// Paths currently holding the record `number`.
    pub fn lookup(&self, number: u64, extension: &str) -> Option<&BTreeSet<PathBuf>> {
        self.entries.get(&record_filename(number, extension))
    }

    /// Remove and return every path indexed for the record `number`.
    pub fn take(&mut self, number: u64, extension: &str) -> BTreeSet<PathBuf> {
        self.entries
            .remove(&record_filename(number, extension))
            .unwrap_or_default()
    }

    /// Number of distinct file names in the index.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
