//! Filesystem helpers that annotate failures with the path involved.

use std::path::Path;

use crate::error::{MirrorError, Result};

/// Write file atomically using temp file and rename.
///
/// The target is never observed half-written: either the new content is in
/// place, or the previous state remains.
pub fn write_file_atomic(path: &Path, content: &str) -> Result<()> {
    ensure_parent_dir(path)?;

    let temp_path = path.with_extension("tmp");

    std::fs::write(&temp_path, content).map_err(|e| MirrorError::Storage {
        operation: "write",
        item_type: "file",
        path: temp_path.clone(),
        source: e,
    })?;

    std::fs::rename(&temp_path, path).map_err(|e| MirrorError::Storage {
        operation: "rename",
        item_type: "file",
        path: path.to_path_buf(),
        source: e,
    })
}

/// Ensure parent directory exists
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        ensure_dir(parent)?;
    }
    Ok(())
}

/// Create a directory and all of its parents.
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|e| MirrorError::Storage {
        operation: "create",
        item_type: "directory",
        path: path.to_path_buf(),
        source: e,
    })
}

/// Delete a file or a symlink (the link itself, never its target).
pub fn delete_file(path: &Path) -> Result<()> {
    std::fs::remove_file(path).map_err(|e| MirrorError::Storage {
        operation: "delete",
        item_type: "file",
        path: path.to_path_buf(),
        source: e,
    })
}
