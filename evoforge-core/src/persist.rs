//! JSON document persistence
//!
//! Session and pattern documents are single JSON files with one writer each.
//! Writes go to a sibling `.tmp` file first and are renamed into place.

use crate::error::{Error, Result};
use serde::Serialize;
use std::path::Path;

/// Serialize `value` as pretty JSON and atomically replace `path`.
///
/// IO failures are reported as [`Error::Persist`] carrying the target path.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    let persist_err = |source| Error::Persist {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(persist_err)?;
    }
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, json.as_bytes()).map_err(persist_err)?;
    std::fs::rename(&tmp_path, path).map_err(persist_err)?;
    Ok(())
}

/// Read a JSON document as an untyped value.
///
/// `Ok(None)` when the file does not exist.
pub fn read_json_value(path: &Path) -> Result<Option<serde_json::Value>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&content)?))
}
