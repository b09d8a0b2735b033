//! File helpers shared by the mapping store, the output collection and event
//! artifacts.
//!
//! Writes go to a `.tmp` sibling first and are renamed into place, so a crash
//! mid-write leaves the previous file intact.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::errors::{OntomapError, Result, UnreadableReason};

/// Read a file as text, classifying why it cannot be used.
pub fn read_text(path: &Path) -> std::result::Result<String, UnreadableReason> {
    match std::fs::read_to_string(path) {
        Ok(contents) if contents.trim().is_empty() => Err(UnreadableReason::Empty),
        Ok(contents) => Ok(contents),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(UnreadableReason::Missing),
        Err(e) => Err(UnreadableReason::Io(e.to_string())),
    }
}

/// Atomically replace `path` with `data`, creating parent directories.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| {
            OntomapError::persist_with_source(
                format!("failed to create directory {}", parent.display()),
                e,
            )
        })?;
    }

    let tmp = tmp_sibling(path);
    std::fs::write(&tmp, data).map_err(|e| {
        OntomapError::persist_with_source(format!("failed to write {}", tmp.display()), e)
    })?;
    std::fs::rename(&tmp, path).map_err(|e| {
        OntomapError::persist_with_source(
            format!("failed to move {} into place", path.display()),
            e,
        )
    })?;
    Ok(())
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("ontomap"));
    name.push(".tmp");
    path.with_file_name(name)
}
