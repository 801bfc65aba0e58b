//! Filesystem helpers for stage inputs and outputs.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::MediaResult;

/// Resolve a path to absolute form without touching the filesystem.
///
/// Child processes may run with a different working directory, so every path
/// handed to one goes through here first.
pub fn absolutize(path: impl AsRef<Path>) -> MediaResult<PathBuf> {
    Ok(std::path::absolute(path.as_ref())?)
}

/// Size of the file at `path`, or `None` if it does not exist.
pub async fn file_size(path: impl AsRef<Path>) -> MediaResult<Option<u64>> {
    match fs::metadata(path.as_ref()).await {
        Ok(meta) => Ok(Some(meta.len())),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Why a produced file cannot be used, or `None` if it exists and is non-empty.
pub async fn unusable_output_reason(path: impl AsRef<Path>) -> MediaResult<Option<String>> {
    let reason = match file_size(path).await? {
        None => Some("output file missing".to_string()),
        Some(0) => Some("output file is empty".to_string()),
        Some(_) => None,
    };
    Ok(reason)
}

/// Keep only a safe file name component from an untrusted upload name.
///
/// Directory components are dropped and anything outside `[A-Za-z0-9._-]`
/// becomes `_`. Returns `None` when nothing usable remains.
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
