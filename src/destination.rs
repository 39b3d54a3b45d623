//! Destination template expansion and directory creation.
//!
//! Templates may contain `{year}`, `{month}`, `{day}` (zero-padded) and
//! `{ext}` (extension without the dot, `other` when there is none). Tokens
//! are only expanded when the dated-subfolder option is on. A dated template
//! without any token gets a `YYYY-MM-DD` subfolder appended.
//!
//! Relative templates are resolved against the source directory.

use crate::error::DestinationError;
use crate::snapshot::DirectoryEntry;
use chrono::{Datelike, NaiveDate};
use std::fs;
use std::path::{Path, PathBuf};

const TOKENS: [&str; 4] = ["{year}", "{month}", "{day}", "{ext}"];

/// Extension placeholder for entries without one.
pub const NO_EXTENSION_DIR: &str = "other";

/// Expands `template` for `entry` on day `today`. Does no I/O.
pub fn expand(
    template: &str,
    entry: &DirectoryEntry,
    today: NaiveDate,
    dated_subfolder: bool,
    source_root: &Path,
) -> PathBuf {
    let template = template.trim();
    let expanded = if !dated_subfolder {
        PathBuf::from(template)
    } else if TOKENS.iter().any(|token| template.contains(token)) {
        let ext = entry
            .extension()
            .unwrap_or_else(|| NO_EXTENSION_DIR.to_string());
        PathBuf::from(
            template
                .replace("{year}", &format!("{:04}", today.year()))
                .replace("{month}", &format!("{:02}", today.month()))
                .replace("{day}", &format!("{:02}", today.day()))
                .replace("{ext}", &ext),
        )
    } else {
        Path::new(template).join(today.format("%Y-%m-%d").to_string())
    };

    if expanded.is_absolute() {
        expanded
    } else {
        source_root.join(expanded)
    }
}

/// Creates `dir` and any missing parents. Idempotent.
///
/// # Errors
///
/// Returns [`DestinationError::Unreachable`] if the path, or one of its
/// parents, is an existing non-directory, or if creation fails.
pub fn ensure_destination(dir: &Path) -> Result<(), DestinationError> {
    if dir.is_dir() {
        return Ok(());
    }
    if dir.exists() {
        return Err(DestinationError::Unreachable {
            path: dir.to_path_buf(),
            reason: "path exists and is not a directory".to_string(),
        });
    }
    fs::create_dir_all(dir).map_err(|e| DestinationError::Unreachable {
        path: dir.to_path_buf(),
        reason: e.to_string(),
    })?;
    tracing::debug!(path = %dir.display(), "created destination directory");
    Ok(())
}

/// Expands `template` and makes sure the resulting directory exists.
pub fn resolve(
    template: &str,
    entry: &DirectoryEntry,
    today: NaiveDate,
    dated_subfolder: bool,
    source_root: &Path,
) -> Result<PathBuf, DestinationError> {
    let dir = expand(template, entry, today, dated_subfolder, source_root);
    ensure_destination(&dir)?;
    Ok(dir)
}
