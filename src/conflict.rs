//! Conflict policy for occupied destination paths.

use crate::error::ConflictError;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Upper bound on `_N` suffixes tried by [`ConflictPolicy::Rename`].
pub const MAX_RENAME_ATTEMPTS: u32 = 100_000;

/// What to do when the destination path already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// Leave the source untouched and count it as failed.
    #[default]
    Skip,
    /// Replace the existing destination.
    Overwrite,
    /// Move under the first free `name_N.ext`, N from 1.
    Rename,
}

impl std::fmt::Display for ConflictPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConflictPolicy::Skip => "skip",
            ConflictPolicy::Overwrite => "overwrite",
            ConflictPolicy::Rename => "rename",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "skip" => Ok(ConflictPolicy::Skip),
            "overwrite" => Ok(ConflictPolicy::Overwrite),
            "rename" => Ok(ConflictPolicy::Rename),
            other => Err(format!(
                "unknown conflict policy '{other}', expected skip, overwrite or rename"
            )),
        }
    }
}

/// Outcome of conflict resolution for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub path: PathBuf,
    pub proceed: bool,
}

/// Decides where `candidate` should actually go under `policy`.
///
/// Call exactly once per file per run.
///
/// # Errors
///
/// Returns [`ConflictError::RenameExhausted`] if every suffix up to
/// [`MAX_RENAME_ATTEMPTS`] is taken.
pub fn resolve(candidate: &Path, policy: ConflictPolicy) -> Result<Resolution, ConflictError> {
    if !occupied(candidate) {
        return Ok(Resolution {
            path: candidate.to_path_buf(),
            proceed: true,
        });
    }

    match policy {
        ConflictPolicy::Skip => Ok(Resolution {
            path: candidate.to_path_buf(),
            proceed: false,
        }),
        ConflictPolicy::Overwrite => Ok(Resolution {
            path: candidate.to_path_buf(),
            proceed: true,
        }),
        ConflictPolicy::Rename => {
            renamed(candidate, MAX_RENAME_ATTEMPTS).map(|path| Resolution {
                path,
                proceed: true,
            })
        }
    }
}

/// `exists()` follows symlinks; a dangling link still occupies the name.
fn occupied(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

fn renamed(candidate: &Path, max_attempts: u32) -> Result<PathBuf, ConflictError> {
    let stem = candidate.file_stem().unwrap_or_default();
    let ext = candidate.extension();

    for n in 1..=max_attempts {
        let mut name = OsString::from(stem);
        name.push(format!("_{n}"));
        if let Some(ext) = ext {
            name.push(".");
            name.push(ext);
        }
        let path = candidate.with_file_name(name);
        if !occupied(&path) {
            return Ok(path);
        }
    }

    Err(ConflictError::RenameExhausted {
        path: candidate.to_path_buf(),
        attempts: max_attempts,
    })
}
