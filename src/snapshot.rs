//! Single-read snapshots of a source directory.
//!
//! A [`Snapshot`] is taken once per planning cycle and never refreshed while
//! that cycle runs. Entries keep directory-listing order.

use crate::config::SnapshotFilters;
use crate::error::{OrganizeError, OrganizeResult};
use crate::rule::{DIRECTORY_MARKER, PatternKind, Rule};
use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::path::{Path, PathBuf};

/// Whether an entry is a regular file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Directory,
}

/// One item found directly inside the source directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Name relative to the source directory, without separators. Names
    /// that are not valid UTF-8 are converted lossily; use it for matching
    /// and display only.
    pub name: String,
    pub kind: EntryKind,
    /// Size in bytes; always 0 for directories.
    pub size: u64,
    os_name: OsString,
}

impl DirectoryEntry {
    pub fn file(name: impl Into<String>, size: u64) -> Self {
        let name = name.into();
        Self {
            os_name: OsString::from(&name),
            name,
            kind: EntryKind::File,
            size,
        }
    }

    pub fn directory(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            os_name: OsString::from(&name),
            name,
            kind: EntryKind::Directory,
            size: 0,
        }
    }

    /// Keeps the name exactly as the filesystem reported it.
    pub fn with_os_name(mut self, os_name: OsString) -> Self {
        self.name = os_name.to_string_lossy().to_string();
        self.os_name = os_name;
        self
    }

    /// The name as it appears on disk.
    pub fn os_name(&self) -> &OsStr {
        &self.os_name
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }

    /// Lower-cased extension without the leading dot, if the entry is a file
    /// and has one.
    pub fn extension(&self) -> Option<String> {
        if self.is_dir() {
            return None;
        }
        Path::new(&self.name)
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .filter(|ext| !ext.is_empty())
    }
}

/// The entries of a source directory at one point in time.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub root: PathBuf,
    pub entries: Vec<DirectoryEntry>,
}

impl Snapshot {
    /// Builds a snapshot from already-known entries, without touching disk.
    pub fn from_entries(root: impl Into<PathBuf>, entries: Vec<DirectoryEntry>) -> Self {
        Self {
            root: root.into(),
            entries,
        }
    }

    /// Absolute path of an entry inside this snapshot.
    pub fn path_of(&self, entry: &DirectoryEntry) -> PathBuf {
        self.root.join(entry.os_name())
    }

    /// Reads `path` once and returns its direct children.
    ///
    /// Entries whose type cannot be determined (broken symlinks, races with
    /// other processes) are left out. Symlinks are followed for the
    /// file/directory decision.
    ///
    /// # Errors
    ///
    /// Returns [`OrganizeError::InvalidSourcePath`] if `path` is not a
    /// readable directory.
    pub fn take(path: &Path, filters: &SnapshotFilters) -> OrganizeResult<Self> {
        let invalid = |source: std::io::Error| OrganizeError::InvalidSourcePath {
            path: path.to_path_buf(),
            source,
        };

        let metadata = fs::metadata(path).map_err(invalid)?;
        if !metadata.is_dir() {
            return Err(invalid(std::io::Error::new(
                std::io::ErrorKind::NotADirectory,
                "not a directory",
            )));
        }

        let listing = fs::read_dir(path).map_err(invalid)?;
        let mut entries = Vec::new();
        for dir_entry in listing.flatten() {
            let os_name = dir_entry.file_name();
            let name = os_name.to_string_lossy().to_string();
            if !filters.should_include(&name) {
                tracing::debug!(name = %name, "excluded by snapshot filters");
                continue;
            }
            let Ok(meta) = fs::metadata(dir_entry.path()) else {
                continue;
            };
            let entry = if meta.is_dir() {
                DirectoryEntry::directory(name)
            } else {
                DirectoryEntry::file(name, meta.len())
            };
            entries.push(entry.with_os_name(os_name));
        }

        tracing::debug!(path = %path.display(), count = entries.len(), "snapshot taken");
        Ok(Self {
            root: path.to_path_buf(),
            entries,
        })
    }

    /// Tallies the snapshot by extension.
    pub fn survey(&self) -> Survey {
        let mut counts = BTreeMap::new();
        for entry in &self.entries {
            let key = if entry.is_dir() {
                DIRECTORY_MARKER.to_string()
            } else {
                match entry.extension() {
                    Some(ext) => format!(".{ext}"),
                    None => Survey::NO_EXTENSION.to_string(),
                }
            };
            *counts.entry(key).or_insert(0) += 1;
        }
        Survey {
            total: self.entries.len(),
            counts,
        }
    }
}

/// Entry counts grouped by extension, used to pre-fill a rule set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Survey {
    pub total: usize,
    /// Keys are `.ext`, [`DIRECTORY_MARKER`], or [`Survey::NO_EXTENSION`].
    pub counts: BTreeMap<String, usize>,
}

impl Survey {
    /// Bucket for files without an extension.
    pub const NO_EXTENSION: &'static str = "(none)";
    /// Upper bound on the number of suggested rules.
    pub const MAX_SUGGESTIONS: usize = 20;

    /// One rule per surveyed bucket (extensions and the directory marker,
    /// never the no-extension bucket), all pointing at `destination`.
    pub fn suggested_rules(&self, destination: &str, limit: usize) -> Vec<Rule> {
        self.counts
            .keys()
            .filter(|key| key.as_str() != Self::NO_EXTENSION)
            .take(limit.min(Self::MAX_SUGGESTIONS))
            .map(|key| {
                let kind = if key == DIRECTORY_MARKER {
                    PatternKind::DirectoryMarker
                } else {
                    PatternKind::Extension
                };
                Rule::new(key.clone(), kind, destination)
            })
            .collect()
    }
}
