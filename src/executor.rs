//! Carrying out a plan.
//!
//! Moves run one at a time in plan order. A failing entry is recorded and
//! the run goes on; only the stop flag ends a run early, and only between
//! entries. Successful moves are pushed onto the [`UndoJournal`] as one
//! batch.

use crate::conflict::{self, ConflictPolicy, MAX_RENAME_ATTEMPTS};
use crate::destination;
use crate::notifier::{EngineEvent, Notifier};
use crate::planner::Plan;
use crate::stop::StopHandle;
use crate::undo::{MoveRecord, UndoJournal};
use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Why a single entry could not be moved or restored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Destination occupied and the policy is skip.
    AlreadyExists,
    /// The destination directory could not be created or used.
    DestinationUnreachable,
    /// The target path is the entry itself or one of its parents.
    DestinationContainsSource,
    /// No free `_N` name was found.
    RenameExhausted,
    /// The move itself failed.
    MoveFailed,
    /// Moving back during undo failed.
    UndoFailed,
}

/// One itemized failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureEntry {
    pub name: String,
    pub path: PathBuf,
    pub kind: FailureKind,
    pub detail: String,
}

impl std::fmt::Display for FailureEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.detail)
    }
}

/// What one execution run did.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub moved: Vec<MoveRecord>,
    pub failed: Vec<FailureEntry>,
    /// The stop flag ended the run before every entry was attempted.
    pub cancelled: bool,
    /// Entries never attempted because of a stop.
    pub not_attempted: usize,
    /// Journal id of the batch, if anything moved.
    pub batch_id: Option<u64>,
}

impl BatchResult {
    pub fn moved_count(&self) -> usize {
        self.moved.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }
}

/// Runs `plan` under `policy`, recording successes in `journal`.
pub fn execute(
    plan: &Plan,
    policy: ConflictPolicy,
    journal: &mut UndoJournal,
    stop: &StopHandle,
    notifier: &mut dyn Notifier,
) -> BatchResult {
    let mut result = BatchResult::default();
    let mut destinations: HashMap<PathBuf, Result<(), String>> = HashMap::new();

    if plan.is_empty() {
        notifier.notify(&EngineEvent::NothingToMove);
        notifier.notify(&EngineEvent::RunFinished {
            moved: 0,
            failed: 0,
            cancelled: false,
        });
        return result;
    }

    notifier.notify(&EngineEvent::RunStarted {
        planned: plan.len(),
    });

    for (position, planned) in plan.moves.iter().enumerate() {
        if stop.is_requested() {
            result.cancelled = true;
            result.not_attempted = plan.len() - position;
            tracing::info!(remaining = result.not_attempted, "run stopped");
            break;
        }

        let name = planned.entry.name.clone();
        let fail = |kind: FailureKind, detail: String| FailureEntry {
            name: name.clone(),
            path: planned.source.clone(),
            kind,
            detail,
        };

        let candidate = planned.candidate();
        if planned.source.starts_with(&candidate) {
            let failure = fail(
                FailureKind::DestinationContainsSource,
                format!("{} contains the entry", candidate.display()),
            );
            notifier.notify(&EngineEvent::Failed(failure.clone()));
            result.failed.push(failure);
            continue;
        }

        let reachable = destinations
            .entry(planned.destination_dir.clone())
            .or_insert_with(|| {
                destination::ensure_destination(&planned.destination_dir).map_err(|e| e.to_string())
            });
        if let Err(reason) = reachable {
            let failure = fail(FailureKind::DestinationUnreachable, reason.clone());
            notifier.notify(&EngineEvent::Failed(failure.clone()));
            result.failed.push(failure);
            continue;
        }

        let resolution = match conflict::resolve(&candidate, policy) {
            Ok(resolution) => resolution,
            Err(e) => {
                let failure = fail(FailureKind::RenameExhausted, e.to_string());
                notifier.notify(&EngineEvent::Failed(failure.clone()));
                result.failed.push(failure);
                continue;
            }
        };
        if !resolution.proceed {
            let failure = fail(FailureKind::AlreadyExists, "already exists".to_string());
            notifier.notify(&EngineEvent::Failed(failure.clone()));
            result.failed.push(failure);
            continue;
        }

        let moved = if policy == ConflictPolicy::Overwrite {
            replace_entry(&planned.source, &resolution.path)
        } else {
            move_entry(&planned.source, &resolution.path)
        };

        match moved {
            Ok(()) => {
                tracing::debug!(name = %name, to = %resolution.path.display(), "moved");
                notifier.notify(&EngineEvent::Moved {
                    name: name.clone(),
                    destination: resolution.path.clone(),
                });
                result.moved.push(MoveRecord {
                    destination: resolution.path,
                    source: planned.source.clone(),
                });
            }
            Err(e) => {
                let failure = fail(FailureKind::MoveFailed, e.to_string());
                notifier.notify(&EngineEvent::Failed(failure.clone()));
                result.failed.push(failure);
            }
        }
    }

    if !result.moved.is_empty() {
        result.batch_id = Some(journal.push(result.moved.clone()));
    }

    tracing::info!(
        moved = result.moved.len(),
        failed = result.failed.len(),
        cancelled = result.cancelled,
        "run finished"
    );
    notifier.notify(&EngineEvent::RunFinished {
        moved: result.moved.len(),
        failed: result.failed.len(),
        cancelled: result.cancelled,
    });
    result
}

/// Moves `source` to `target`, which must be free.
///
/// Falls back to copy-then-remove when the two paths are on different
/// filesystems.
pub(crate) fn move_entry(source: &Path, target: &Path) -> io::Result<()> {
    match fs::rename(source, target) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => copy_then_remove(source, target),
        Err(e) => Err(e),
    }
}

/// Like [`move_entry`], but replaces whatever occupies `target`.
///
/// The old entry is set aside under a hidden name and only deleted once the
/// move succeeded; on failure it is put back.
fn replace_entry(source: &Path, target: &Path) -> io::Result<()> {
    source.symlink_metadata()?;
    if target.symlink_metadata().is_err() {
        return move_entry(source, target);
    }

    let aside = set_aside_path(target)?;
    fs::rename(target, &aside)?;
    if let Err(e) = move_entry(source, target) {
        if let Err(restore) = fs::rename(&aside, target) {
            tracing::error!(
                path = %aside.display(),
                error = %restore,
                "could not put replaced entry back"
            );
        }
        return Err(e);
    }

    let removed = match aside.symlink_metadata() {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(&aside),
        _ => fs::remove_file(&aside),
    };
    if let Err(e) = removed {
        tracing::warn!(path = %aside.display(), error = %e, "replaced entry left behind");
    }
    Ok(())
}

fn set_aside_path(target: &Path) -> io::Result<PathBuf> {
    let name = target
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "target has no file name"))?;
    for n in 0..MAX_RENAME_ATTEMPTS {
        let mut aside = OsString::from(".");
        aside.push(name);
        aside.push(format!(".replaced-{n}"));
        let path = target.with_file_name(aside);
        if path.symlink_metadata().is_err() {
            return Ok(path);
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        "no free name to set the replaced entry aside",
    ))
}

fn copy_then_remove(source: &Path, target: &Path) -> io::Result<()> {
    let is_dir = source.symlink_metadata()?.is_dir();
    let copied = if is_dir {
        copy_dir(source, target)
    } else {
        fs::copy(source, target).map(|_| ())
    };

    if let Err(e) = copied {
        let _ = if is_dir {
            fs::remove_dir_all(target)
        } else {
            fs::remove_file(target)
        };
        return Err(e);
    }

    if is_dir {
        fs::remove_dir_all(source)
    } else {
        fs::remove_file(source)
    }
}

fn copy_dir(source: &Path, target: &Path) -> io::Result<()> {
    fs::create_dir(target)?;
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let to = target.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &to)?;
        } else {
            fs::copy(entry.path(), &to)?;
        }
    }
    Ok(())
}
