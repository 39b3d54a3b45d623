/// Undo journal for reverting completed runs.
///
/// The journal is a bounded stack of batches, one per run that moved at
/// least one entry. Undo pops the newest batch and moves each of its entries
/// back, newest first. A popped batch is gone for good, even when some
/// restorations fail.
use crate::error::{OrganizeError, OrganizeResult};
use crate::executor::{FailureEntry, FailureKind, move_entry};
use crate::notifier::{EngineEvent, Notifier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

/// Default number of batches kept.
pub const DEFAULT_CAPACITY: usize = 100;

/// A single successful move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    /// Where the entry ended up.
    pub destination: PathBuf,
    /// Where the entry came from.
    pub source: PathBuf,
}

/// All successful moves of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveBatch {
    pub id: u64,
    pub created_at: DateTime<Utc>,
    pub records: Vec<MoveRecord>,
}

/// Outcome of one undo.
#[derive(Debug, Clone)]
pub struct UndoReport {
    pub batch_id: u64,
    pub restored: usize,
    pub failed: Vec<FailureEntry>,
}

impl UndoReport {
    /// Returns true if every record was restored.
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Bounded LIFO store of move batches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoJournal {
    capacity: usize,
    next_id: u64,
    batches: VecDeque<MoveBatch>,
}

impl Default for UndoJournal {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl UndoJournal {
    /// Creates an empty journal. A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            next_id: 1,
            batches: VecDeque::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Changes the capacity, evicting the oldest batches if needed.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        self.evict();
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// The batch the next undo would reverse.
    pub fn peek(&self) -> Option<&MoveBatch> {
        self.batches.back()
    }

    /// Records a batch and returns its id. Empty batches are not journaled
    /// by the executor, but are accepted here.
    pub fn push(&mut self, records: Vec<MoveRecord>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.batches.push_back(MoveBatch {
            id,
            created_at: Utc::now(),
            records,
        });
        self.evict();
        id
    }

    fn evict(&mut self) {
        while self.batches.len() > self.capacity {
            if let Some(evicted) = self.batches.pop_front() {
                tracing::debug!(batch = evicted.id, "evicted oldest batch from journal");
            }
        }
    }

    /// Reverses the most recent batch.
    ///
    /// Records are restored in reverse order. The original parent directory
    /// is recreated if it disappeared. A record fails when its entry is no
    /// longer at the destination, or when something now occupies the original
    /// path; the remaining records are still attempted.
    ///
    /// # Errors
    ///
    /// Returns [`OrganizeError::NoHistory`] if the journal is empty.
    pub fn undo(&mut self, notifier: &mut dyn Notifier) -> OrganizeResult<UndoReport> {
        let batch = self.batches.pop_back().ok_or(OrganizeError::NoHistory)?;
        let mut report = UndoReport {
            batch_id: batch.id,
            restored: 0,
            failed: Vec::new(),
        };

        for record in batch.records.iter().rev() {
            let name = record
                .source
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            match restore(record) {
                Ok(()) => {
                    report.restored += 1;
                    notifier.notify(&EngineEvent::Restored {
                        name,
                        path: record.source.clone(),
                    });
                }
                Err(detail) => {
                    let failure = FailureEntry {
                        name,
                        path: record.destination.clone(),
                        kind: FailureKind::UndoFailed,
                        detail,
                    };
                    notifier.notify(&EngineEvent::RestoreFailed(failure.clone()));
                    report.failed.push(failure);
                }
            }
        }

        tracing::info!(
            batch = report.batch_id,
            restored = report.restored,
            failed = report.failed.len(),
            "undo finished"
        );
        notifier.notify(&EngineEvent::UndoFinished {
            restored: report.restored,
            failed: report.failed.len(),
        });
        Ok(report)
    }

    /// Loads a journal saved with [`UndoJournal::save`]. A missing file
    /// yields an empty journal.
    pub fn load(path: &Path) -> OrganizeResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let journal_error = |reason: String| OrganizeError::Journal {
            path: path.to_path_buf(),
            reason,
        };
        let json = fs::read_to_string(path).map_err(|e| journal_error(e.to_string()))?;
        serde_json::from_str(&json).map_err(|e| journal_error(format!("JSON parse error: {e}")))
    }

    /// Writes the journal as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> OrganizeResult<()> {
        let journal_error = |reason: String| OrganizeError::Journal {
            path: path.to_path_buf(),
            reason,
        };
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| journal_error(format!("JSON serialization failed: {e}")))?;
        fs::write(path, json).map_err(|e| journal_error(e.to_string()))
    }
}

fn restore(record: &MoveRecord) -> Result<(), String> {
    if record.destination.symlink_metadata().is_err() {
        return Err("not found at expected location".to_string());
    }
    if record.source.symlink_metadata().is_ok() {
        return Err("original location is occupied".to_string());
    }
    if let Some(parent) = record.source.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("could not recreate {}: {e}", parent.display()))?;
    }
    move_entry(&record.destination, &record.source).map_err(|e| e.to_string())
}
