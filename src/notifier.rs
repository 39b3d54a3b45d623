//! Progress reporting to whatever front end drives the engine.
//!
//! The engine never formats UI. It hands structured [`EngineEvent`]s to a
//! [`Notifier`]; every event also renders as a human-readable line through
//! `Display`.

use crate::executor::FailureEntry;
use crate::rule::RuleWarning;
use crate::timer::{DelayAdjustment, TimerState};
use std::path::PathBuf;

/// Something that happened inside the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    PatternWarning(RuleWarning),
    DelayClamped(DelayAdjustment),
    StateChanged(TimerState),
    /// One second of a countdown elapsed.
    Countdown { closing: bool, remaining: u32 },
    RunStarted { planned: usize },
    NothingToMove,
    Moved { name: String, destination: PathBuf },
    Failed(FailureEntry),
    RunFinished { moved: usize, failed: usize, cancelled: bool },
    Restored { name: String, path: PathBuf },
    RestoreFailed(FailureEntry),
    UndoFinished { restored: usize, failed: usize },
    NoHistory,
    AlreadyRunning,
    Stopped,
}

impl std::fmt::Display for EngineEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineEvent::PatternWarning(warning) => write!(f, "{warning}"),
            EngineEvent::DelayClamped(adjustment) => write!(f, "{adjustment}"),
            EngineEvent::StateChanged(state) => write!(f, "state: {state}"),
            EngineEvent::Countdown { closing, remaining } => {
                let what = if *closing { "Closing" } else { "Moving" };
                write!(f, "{what} in {remaining}s")
            }
            EngineEvent::RunStarted { planned } => write!(f, "Moving {planned} item(s)"),
            EngineEvent::NothingToMove => write!(f, "No entries match any rule"),
            EngineEvent::Moved { name, destination } => {
                write!(f, "Moved {name} -> {}", destination.display())
            }
            EngineEvent::Failed(failure) => write!(f, "Failed {failure}"),
            EngineEvent::RunFinished {
                moved,
                failed,
                cancelled,
            } => {
                write!(f, "Done: {moved} moved, {failed} failed")?;
                if *cancelled {
                    write!(f, " (stopped)")?;
                }
                Ok(())
            }
            EngineEvent::Restored { name, path } => {
                write!(f, "Restored {name} -> {}", path.display())
            }
            EngineEvent::RestoreFailed(failure) => write!(f, "Restore failed {failure}"),
            EngineEvent::UndoFinished { restored, failed } => {
                write!(f, "Undo done: {restored} restored, {failed} failed")
            }
            EngineEvent::NoHistory => write!(f, "Nothing to undo"),
            EngineEvent::AlreadyRunning => write!(f, "A run is already in progress"),
            EngineEvent::Stopped => write!(f, "Stopped"),
        }
    }
}

/// Receives engine events.
pub trait Notifier {
    fn notify(&mut self, event: &EngineEvent);
}

/// Forwards every event to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&mut self, event: &EngineEvent) {
        match event {
            EngineEvent::PatternWarning(_)
            | EngineEvent::DelayClamped(_)
            | EngineEvent::Failed(_)
            | EngineEvent::RestoreFailed(_) => tracing::warn!("{event}"),
            EngineEvent::Countdown { .. } | EngineEvent::StateChanged(_) => {
                tracing::debug!("{event}")
            }
            _ => tracing::info!("{event}"),
        }
    }
}

/// Keeps every event in memory, in order.
#[derive(Debug, Default, Clone)]
pub struct Recorder {
    pub events: Vec<EngineEvent>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rendered lines, one per event.
    pub fn lines(&self) -> Vec<String> {
        self.events.iter().map(ToString::to_string).collect()
    }
}

impl Notifier for Recorder {
    fn notify(&mut self, event: &EngineEvent) {
        self.events.push(event.clone());
    }
}

impl<N: Notifier + ?Sized> Notifier for &mut N {
    fn notify(&mut self, event: &EngineEvent) {
        (**self).notify(event);
    }
}

impl<N: Notifier + ?Sized> Notifier for Box<N> {
    fn notify(&mut self, event: &EngineEvent) {
        (**self).notify(event);
    }
}
