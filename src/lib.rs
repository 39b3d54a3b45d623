//! rulesort - move the entries of a directory into folders by ordered rules
//!
//! A run takes a [`Snapshot`] of one source directory, matches each entry
//! against a [`RuleSet`] (first match wins), and moves it to the rule's
//! destination. Occupied destinations are handled by a [`ConflictPolicy`],
//! every successful move is recorded in the [`UndoJournal`], and runs can be
//! delayed, cancelled and scheduled through the [`Engine`].

pub mod cli;
pub mod config;
pub mod conflict;
pub mod destination;
pub mod engine;
pub mod error;
pub mod executor;
pub mod notifier;
pub mod output;
pub mod planner;
pub mod rule;
pub mod schedule;
pub mod snapshot;
pub mod stop;
pub mod timer;
pub mod undo;

pub use config::{EngineConfig, Settings, SnapshotFilters};
pub use conflict::ConflictPolicy;
pub use engine::Engine;
pub use error::{ConfigError, OrganizeError, OrganizeResult};
pub use executor::{BatchResult, FailureEntry, FailureKind};
pub use notifier::{EngineEvent, Notifier, Recorder, TracingNotifier};
pub use planner::{CatchAll, Plan, PlanOptions, PlannedMove};
pub use rule::{PatternKind, Rule, RuleSet, RuleWarning};
pub use snapshot::{DirectoryEntry, EntryKind, Snapshot, Survey};
pub use stop::StopHandle;
pub use timer::{DelaySettings, ExecutionTimer, TimerState};
pub use undo::{MoveBatch, MoveRecord, UndoJournal, UndoReport};

pub use cli::{Cli, run_cli};
