//! Move planning: which entry goes where.
//!
//! The plan is advisory. It performs no filesystem mutation and can be
//! recomputed at will for a preview. Each entry appears in a plan at most
//! once: the first rule that matches claims it, and the catch-all bucket only
//! sees what no rule claimed.

use crate::destination;
use crate::rule::{CompiledRule, RuleSet, RuleWarning};
use crate::snapshot::{DirectoryEntry, Snapshot};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Final bucket for entries no rule claimed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatchAll {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub destination: String,
}

impl CatchAll {
    pub fn to(destination: impl Into<String>) -> Self {
        Self {
            enabled: true,
            destination: destination.into(),
        }
    }

    fn active(&self) -> Option<&str> {
        let destination = self.destination.trim();
        (self.enabled && !destination.is_empty()).then_some(destination)
    }
}

/// Options that shape a plan besides the rules themselves.
#[derive(Debug, Clone, Default)]
pub struct PlanOptions {
    pub catch_all: CatchAll,
    pub dated_subfolder: bool,
}

/// Which bucket assigned an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    /// Position of the rule in the rule set.
    Rule(usize),
    CatchAll,
}

/// An entry paired with its destination directory, before conflict
/// resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    pub entry: DirectoryEntry,
    pub source: PathBuf,
    pub destination_dir: PathBuf,
    pub assignment: Assignment,
}

impl PlannedMove {
    /// Path the entry would occupy if nothing is in the way.
    pub fn candidate(&self) -> PathBuf {
        self.destination_dir.join(self.entry.os_name())
    }
}

/// Ordered moves plus the pattern warnings raised while building them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    pub moves: Vec<PlannedMove>,
    pub warnings: Vec<RuleWarning>,
}

impl Plan {
    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}

/// Computes the plan for `snapshot` under `rules`.
///
/// Ordering is rule order, then listing order within a rule, then catch-all
/// entries in listing order. Blank rules are ignored. An entry is never sent
/// into itself or into its current directory, and an entry that is itself
/// (or contains) a destination directory of any rule or of the catch-all is
/// left in place, even when nothing is bound there this run.
pub fn plan(snapshot: &Snapshot, rules: &RuleSet, options: &PlanOptions, today: NaiveDate) -> Plan {
    let mut claimed = vec![false; snapshot.entries.len()];
    let mut moves = Vec::new();
    let mut warnings = Vec::new();

    let assign = |entry: &DirectoryEntry, template: &str| {
        let source = snapshot.path_of(entry);
        let destination_dir = destination::expand(
            template,
            entry,
            today,
            options.dated_subfolder,
            &snapshot.root,
        );
        let into_itself = destination_dir.starts_with(&source);
        (source, destination_dir, into_itself)
    };

    for (index, rule) in rules.iter().enumerate() {
        if rule.is_blank() {
            continue;
        }
        let (compiled, warning) = CompiledRule::compile(index, rule);
        if let Some(warning) = warning {
            tracing::warn!(rule = index, pattern = %warning.pattern, reason = %warning.reason, "invalid pattern");
            warnings.push(warning);
            continue;
        }

        for (slot, entry) in snapshot.entries.iter().enumerate() {
            if claimed[slot] || !compiled.matches(entry) {
                continue;
            }
            let (source, destination_dir, into_itself) = assign(entry, &rule.destination);
            if into_itself {
                continue;
            }
            claimed[slot] = true;
            moves.push(PlannedMove {
                entry: entry.clone(),
                source,
                destination_dir,
                assignment: Assignment::Rule(index),
            });
        }
    }

    if let Some(template) = options.catch_all.active() {
        for (slot, entry) in snapshot.entries.iter().enumerate() {
            if claimed[slot] {
                continue;
            }
            let (source, destination_dir, into_itself) = assign(entry, template);
            if into_itself {
                continue;
            }
            claimed[slot] = true;
            moves.push(PlannedMove {
                entry: entry.clone(),
                source,
                destination_dir,
                assignment: Assignment::CatchAll,
            });
        }
    }

    let protected = destination_dirs(snapshot, rules, options, today);
    moves.retain(|m| {
        let in_place = m.destination_dir == snapshot.root;
        let holds_destination = protected.iter().any(|dest| dest.starts_with(&m.source));
        if in_place || holds_destination {
            tracing::debug!(name = %m.entry.name, "left in place");
        }
        !in_place && !holds_destination
    });

    Plan { moves, warnings }
}

/// Every directory a rule or the catch-all could send an entry of
/// `snapshot` to, whether or not anything is bound there this run.
fn destination_dirs(
    snapshot: &Snapshot,
    rules: &RuleSet,
    options: &PlanOptions,
    today: NaiveDate,
) -> Vec<PathBuf> {
    let templates = rules
        .iter()
        .filter(|rule| !rule.is_blank())
        .map(|rule| rule.destination.as_str())
        .chain(options.catch_all.active());

    let entries = &snapshot.entries;
    let root = &snapshot.root;
    let dated = options.dated_subfolder;
    let mut dirs: Vec<PathBuf> = templates
        .flat_map(move |template| {
            entries
                .iter()
                .map(move |entry| destination::expand(template, entry, today, dated, root))
        })
        .collect();
    dirs.sort();
    dirs.dedup();
    dirs
}
