//! Configuration loading and snapshot filters.
//!
//! Configuration is a plain TOML value. It is read once and handed to the
//! engine; nothing here is global.
//!
//! # Configuration File Format
//!
//! ```toml
//! source = "/home/me/Downloads"
//! conflict = "rename"          # skip | overwrite | rename
//! dated_subfolder = false
//! regex_mode = false
//! start_delay_secs = 0
//! close_delay_secs = 0
//! exit_after_run = false
//! journal_capacity = 100
//!
//! [catch_all]
//! enabled = true
//! destination = "misc"
//!
//! [filters]
//! enable_hidden_files = false
//! exclude = ["*.part", "desktop.ini"]
//!
//! [schedule]
//! times = ["09:00", "18:30"]
//!
//! [[rules]]
//! pattern = ".jpg"
//! destination = "images/{year}"
//!
//! [[rules]]
//! pattern = "invoice"
//! kind = "keyword"
//! destination = "/archive/invoices"
//! ```

use crate::conflict::ConflictPolicy;
use crate::error::ConfigError;
use crate::planner::{CatchAll, PlanOptions};
use crate::rule::{PatternKind, Rule, RuleSet};
use crate::schedule::ScheduleBook;
use crate::timer::DelaySettings;
use crate::undo::DEFAULT_CAPACITY;
use glob::Pattern;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the current directory.
pub const LOCAL_CONFIG_FILE: &str = ".rulesortrc.toml";

/// Everything the engine needs, as read from disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub source: Option<PathBuf>,
    pub rules: Vec<RuleEntry>,
    pub conflict: ConflictPolicy,
    /// Kind used for rules that omit `kind` and are neither an extension nor
    /// the directory marker.
    pub regex_mode: bool,
    pub dated_subfolder: bool,
    pub catch_all: CatchAll,
    pub start_delay_secs: u32,
    pub close_delay_secs: u32,
    pub exit_after_run: bool,
    pub journal_capacity: usize,
    pub filters: FilterRules,
    pub schedule: ScheduleSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source: None,
            rules: Vec::new(),
            conflict: ConflictPolicy::default(),
            regex_mode: false,
            dated_subfolder: false,
            catch_all: CatchAll::default(),
            start_delay_secs: 0,
            close_delay_secs: 0,
            exit_after_run: false,
            journal_capacity: DEFAULT_CAPACITY,
            filters: FilterRules::default(),
            schedule: ScheduleSettings::default(),
        }
    }
}

/// One `[[rules]]` table. `kind` may be left out and is then inferred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleEntry {
    #[serde(default)]
    pub pattern: String,
    #[serde(default)]
    pub kind: Option<PatternKind>,
    #[serde(default)]
    pub destination: String,
}

/// Which entries a snapshot leaves out.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterRules {
    /// Whether to include entries starting with ".". Defaults to false.
    #[serde(default)]
    pub enable_hidden_files: bool,

    /// Glob patterns matched against entry names.
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleSettings {
    /// Daily `HH:MM` trigger times.
    #[serde(default)]
    pub times: Vec<String>,
}

impl Settings {
    /// Load configuration from a file, with fallback to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.rulesortrc.toml` in the current directory
    /// 3. Look for `~/.config/rulesort/config.toml` in home directory
    /// 4. Fall back to default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if a configuration file is explicitly provided but cannot be read.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("rulesort")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        let settings: Self =
            toml::from_str(&content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))?;
        tracing::debug!(path = %path.display(), rules = settings.rules.len(), "configuration loaded");
        Ok(settings)
    }

    /// The rules in order, with inferred kinds filled in.
    pub fn rule_set(&self) -> RuleSet {
        self.rules
            .iter()
            .map(|entry| {
                let kind = entry
                    .kind
                    .unwrap_or_else(|| PatternKind::infer(entry.pattern.trim(), self.regex_mode));
                Rule::new(entry.pattern.clone(), kind, entry.destination.clone())
            })
            .collect()
    }

    pub fn plan_options(&self) -> PlanOptions {
        PlanOptions {
            catch_all: self.catch_all.clone(),
            dated_subfolder: self.dated_subfolder,
        }
    }

    pub fn delays(&self) -> DelaySettings {
        DelaySettings {
            start_delay_secs: self.start_delay_secs,
            close_delay_secs: self.close_delay_secs,
            exit_after_run: self.exit_after_run,
        }
    }

    /// Checks everything that can be checked without touching disk and
    /// returns the engine-ready form.
    ///
    /// # Errors
    ///
    /// Returns an error when no source directory is configured, or when a
    /// filter glob or schedule time is malformed.
    pub fn validate(&self) -> Result<EngineConfig, ConfigError> {
        let source = self
            .source
            .clone()
            .ok_or_else(|| ConfigError::ConfigInvalid("no source directory set".to_string()))?;

        Ok(EngineConfig {
            source,
            rules: self.rule_set(),
            policy: self.conflict,
            plan: self.plan_options(),
            delays: self.delays(),
            filters: SnapshotFilters::compile(&self.filters)?,
            schedule: ScheduleBook::parse(self.schedule.times.as_slice())?,
            journal_capacity: self.journal_capacity,
        })
    }
}

/// Validated configuration, ready for [`crate::engine::Engine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub source: PathBuf,
    pub rules: RuleSet,
    pub policy: ConflictPolicy,
    pub plan: PlanOptions,
    pub delays: DelaySettings,
    pub filters: SnapshotFilters,
    pub schedule: ScheduleBook,
    pub journal_capacity: usize,
}

impl EngineConfig {
    /// Defaults for everything but the source directory and rules.
    pub fn new(source: impl Into<PathBuf>, rules: RuleSet) -> Self {
        Self {
            source: source.into(),
            rules,
            policy: ConflictPolicy::default(),
            plan: PlanOptions::default(),
            delays: DelaySettings::default(),
            filters: SnapshotFilters::default(),
            schedule: ScheduleBook::default(),
            journal_capacity: DEFAULT_CAPACITY,
        }
    }
}

/// Compiled snapshot filters.
#[derive(Debug, Clone, Default)]
pub struct SnapshotFilters {
    enable_hidden_files: bool,
    exclude_patterns: Vec<Pattern>,
    exclude_names: Vec<String>,
}

impl SnapshotFilters {
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidGlobPattern`] for a malformed glob.
    pub fn compile(rules: &FilterRules) -> Result<Self, ConfigError> {
        let exclude_patterns = rules
            .exclude
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            enable_hidden_files: rules.enable_hidden_files,
            exclude_patterns,
            exclude_names: Vec::new(),
        })
    }

    /// Always leaves out an entry with exactly this name.
    pub fn exclude_name(mut self, name: impl Into<String>) -> Self {
        self.exclude_names.push(name.into());
        self
    }

    /// Checks are performed in this order, with early termination:
    /// 1. Exact excluded name
    /// 2. Hidden entry filter
    /// 3. Glob patterns
    pub fn should_include(&self, name: &str) -> bool {
        if self.exclude_names.iter().any(|n| n == name) {
            return false;
        }
        if !self.enable_hidden_files && name.starts_with('.') {
            return false;
        }
        !self.exclude_patterns.iter().any(|p| p.matches(name))
    }
}
