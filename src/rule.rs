//! Classification rules and the rule matcher.
//!
//! A [`Rule`] pairs a pattern with a destination template. Rules live in a
//! [`RuleSet`] whose order is their priority: the first rule that matches an
//! entry claims it.
//!
//! # Examples
//!
//! ```
//! use rulesort::rule::{CompiledRule, PatternKind, Rule};
//! use rulesort::snapshot::DirectoryEntry;
//!
//! let rule = Rule::new(".jpg", PatternKind::Extension, "images");
//! let (compiled, warning) = CompiledRule::compile(0, &rule);
//! assert!(warning.is_none());
//! assert!(compiled.matches(&DirectoryEntry::file("Holiday.JPG", 10)));
//! assert!(!compiled.matches(&DirectoryEntry::directory("x.jpg")));
//! ```

use crate::error::{OrganizeError, OrganizeResult};
use crate::snapshot::DirectoryEntry;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Reserved pattern literal that selects every directory.
pub const DIRECTORY_MARKER: &str = "[folders]";

/// How a rule's pattern is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PatternKind {
    /// Case-insensitive suffix match on file names only.
    Extension,
    /// Case-insensitive substring match on files and directories.
    Keyword,
    /// Case-insensitive regular-expression search on files and directories.
    Regex,
    /// Matches every directory, whatever the pattern says.
    DirectoryMarker,
}

impl PatternKind {
    /// Picks a kind for a pattern that was given without one.
    ///
    /// The directory marker literal wins, then a leading dot means an
    /// extension, then `regex_mode` decides between regex and keyword.
    pub fn infer(pattern: &str, regex_mode: bool) -> Self {
        if pattern == DIRECTORY_MARKER {
            PatternKind::DirectoryMarker
        } else if pattern.starts_with('.') {
            PatternKind::Extension
        } else if regex_mode {
            PatternKind::Regex
        } else {
            PatternKind::Keyword
        }
    }
}

/// A single classification rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub pattern: String,
    pub kind: PatternKind,
    /// Destination template, see [`crate::destination`].
    pub destination: String,
}

impl Rule {
    pub fn new(
        pattern: impl Into<String>,
        kind: PatternKind,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            pattern: pattern.into(),
            kind,
            destination: destination.into(),
        }
    }

    /// An unfilled rule row: nothing to match or nowhere to go.
    pub fn is_blank(&self) -> bool {
        let no_pattern =
            self.pattern.trim().is_empty() && self.kind != PatternKind::DirectoryMarker;
        no_pattern || self.destination.trim().is_empty()
    }
}

/// Rules in priority order.
///
/// Order only changes through [`RuleSet::swap`] and [`RuleSet::move_to`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub fn remove(&mut self, index: usize) -> OrganizeResult<Rule> {
        self.check_index(index)?;
        Ok(self.rules.remove(index))
    }

    pub fn get(&self, index: usize) -> Option<&Rule> {
        self.rules.get(index)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Exchanges the rules at positions `i` and `j`.
    pub fn swap(&mut self, i: usize, j: usize) -> OrganizeResult<()> {
        self.check_index(i)?;
        self.check_index(j)?;
        self.rules.swap(i, j);
        Ok(())
    }

    /// Moves the rule at `from` to `to`, shifting the rules in between.
    pub fn move_to(&mut self, from: usize, to: usize) -> OrganizeResult<()> {
        self.check_index(from)?;
        self.check_index(to)?;
        let rule = self.rules.remove(from);
        self.rules.insert(to, rule);
        Ok(())
    }

    fn check_index(&self, index: usize) -> OrganizeResult<()> {
        if index < self.rules.len() {
            Ok(())
        } else {
            Err(OrganizeError::RuleIndexOutOfRange {
                index,
                len: self.rules.len(),
            })
        }
    }
}

impl From<Vec<Rule>> for RuleSet {
    fn from(rules: Vec<Rule>) -> Self {
        Self { rules }
    }
}

impl FromIterator<Rule> for RuleSet {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

/// A regular expression that failed to compile. The rule matches nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleWarning {
    pub index: usize,
    pub pattern: String,
    pub reason: String,
}

impl std::fmt::Display for RuleWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "rule {}: invalid pattern '{}' matches nothing: {}",
            self.index + 1,
            self.pattern,
            self.reason
        )
    }
}

#[derive(Debug, Clone)]
enum Matcher {
    /// Lower-cased suffix, always starting with a dot.
    Extension(String),
    /// Lower-cased needle.
    Keyword(String),
    /// `None` when the pattern did not compile.
    Regex(Option<Regex>),
    Directories,
}

/// A rule prepared for matching many entries.
///
/// Compilation happens once per planning cycle so an invalid regular
/// expression is reported once, not once per file.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub index: usize,
    matcher: Matcher,
}

impl CompiledRule {
    pub fn compile(index: usize, rule: &Rule) -> (Self, Option<RuleWarning>) {
        let pattern = rule.pattern.trim();
        let mut warning = None;
        let matcher = match rule.kind {
            PatternKind::Extension => {
                let lowered = pattern.to_lowercase();
                if lowered.starts_with('.') {
                    Matcher::Extension(lowered)
                } else {
                    Matcher::Extension(format!(".{lowered}"))
                }
            }
            PatternKind::Keyword => Matcher::Keyword(pattern.to_lowercase()),
            PatternKind::Regex => {
                match RegexBuilder::new(pattern).case_insensitive(true).build() {
                    Ok(regex) => Matcher::Regex(Some(regex)),
                    Err(e) => {
                        warning = Some(RuleWarning {
                            index,
                            pattern: rule.pattern.clone(),
                            reason: e.to_string(),
                        });
                        Matcher::Regex(None)
                    }
                }
            }
            PatternKind::DirectoryMarker => Matcher::Directories,
        };
        (Self { index, matcher }, warning)
    }

    /// Whether `entry` satisfies this rule. Pure.
    pub fn matches(&self, entry: &DirectoryEntry) -> bool {
        match &self.matcher {
            Matcher::Extension(suffix) => {
                !entry.is_dir() && entry.name.to_lowercase().ends_with(suffix.as_str())
            }
            Matcher::Keyword(needle) => entry.name.to_lowercase().contains(needle.as_str()),
            Matcher::Regex(Some(regex)) => regex.is_match(&entry.name),
            Matcher::Regex(None) => false,
            Matcher::Directories => entry.is_dir(),
        }
    }
}

/// One-shot convenience over [`CompiledRule`]: compiles and matches.
///
/// Prefer compiling once when matching many entries.
pub fn matches(entry: &DirectoryEntry, rule: &Rule) -> bool {
    CompiledRule::compile(0, rule).0.matches(entry)
}
