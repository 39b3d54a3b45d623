//! Command-line interface for rulesort.
//!
//! The CLI is one collaborator of the engine among many possible ones. It
//! owns everything the engine does not: reading configuration, keeping the
//! undo journal on disk between invocations, and pumping the timer with a
//! real one-second clock.

use crate::config::{EngineConfig, Settings};
use crate::conflict::ConflictPolicy;
use crate::engine::Engine;
use crate::error::OrganizeResult;
use crate::executor::BatchResult;
use crate::output::{self, ConsoleNotifier};
use crate::timer::TimerState;
use crate::undo::UndoJournal;
use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// Name of the journal file kept in the source directory.
pub const JOURNAL_FILE: &str = ".rulesort_history.json";

#[derive(Debug, Parser)]
#[command(author, version, about = "Move files into folders by ordered rules")]
pub struct Cli {
    /// Configuration file (defaults to .rulesortrc.toml, then ~/.config/rulesort/config.toml)
    #[arg(short, long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Print every move and state change
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Move entries now, honoring the configured delays
    Run {
        /// Source directory (overrides the configuration)
        #[arg(value_hint = clap::ValueHint::DirPath)]
        source: Option<PathBuf>,

        /// Override the conflict policy: skip, overwrite or rename
        #[arg(long)]
        conflict: Option<ConflictPolicy>,

        /// Ignore the start delay
        #[arg(long)]
        now: bool,
    },
    /// Show what a run would do without moving anything
    Preview {
        #[arg(value_hint = clap::ValueHint::DirPath)]
        source: Option<PathBuf>,
    },
    /// Count entries by extension
    Survey {
        #[arg(value_hint = clap::ValueHint::DirPath)]
        source: Option<PathBuf>,

        /// Print one suggested rule per extension, all moving to this destination
        #[arg(long)]
        suggest: Option<String>,
    },
    /// Undo the most recent run
    Undo {
        #[arg(value_hint = clap::ValueHint::DirPath)]
        source: Option<PathBuf>,

        /// Only list what would be restored
        #[arg(long)]
        dry_run: bool,
    },
    /// Stay running and execute at the scheduled times
    Watch {
        #[arg(value_hint = clap::ValueHint::DirPath)]
        source: Option<PathBuf>,
    },
}

/// Runs one parsed command line.
pub fn run_cli(cli: Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref()).context("Error loading configuration")?;

    match cli.command {
        Command::Run {
            source,
            conflict,
            now,
        } => {
            let mut config = engine_config(&settings, source)?;
            if let Some(policy) = conflict {
                config.policy = policy;
            }
            run(config, cli.verbose, now)
        }
        Command::Preview { source } => {
            let config = engine_config(&settings, source)?;
            let mut engine = Engine::new(config, ConsoleNotifier::new(cli.verbose));
            let plan = engine.preview()?;
            output::print_plan(&plan);
            Ok(())
        }
        Command::Survey { source, suggest } => {
            let config = engine_config(&settings, source)?;
            let engine = Engine::new(config, ConsoleNotifier::new(cli.verbose));
            let survey = engine.snapshot()?.survey();
            output::print_survey(&survey);
            if let Some(destination) = suggest {
                let rules = survey.suggested_rules(&destination, usize::MAX);
                output::header("SUGGESTED RULES");
                for rule in rules {
                    println!(
                        "[[rules]]\npattern = {:?}\ndestination = {:?}\n",
                        rule.pattern, rule.destination
                    );
                }
            }
            Ok(())
        }
        Command::Undo { source, dry_run } => {
            let config = engine_config(&settings, source)?;
            undo(config, cli.verbose, dry_run)
        }
        Command::Watch { source } => {
            let config = engine_config(&settings, source)?;
            watch(config, cli.verbose)
        }
    }
}

fn engine_config(settings: &Settings, source: Option<PathBuf>) -> Result<EngineConfig> {
    let mut settings = settings.clone();
    if source.is_some() {
        settings.source = source;
    }
    if settings.source.is_none() {
        bail!("No source directory given on the command line or in the configuration");
    }
    let mut config = settings.validate().context("Invalid configuration")?;
    config.filters = config.filters.exclude_name(JOURNAL_FILE);
    Ok(config)
}

fn journal_path(source: &Path) -> PathBuf {
    source.join(JOURNAL_FILE)
}

fn open_engine(config: EngineConfig, verbose: bool) -> Result<Engine<ConsoleNotifier>> {
    let journal = UndoJournal::load(&journal_path(&config.source))?;
    Ok(Engine::new(config, ConsoleNotifier::new(verbose)).with_journal(journal))
}

fn save_journal(engine: &Engine<ConsoleNotifier>) {
    let path = journal_path(&engine.config().source);
    if let Err(e) = engine.journal().save(&path) {
        output::warning(&format!("Could not save history: {e}"));
        output::warning("Undo may not be available for this run.");
    }
}

fn run(config: EngineConfig, verbose: bool, now: bool) -> Result<()> {
    output::info(&format!("Organizing contents of: {}", config.source.display()));
    let mut engine = open_engine(config, verbose)?;

    let started = if now {
        engine.execute_now()
    } else {
        engine.start()
    };
    let mut ran = started?.is_some();

    while matches!(engine.state(), TimerState::CountdownToMove { .. }) {
        thread::sleep(Duration::from_secs(1));
        ran |= engine.tick()?.is_some();
    }
    if ran {
        save_journal(&engine);
    }

    while matches!(engine.state(), TimerState::CountdownToClose { .. }) {
        thread::sleep(Duration::from_secs(1));
        engine.tick()?;
    }
    Ok(())
}

fn undo(config: EngineConfig, verbose: bool, dry_run: bool) -> Result<()> {
    let mut engine = open_engine(config, verbose)?;

    if dry_run {
        match engine.journal().peek() {
            Some(batch) => {
                output::header(&format!(
                    "Batch {} from {} would be restored:",
                    batch.id,
                    batch.created_at.format("%Y-%m-%d %H:%M:%S")
                ));
                for record in batch.records.iter().rev() {
                    println!(
                        " - {}\n   → {}",
                        record.destination.display(),
                        record.source.display()
                    );
                }
            }
            None => output::warning("Nothing to undo"),
        }
        return Ok(());
    }

    output::info("Undoing previous run...");
    let report = engine.undo()?;
    save_journal(&engine);
    if !report.is_complete_success() {
        output::error("Some entries could not be restored. Please review errors above.");
    }
    Ok(())
}

fn watch(config: EngineConfig, verbose: bool) -> Result<()> {
    if config.schedule.is_empty() {
        bail!("No schedule times configured; add times under [schedule]");
    }
    let times: Vec<String> = config
        .schedule
        .triggers()
        .iter()
        .map(ToString::to_string)
        .collect();
    output::info(&format!(
        "Watching {} at {}",
        config.source.display(),
        times.join(", ")
    ));

    let mut engine = open_engine(config, verbose)?;
    loop {
        let now = chrono::Local::now().naive_local();
        let scheduled = report_run(engine.poll_schedule(now));
        let ticked = report_run(engine.tick());
        if scheduled || ticked {
            save_journal(&engine);
        }
        if engine.state() == TimerState::Terminated {
            return Ok(());
        }
        thread::sleep(Duration::from_secs(1));
    }
}

/// Whether a watched run moved anything worth saving. Failures are printed
/// and the watch goes on.
fn report_run(result: OrganizeResult<Option<BatchResult>>) -> bool {
    match result {
        Ok(batch) => batch.is_some(),
        Err(e) => {
            output::error(&e.to_string());
            false
        }
    }
}
