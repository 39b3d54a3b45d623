//! Console output for the command-line front end.
//!
//! [`ConsoleNotifier`] renders engine events with colors and a progress bar.
//! The free functions print plan previews and survey tables.

use crate::notifier::{EngineEvent, Notifier};
use crate::planner::{Assignment, Plan};
use crate::snapshot::Survey;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

/// Prints a success message in green with a checkmark.
pub fn success(message: &str) {
    println!("{} {}", "✓".green(), message);
}

/// Prints an error message in red with an X mark.
pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

/// Prints a warning message in yellow with a warning symbol.
pub fn warning(message: &str) {
    println!("{} {}", "⚠".yellow(), message);
}

pub fn info(message: &str) {
    println!("{}", message.cyan());
}

pub fn header(header: &str) {
    println!("\n{}", header.bold());
}

fn progress_bar(total: u64) -> ProgressBar {
    let bar = ProgressBar::new(total);
    if let Ok(style) =
        ProgressStyle::default_bar().template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        bar.set_style(style.progress_chars("█▓░"));
    }
    bar
}

/// Notifier that prints to the terminal.
#[derive(Default)]
pub struct ConsoleNotifier {
    progress: Option<ProgressBar>,
    verbose: bool,
}

impl ConsoleNotifier {
    pub fn new(verbose: bool) -> Self {
        Self {
            progress: None,
            verbose,
        }
    }

    fn line(&self, styled: String) {
        match &self.progress {
            Some(bar) => bar.println(styled),
            None => println!("{styled}"),
        }
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&mut self, event: &EngineEvent) {
        match event {
            EngineEvent::RunStarted { planned } => {
                info(&event.to_string());
                self.progress = Some(progress_bar(*planned as u64));
            }
            EngineEvent::Moved { .. } => {
                if self.verbose {
                    self.line(format!("{} {}", "✓".green(), event));
                }
                if let Some(bar) = &self.progress {
                    bar.inc(1);
                }
            }
            EngineEvent::Failed(_) | EngineEvent::RestoreFailed(_) => {
                self.line(format!("{} {}", "✗".red(), event));
                if let Some(bar) = &self.progress {
                    bar.inc(1);
                }
            }
            EngineEvent::RunFinished { failed, .. } | EngineEvent::UndoFinished { failed, .. } => {
                if let Some(bar) = self.progress.take() {
                    bar.finish_and_clear();
                }
                if *failed == 0 {
                    success(&event.to_string());
                } else {
                    warning(&event.to_string());
                }
            }
            EngineEvent::Restored { .. } => {
                if self.verbose {
                    success(&event.to_string());
                }
            }
            EngineEvent::PatternWarning(_) | EngineEvent::DelayClamped(_) => {
                warning(&event.to_string());
            }
            EngineEvent::Countdown { .. } | EngineEvent::Stopped | EngineEvent::NothingToMove => {
                info(&event.to_string());
            }
            EngineEvent::NoHistory | EngineEvent::AlreadyRunning => {
                warning(&event.to_string());
            }
            EngineEvent::StateChanged(_) => {
                if self.verbose {
                    info(&event.to_string());
                }
            }
        }
    }
}

/// Prints what a run would do, one line per planned move.
pub fn print_plan(plan: &Plan) {
    header("PLAN");
    if plan.is_empty() {
        info("Nothing would be moved.");
        return;
    }
    for planned in &plan.moves {
        let by = match planned.assignment {
            Assignment::Rule(index) => format!("rule {}", index + 1),
            Assignment::CatchAll => "catch-all".to_string(),
        };
        println!(
            " - {} {} {} {}",
            planned.entry.name,
            "→".cyan(),
            planned.destination_dir.display(),
            format!("[{by}]").dimmed()
        );
    }
    println!(
        "\n{} {}",
        plan.len().to_string().green().bold(),
        if plan.len() == 1 { "entry" } else { "entries" }
    );
}

/// Prints the extension tally of a survey.
pub fn print_survey(survey: &Survey) {
    header("SURVEY");

    let width = survey
        .counts
        .keys()
        .map(|name| name.len())
        .max()
        .unwrap_or(0)
        .max(9);

    println!("{:<width$} | {}", "Extension".bold(), "Count".bold());
    println!("{}", "-".repeat(width + 10));
    for (name, count) in &survey.counts {
        println!("{:<width$} | {}", name, count.to_string().green());
    }
    println!("{}", "-".repeat(width + 10));
    println!(
        "{:<width$} | {}",
        "Total".bold(),
        survey.total.to_string().green().bold()
    );
}
