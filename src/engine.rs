//! The engine: one worker owning the journal, the timer and the stop flag.
//!
//! Callers drive it through a handful of entry points (`preview`, `start`,
//! `execute_now`, `tick`, `undo`, `request_stop`). It is not meant to be
//! shared between threads without a single mutex around the whole value;
//! only the [`StopHandle`] is safe to use from elsewhere.

use crate::config::EngineConfig;
use crate::error::{OrganizeError, OrganizeResult};
use crate::executor::{self, BatchResult};
use crate::notifier::{EngineEvent, Notifier};
use crate::planner::{self, Plan};
use crate::rule::RuleSet;
use crate::snapshot::Snapshot;
use crate::stop::StopHandle;
use crate::timer::{ExecutionTimer, TimerAction, TimerState, Trigger};
use crate::undo::{UndoJournal, UndoReport};
use chrono::{Local, NaiveDate, NaiveDateTime};

pub struct Engine<N: Notifier> {
    config: EngineConfig,
    journal: UndoJournal,
    timer: ExecutionTimer,
    stop: StopHandle,
    notifier: N,
}

impl<N: Notifier> Engine<N> {
    /// Builds an idle engine. Delay clamps are reported to `notifier` right
    /// away.
    pub fn new(config: EngineConfig, mut notifier: N) -> Self {
        let (timer, adjustments) = ExecutionTimer::new(config.delays);
        for adjustment in adjustments {
            notifier.notify(&EngineEvent::DelayClamped(adjustment));
        }
        let journal = UndoJournal::new(config.journal_capacity);
        Self {
            config,
            journal,
            timer,
            stop: StopHandle::new(),
            notifier,
        }
    }

    /// Replaces the journal, for example with one loaded from disk. The
    /// configured capacity wins.
    pub fn with_journal(mut self, mut journal: UndoJournal) -> Self {
        journal.set_capacity(self.config.journal_capacity);
        self.journal = journal;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Rules in priority order, for reordering.
    pub fn rules_mut(&mut self) -> &mut RuleSet {
        &mut self.config.rules
    }

    pub fn journal(&self) -> &UndoJournal {
        &self.journal
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn state(&self) -> TimerState {
        self.timer.state()
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Reads the source directory once.
    pub fn snapshot(&self) -> OrganizeResult<Snapshot> {
        Snapshot::take(&self.config.source, &self.config.filters)
    }

    /// Computes a fresh plan without moving anything.
    pub fn preview(&mut self) -> OrganizeResult<Plan> {
        self.preview_on(today())
    }

    pub fn preview_on(&mut self, day: NaiveDate) -> OrganizeResult<Plan> {
        let snapshot = self.snapshot()?;
        let plan = planner::plan(&snapshot, &self.config.rules, &self.config.plan, day);
        for warning in &plan.warnings {
            self.notifier
                .notify(&EngineEvent::PatternWarning(warning.clone()));
        }
        Ok(plan)
    }

    /// Starts a run, honoring the start delay. Returns the batch result if
    /// the run happened immediately.
    pub fn start(&mut self) -> OrganizeResult<Option<BatchResult>> {
        self.stop.take();
        let before = self.timer.state();
        let action = self.timer.start();
        self.report_transition(before);
        self.act(action)
    }

    /// Runs immediately, cancelling any pending countdown. A request while
    /// a run is in progress is a no-op reported as "already running".
    pub fn execute_now(&mut self) -> OrganizeResult<Option<BatchResult>> {
        let before = self.timer.state();
        match self.timer.execute_now() {
            Trigger::Started => {
                self.stop.take();
                self.report_transition(before);
                self.act(TimerAction::Execute)
            }
            Trigger::AlreadyRunning => {
                self.notifier.notify(&EngineEvent::AlreadyRunning);
                Ok(None)
            }
            Trigger::Terminated => Ok(None),
        }
    }

    /// Advances the timer by one second.
    ///
    /// A pending stop request cancels any countdown instead.
    pub fn tick(&mut self) -> OrganizeResult<Option<BatchResult>> {
        let before = self.timer.state();
        if self.stop.is_requested() {
            if self.timer.cancel() {
                self.stop.take();
                tracing::info!(from = %before, "countdown cancelled");
                self.notifier.notify(&EngineEvent::Stopped);
                self.report_transition(before);
            }
            return Ok(None);
        }

        let action = self.timer.tick();
        match self.timer.state() {
            TimerState::CountdownToMove { remaining } => {
                self.notifier.notify(&EngineEvent::Countdown {
                    closing: false,
                    remaining,
                });
            }
            TimerState::CountdownToClose { remaining } => {
                self.notifier.notify(&EngineEvent::Countdown {
                    closing: true,
                    remaining,
                });
            }
            _ => self.report_transition(before),
        }
        self.act(action)
    }

    /// Runs the schedule against the wall clock and executes if a trigger
    /// is due.
    pub fn poll_schedule(&mut self, now: NaiveDateTime) -> OrganizeResult<Option<BatchResult>> {
        match self.config.schedule.due(now) {
            Some(trigger) => {
                tracing::info!(%trigger, "scheduled run");
                self.execute_now()
            }
            None => Ok(None),
        }
    }

    /// Asks a countdown or a run in progress to stop.
    pub fn request_stop(&self) {
        self.stop.request();
    }

    /// Reverses the most recent batch.
    pub fn undo(&mut self) -> OrganizeResult<UndoReport> {
        match self.journal.undo(&mut self.notifier) {
            Err(OrganizeError::NoHistory) => {
                self.notifier.notify(&EngineEvent::NoHistory);
                Err(OrganizeError::NoHistory)
            }
            other => other,
        }
    }

    fn act(&mut self, action: TimerAction) -> OrganizeResult<Option<BatchResult>> {
        match action {
            TimerAction::Execute => self.run(today()).map(Some),
            TimerAction::Terminate | TimerAction::Nothing => Ok(None),
        }
    }

    fn run(&mut self, day: NaiveDate) -> OrganizeResult<BatchResult> {
        let plan = match self.preview_on(day) {
            Ok(plan) => plan,
            Err(e) => {
                tracing::warn!(error = %e, "run aborted before it started");
                self.timer.abort();
                self.report_transition(TimerState::Executing);
                return Err(e);
            }
        };

        let result = executor::execute(
            &plan,
            self.config.policy,
            &mut self.journal,
            &self.stop,
            &mut self.notifier,
        );

        let stopped = self.stop.take();
        if stopped {
            self.notifier.notify(&EngineEvent::Stopped);
        }
        self.timer.finish(stopped);
        self.report_transition(TimerState::Executing);
        Ok(result)
    }

    fn report_transition(&mut self, before: TimerState) {
        let after = self.timer.state();
        if after != before {
            tracing::debug!(from = %before, to = %after, "timer transition");
            self.notifier.notify(&EngineEvent::StateChanged(after));
        }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
