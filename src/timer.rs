//! Delayed start and delayed close, as an explicit state machine.
//!
//! ```text
//! Idle -> CountdownToMove -> Executing -> Completed -> CountdownToClose -> Terminated
//!   \_______________________^               \___________________________^
//! ```
//!
//! Nothing here sleeps. The owner calls [`ExecutionTimer::tick`] once per
//! second and acts on the returned [`TimerAction`].

use serde::{Deserialize, Serialize};

/// Smallest non-zero close delay, in seconds.
pub const MIN_CLOSE_DELAY_SECS: u32 = 5;

/// Where the timer currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    CountdownToMove { remaining: u32 },
    Executing,
    Completed,
    CountdownToClose { remaining: u32 },
    Terminated,
}

impl std::fmt::Display for TimerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimerState::Idle => write!(f, "idle"),
            TimerState::CountdownToMove { remaining } => write!(f, "moving in {remaining}s"),
            TimerState::Executing => write!(f, "executing"),
            TimerState::Completed => write!(f, "completed"),
            TimerState::CountdownToClose { remaining } => write!(f, "closing in {remaining}s"),
            TimerState::Terminated => write!(f, "terminated"),
        }
    }
}

/// What the owner of the timer must do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    Nothing,
    /// Run plan and execute now, then call [`ExecutionTimer::finish`].
    Execute,
    /// Shut down.
    Terminate,
}

/// Answer to an "execute now" request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Started,
    AlreadyRunning,
    Terminated,
}

/// Configured delays, in seconds. Zero disables a delay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelaySettings {
    pub start_delay_secs: u32,
    pub close_delay_secs: u32,
    /// With no close delay, go straight from `Completed` to `Terminated`
    /// instead of staying in `Completed`.
    pub exit_after_run: bool,
}

/// A delay value that was changed to satisfy the delay rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayAdjustment {
    CloseRaisedToFloor { requested: u32, applied: u32 },
    StartLoweredToClose { requested: u32, applied: u32 },
}

impl std::fmt::Display for DelayAdjustment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DelayAdjustment::CloseRaisedToFloor { requested, applied } => write!(
                f,
                "close delay {requested}s is below the minimum, using {applied}s"
            ),
            DelayAdjustment::StartLoweredToClose { requested, applied } => write!(
                f,
                "start delay {requested}s exceeds the close delay, using {applied}s"
            ),
        }
    }
}

impl DelaySettings {
    /// Applies the delay rules and reports every change.
    ///
    /// The close floor is applied first, so the start delay is compared
    /// against the close delay that will actually be used.
    pub fn clamped(self) -> (Self, Vec<DelayAdjustment>) {
        let mut clamped = self;
        let mut adjustments = Vec::new();

        if clamped.close_delay_secs > 0 && clamped.close_delay_secs < MIN_CLOSE_DELAY_SECS {
            adjustments.push(DelayAdjustment::CloseRaisedToFloor {
                requested: clamped.close_delay_secs,
                applied: MIN_CLOSE_DELAY_SECS,
            });
            clamped.close_delay_secs = MIN_CLOSE_DELAY_SECS;
        }

        if clamped.close_delay_secs > 0 && clamped.start_delay_secs > clamped.close_delay_secs {
            adjustments.push(DelayAdjustment::StartLoweredToClose {
                requested: clamped.start_delay_secs,
                applied: clamped.close_delay_secs,
            });
            clamped.start_delay_secs = clamped.close_delay_secs;
        }

        (clamped, adjustments)
    }
}

/// The countdown state machine.
#[derive(Debug, Clone)]
pub struct ExecutionTimer {
    delays: DelaySettings,
    state: TimerState,
}

impl ExecutionTimer {
    /// Builds an idle timer, clamping `delays` and returning the
    /// adjustments made.
    pub fn new(delays: DelaySettings) -> (Self, Vec<DelayAdjustment>) {
        let (delays, adjustments) = delays.clamped();
        (
            Self {
                delays,
                state: TimerState::Idle,
            },
            adjustments,
        )
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn delays(&self) -> DelaySettings {
        self.delays
    }

    /// Begins a run honoring the start delay. Only valid from `Idle` or
    /// `Completed`; anything else is left alone.
    pub fn start(&mut self) -> TimerAction {
        match self.state {
            TimerState::Idle | TimerState::Completed => {
                if self.delays.start_delay_secs > 0 {
                    self.state = TimerState::CountdownToMove {
                        remaining: self.delays.start_delay_secs,
                    };
                    TimerAction::Nothing
                } else {
                    self.state = TimerState::Executing;
                    TimerAction::Execute
                }
            }
            _ => TimerAction::Nothing,
        }
    }

    /// Skips any pending countdown and executes right away.
    pub fn execute_now(&mut self) -> Trigger {
        match self.state {
            TimerState::Executing => Trigger::AlreadyRunning,
            TimerState::Terminated => Trigger::Terminated,
            _ => {
                self.state = TimerState::Executing;
                Trigger::Started
            }
        }
    }

    /// Advances one second.
    pub fn tick(&mut self) -> TimerAction {
        match self.state {
            TimerState::CountdownToMove { remaining } => {
                let remaining = remaining.saturating_sub(1);
                if remaining == 0 {
                    self.state = TimerState::Executing;
                    TimerAction::Execute
                } else {
                    self.state = TimerState::CountdownToMove { remaining };
                    TimerAction::Nothing
                }
            }
            TimerState::CountdownToClose { remaining } => {
                let remaining = remaining.saturating_sub(1);
                if remaining == 0 {
                    self.state = TimerState::Terminated;
                    TimerAction::Terminate
                } else {
                    self.state = TimerState::CountdownToClose { remaining };
                    TimerAction::Nothing
                }
            }
            _ => TimerAction::Nothing,
        }
    }

    /// Leaves `Executing` after a run.
    ///
    /// A stopped run ends in `Completed` without any close countdown.
    pub fn finish(&mut self, stopped: bool) -> TimerAction {
        if self.state != TimerState::Executing {
            return TimerAction::Nothing;
        }
        self.state = TimerState::Completed;
        if stopped {
            return TimerAction::Nothing;
        }
        if self.delays.close_delay_secs > 0 {
            self.state = TimerState::CountdownToClose {
                remaining: self.delays.close_delay_secs,
            };
            TimerAction::Nothing
        } else if self.delays.exit_after_run {
            self.state = TimerState::Terminated;
            TimerAction::Terminate
        } else {
            TimerAction::Nothing
        }
    }

    /// Returns to `Idle` after a run that never got going (for example an
    /// unreadable source directory).
    pub fn abort(&mut self) {
        if self.state == TimerState::Executing {
            self.state = TimerState::Idle;
        }
    }

    /// Cancels a pending countdown. Returns whether one was cancelled.
    pub fn cancel(&mut self) -> bool {
        match self.state {
            TimerState::CountdownToMove { .. } | TimerState::CountdownToClose { .. } => {
                self.state = TimerState::Idle;
                true
            }
            _ => false,
        }
    }
}
