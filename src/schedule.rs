//! Daily time-of-day triggers.
//!
//! Registering triggers with the operating system is someone else's job.
//! This module only knows when a trigger is due.

use crate::error::ConfigError;
use chrono::{NaiveDateTime, NaiveTime, Timelike};
use std::str::FromStr;

/// A daily `HH:MM` trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScheduleTrigger {
    hour: u8,
    minute: u8,
}

impl ScheduleTrigger {
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// Whether `time` falls within this trigger's minute.
    pub fn matches(&self, time: NaiveTime) -> bool {
        time.hour() == u32::from(self.hour) && time.minute() == u32::from(self.minute)
    }
}

impl FromStr for ScheduleTrigger {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidScheduleTime(s.to_string());
        let (hour, minute) = s.trim().split_once(':').ok_or_else(invalid)?;
        if minute.len() != 2 || hour.is_empty() || hour.len() > 2 {
            return Err(invalid());
        }
        let hour: u8 = hour.parse().map_err(|_| invalid())?;
        let minute: u8 = minute.parse().map_err(|_| invalid())?;
        Self::new(hour, minute).ok_or_else(invalid)
    }
}

impl std::fmt::Display for ScheduleTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// A sorted, duplicate-free set of triggers that fires each one at most once
/// per matching minute.
#[derive(Debug, Clone, Default)]
pub struct ScheduleBook {
    triggers: Vec<ScheduleTrigger>,
    last_fired: Option<NaiveDateTime>,
}

impl ScheduleBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses every `HH:MM` string.
    pub fn parse<S: AsRef<str>>(times: &[S]) -> Result<Self, ConfigError> {
        let mut book = Self::new();
        for time in times {
            book.add(time.as_ref().parse()?);
        }
        Ok(book)
    }

    /// Adds a trigger. Returns false if it was already present.
    pub fn add(&mut self, trigger: ScheduleTrigger) -> bool {
        match self.triggers.binary_search(&trigger) {
            Ok(_) => false,
            Err(position) => {
                self.triggers.insert(position, trigger);
                true
            }
        }
    }

    /// Removes a trigger. Returns false if it was not present.
    pub fn remove(&mut self, trigger: ScheduleTrigger) -> bool {
        match self.triggers.binary_search(&trigger) {
            Ok(position) => {
                self.triggers.remove(position);
                true
            }
            Err(_) => false,
        }
    }

    pub fn triggers(&self) -> &[ScheduleTrigger] {
        &self.triggers
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    /// Returns the trigger due at `now`, unless it already fired this
    /// minute.
    pub fn due(&mut self, now: NaiveDateTime) -> Option<ScheduleTrigger> {
        let minute = now.with_second(0)?.with_nanosecond(0)?;
        if self.last_fired == Some(minute) {
            return None;
        }
        let trigger = self
            .triggers
            .iter()
            .copied()
            .find(|t| t.matches(now.time()))?;
        self.last_fired = Some(minute);
        Some(trigger)
    }
}
