use crate::timer::countdown::Countdown;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Durations move in steps of this many minutes.
pub const MINUTE_STEP: u32 = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimerPhase {
    #[default]
    Paused,
    Focus,
    Rest,
}

impl TimerPhase {
    pub fn title(&self) -> &'static str {
        match self {
            TimerPhase::Paused => "Paused",
            TimerPhase::Focus => "In focus",
            TimerPhase::Rest => "Resting",
        }
    }
}

impl fmt::Display for TimerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Which of the two configurable durations an adjustment applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    Focus,
    Rest,
}

/// A finished focus interval, serialized exactly as the `POST /focus-time` body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedSession {
    pub time_from: DateTime<Utc>,
    pub time_to: DateTime<Utc>,
}

impl CompletedSession {
    pub fn duration_minutes(&self) -> i64 {
        (self.time_to - self.time_from).num_minutes()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimerError {
    #[error("cannot {action} while {phase}")]
    InvalidTransition { action: &'static str, phase: TimerPhase },
    #[error("focus and rest durations must both be greater than zero")]
    ZeroDuration,
    #[error("durations can only be changed while paused")]
    NotPaused,
}

/// What a front end shows: the phase title and an `MM:SS` clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerDisplay {
    pub title: &'static str,
    pub clock: String,
}

impl fmt::Display for TimerDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.title, self.clock)
    }
}

/// Pomodoro cycle: `Paused -> Focus <-> Rest`, with `cancel` returning to `Paused` from anywhere.
///
/// Every completed focus interval yields exactly one [`CompletedSession`], either when its
/// countdown runs out (`tick`) or when the user moves on to rest early (`begin_rest`).
#[derive(Debug, Clone)]
pub struct FocusTimer {
    phase: TimerPhase,
    focus_minutes: u32,
    rest_minutes: u32,
    focus: Countdown,
    rest: Countdown,
    captured_focus: TimeDelta,
    interval_start: Option<DateTime<Utc>>,
    submitted: bool,
}

impl Default for FocusTimer {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl FocusTimer {
    pub fn new(focus_minutes: u32, rest_minutes: u32) -> Self {
        Self {
            phase: TimerPhase::Paused,
            focus_minutes,
            rest_minutes,
            focus: Countdown::default(),
            rest: Countdown::default(),
            captured_focus: TimeDelta::zero(),
            interval_start: None,
            submitted: false,
        }
    }

    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    pub fn focus_minutes(&self) -> u32 {
        self.focus_minutes
    }

    pub fn rest_minutes(&self) -> u32 {
        self.rest_minutes
    }

    pub fn interval_start(&self) -> Option<DateTime<Utc>> {
        self.interval_start
    }

    pub fn increase(&mut self, interval: Interval) -> Result<u32, TimerError> {
        self.adjust(interval, |minutes| minutes.saturating_add(MINUTE_STEP))
    }

    /// Saturates at zero.
    pub fn decrease(&mut self, interval: Interval) -> Result<u32, TimerError> {
        self.adjust(interval, |minutes| minutes.saturating_sub(MINUTE_STEP))
    }

    fn adjust(&mut self, interval: Interval, step: impl FnOnce(u32) -> u32) -> Result<u32, TimerError> {
        if self.phase != TimerPhase::Paused {
            return Err(TimerError::NotPaused);
        }

        let minutes = match interval {
            Interval::Focus => &mut self.focus_minutes,
            Interval::Rest => &mut self.rest_minutes,
        };
        *minutes = step(*minutes);
        Ok(*minutes)
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), TimerError> {
        self.expect_phase(TimerPhase::Paused, "start")?;
        if self.focus_minutes == 0 || self.rest_minutes == 0 {
            return Err(TimerError::ZeroDuration);
        }

        self.rest.pause(now);
        self.focus.arm(now, minutes(self.focus_minutes));
        self.begin_interval(now);
        Ok(())
    }

    /// Ends the focus interval early (or after expiry) and starts resting.
    ///
    /// Returns the session to submit unless `tick` already reported it.
    pub fn begin_rest(&mut self, now: DateTime<Utc>) -> Result<Option<CompletedSession>, TimerError> {
        self.expect_phase(TimerPhase::Focus, "rest")?;

        let expired = self.focus.is_expired(now);
        let time_to = match self.focus.deadline() {
            Some(deadline) if expired => deadline,
            _ => now,
        };
        let session = self.complete(time_to);

        self.captured_focus = if expired { TimeDelta::zero() } else { self.focus.remaining(now) };
        self.focus.pause(now);
        self.rest.arm(now, minutes(self.rest_minutes));
        self.phase = TimerPhase::Rest;
        Ok(session)
    }

    /// Reports the focus interval once its countdown has run out. The phase stays `Focus`.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<CompletedSession> {
        if self.phase != TimerPhase::Focus || !self.focus.is_expired(now) {
            return None;
        }
        let deadline = self.focus.deadline()?;
        self.complete(deadline)
    }

    /// Back to focus after resting, continuing the interrupted interval when time was left over.
    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<(), TimerError> {
        self.expect_phase(TimerPhase::Rest, "resume")?;

        self.rest.pause(now);
        let duration = if self.captured_focus > TimeDelta::zero() {
            self.captured_focus
        } else {
            minutes(self.focus_minutes)
        };
        self.focus.arm(now, duration);
        self.captured_focus = TimeDelta::zero();
        self.begin_interval(now);
        Ok(())
    }

    /// Abandons the cycle. Never produces a session.
    pub fn cancel(&mut self) {
        *self = Self::default();
    }

    pub fn is_rest_over(&self, now: DateTime<Utc>) -> bool {
        self.phase == TimerPhase::Rest && self.rest.is_expired(now)
    }

    pub fn remaining(&self, now: DateTime<Utc>) -> TimeDelta {
        match self.phase {
            TimerPhase::Paused => minutes(self.focus_minutes),
            TimerPhase::Focus => self.focus.remaining(now),
            TimerPhase::Rest => self.rest.remaining(now),
        }
    }

    pub fn display(&self, now: DateTime<Utc>) -> TimerDisplay {
        TimerDisplay {
            title: self.phase.title(),
            clock: format_clock(self.remaining(now)),
        }
    }

    fn begin_interval(&mut self, now: DateTime<Utc>) {
        self.interval_start = Some(now);
        self.submitted = false;
        self.phase = TimerPhase::Focus;
    }

    fn complete(&mut self, time_to: DateTime<Utc>) -> Option<CompletedSession> {
        if self.submitted {
            return None;
        }
        let time_from = self.interval_start?;
        self.submitted = true;
        Some(CompletedSession { time_from, time_to })
    }

    fn expect_phase(&self, expected: TimerPhase, action: &'static str) -> Result<(), TimerError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(TimerError::InvalidTransition { action, phase: self.phase })
        }
    }
}

fn minutes(value: u32) -> TimeDelta {
    TimeDelta::minutes(i64::from(value))
}

/// `MM:SS`, minutes unbounded.
pub fn format_clock(remaining: TimeDelta) -> String {
    let seconds = remaining.num_seconds().max(0);
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
