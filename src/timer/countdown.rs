use chrono::{DateTime, TimeDelta, Utc};

/// A countdown toward an absolute deadline that can be paused and re-armed.
///
/// All operations take the current instant explicitly so callers (and tests) own the clock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Countdown {
    deadline: Option<DateTime<Utc>>,
    paused_remaining: Option<TimeDelta>,
}

impl Countdown {
    /// Starts counting `duration` from `now`, replacing any previous deadline or paused remainder.
    pub fn arm(&mut self, now: DateTime<Utc>, duration: TimeDelta) {
        self.deadline = Some(now + duration.max(TimeDelta::zero()));
        self.paused_remaining = None;
    }

    /// Stops the clock and keeps whatever was left. No-op when not running.
    pub fn pause(&mut self, now: DateTime<Utc>) {
        if self.deadline.is_some() {
            self.paused_remaining = Some(self.remaining(now));
            self.deadline = None;
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
        self.paused_remaining = None;
    }

    pub fn remaining(&self, now: DateTime<Utc>) -> TimeDelta {
        match (self.deadline, self.paused_remaining) {
            (Some(deadline), _) => (deadline - now).max(TimeDelta::zero()),
            (None, Some(remaining)) => remaining,
            (None, None) => TimeDelta::zero(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.deadline.is_some_and(|deadline| now >= deadline)
    }

    pub fn is_running(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap() + TimeDelta::seconds(seconds)
    }

    #[test]
    fn idle_countdown_has_nothing_left() {
        let countdown = Countdown::default();
        assert_eq!(countdown.remaining(at(0)), TimeDelta::zero());
        assert!(!countdown.is_expired(at(0)));
        assert!(!countdown.is_running());
    }

    #[test]
    fn armed_countdown_expires_at_deadline() {
        let mut countdown = Countdown::default();
        countdown.arm(at(0), TimeDelta::minutes(25));

        assert_eq!(countdown.remaining(at(60)), TimeDelta::minutes(24));
        assert!(!countdown.is_expired(at(25 * 60 - 1)));
        assert!(countdown.is_expired(at(25 * 60)));
        assert_eq!(countdown.remaining(at(30 * 60)), TimeDelta::zero());
        assert_eq!(countdown.deadline(), Some(at(25 * 60)));
    }

    #[test]
    fn pause_keeps_the_remainder() {
        let mut countdown = Countdown::default();
        countdown.arm(at(0), TimeDelta::minutes(5));
        countdown.pause(at(90));

        assert!(!countdown.is_running());
        assert_eq!(countdown.remaining(at(1_000)), TimeDelta::seconds(210));
        assert!(!countdown.is_expired(at(1_000)));
    }

    #[test]
    fn arming_replaces_previous_deadline() {
        let mut countdown = Countdown::default();
        countdown.arm(at(0), TimeDelta::minutes(5));
        countdown.pause(at(60));
        countdown.arm(at(120), TimeDelta::minutes(1));

        assert_eq!(countdown.deadline(), Some(at(180)));
        assert_eq!(countdown.remaining(at(150)), TimeDelta::seconds(30));
    }

    #[test]
    fn cancel_clears_everything() {
        let mut countdown = Countdown::default();
        countdown.arm(at(0), TimeDelta::minutes(5));
        countdown.pause(at(60));
        countdown.cancel();

        assert_eq!(countdown, Countdown::default());
    }
}
