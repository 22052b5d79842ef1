use crate::models::focus_time::{DayCountResponse, FocusTimeResponse};
use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use chrono_tz::Tz;
use std::collections::BTreeSet;
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRow {
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub minutes: i64,
}

/// Sessions of one day as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyMetrics {
    pub date: NaiveDate,
    pub rows: Vec<SessionRow>,
    /// Sum of each session's whole minutes.
    pub total_minutes: i64,
}

impl DailyMetrics {
    pub fn from_sessions(date: NaiveDate, sessions: &[FocusTimeResponse], tz: Tz) -> Self {
        let rows: Vec<SessionRow> = sessions
            .iter()
            .map(|session| SessionRow {
                start: session.time_from.with_timezone(&tz).time(),
                end: session.time_to.with_timezone(&tz).time(),
                minutes: (session.time_to - session.time_from).num_minutes(),
            })
            .collect();
        let total_minutes = rows.iter().map(|row| row.minutes).sum();

        Self { date, rows, total_minutes }
    }

    pub fn render(&self) -> String {
        let mut out = format!("{}\n", self.date.format("%A, %d %B %Y"));
        if self.rows.is_empty() {
            out.push_str("No focus sessions.\n");
        }
        for row in &self.rows {
            let _ = writeln!(out, "{} - {}  {:>3} min", row.start.format("%H:%M"), row.end.format("%H:%M"), row.minutes);
        }
        let _ = writeln!(out, "Total: {} min", self.total_minutes);
        out
    }
}

/// Month aggregate: how many cycles were completed and on which days.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyMetrics {
    pub year: i32,
    pub month: u32,
    pub total_sessions: i64,
    pub marked_days: BTreeSet<u32>,
}

impl MonthlyMetrics {
    /// `days` as returned by the metrics endpoint; entries outside the month of `date` are ignored.
    pub fn from_counts(date: NaiveDate, days: &[DayCountResponse]) -> Self {
        let (year, month) = (date.year(), date.month());
        let mut total_sessions = 0;
        let mut marked_days = BTreeSet::new();

        for day in days {
            let Some(day_date) = day.date() else { continue };
            if day_date.year() != year || day_date.month() != month {
                continue;
            }
            total_sessions += day.count;
            marked_days.insert(day_date.day());
        }

        Self {
            year,
            month,
            total_sessions,
            marked_days,
        }
    }

    pub fn is_marked(&self, day: u32) -> bool {
        self.marked_days.contains(&day)
    }

    /// Monday-first calendar; focused days carry a `*`.
    pub fn render_grid(&self) -> String {
        let Some(first) = NaiveDate::from_ymd_opt(self.year, self.month, 1) else {
            return String::new();
        };
        let days_in_month = days_in_month(first);

        let mut out = format!("{}\n", first.format("%B %Y"));
        out.push_str(" Mo  Tu  We  Th  Fr  Sa  Su\n");

        let offset = first.weekday().num_days_from_monday() as usize;
        let mut line = "    ".repeat(offset);
        for day in 1..=days_in_month {
            let marker = if self.is_marked(day) { '*' } else { ' ' };
            let _ = write!(line, "{:>3}{}", day, marker);

            let weekday = first.with_day(day).map(|d| d.weekday());
            if weekday == Some(Weekday::Sun) || day == days_in_month {
                out.push_str(line.trim_end());
                out.push('\n');
                line.clear();
            }
        }

        let _ = writeln!(out, "Cycles: {}", self.total_sessions);
        out
    }
}

fn days_in_month(first: NaiveDate) -> u32 {
    let next = if first.month() == 12 {
        NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
    };
    next.and_then(|n| n.pred_opt()).map(|last| last.day()).unwrap_or(28)
}
