use crate::database::focus_time::FocusTimeRepository;
use crate::error::app_error::AppError;
use crate::models::focus_time::{DayCount, FocusTime, FocusTimeRequest, TimeRange, local_midnight, parse_date_query};
use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{debug, info};
use uuid::Uuid;

/// Validation, calendar bounds and persistence of focus sessions for one user at a time.
pub struct FocusTimeService<'a, R: FocusTimeRepository + Sync + ?Sized> {
    repository: &'a R,
    time_zone: Tz,
}

impl<'a, R: FocusTimeRepository + Sync + ?Sized> FocusTimeService<'a, R> {
    pub fn new(repository: &'a R, time_zone: Tz) -> Self {
        Self { repository, time_zone }
    }

    pub async fn create(&self, request: &FocusTimeRequest, user_id: &Uuid) -> Result<FocusTime, AppError> {
        let input = request.parse(self.time_zone)?;
        if input.is_reversed() {
            return Err(AppError::InvalidRange);
        }

        let focus_time = self.repository.create_focus_time(&input, user_id).await?;
        info!(
            focus_time_id = %focus_time.id,
            user_id = %user_id,
            minutes = focus_time.duration_minutes(),
            "focus session recorded"
        );
        Ok(focus_time)
    }

    pub async fn list_by_day(&self, date: Option<&str>, user_id: &Uuid) -> Result<Vec<FocusTime>, AppError> {
        let date = parse_date_query(date, self.time_zone)?;
        let range = day_bounds(&date, self.time_zone);
        debug!(start = %range.start, end = %range.end, "listing focus sessions for day");
        self.repository.list_focus_times(&range, user_id).await
    }

    pub async fn metrics_by_month(&self, date: Option<&str>, user_id: &Uuid) -> Result<Vec<DayCount>, AppError> {
        let date = parse_date_query(date, self.time_zone)?;
        let range = month_bounds(&date, self.time_zone);
        debug!(start = %range.start, end = %range.end, "aggregating focus sessions for month");
        self.repository.count_focus_times_per_day(&range, user_id, self.time_zone).await
    }
}

/// Local day containing `date`, from its midnight up to the next one.
pub fn day_bounds(date: &DateTime<Utc>, tz: Tz) -> TimeRange {
    let day = date.with_timezone(&tz).date_naive();
    let next = day.succ_opt().unwrap_or(NaiveDate::MAX);
    TimeRange {
        start: local_midnight(day, tz),
        end: local_midnight(next, tz),
    }
}

/// Local month containing `date`, up to the first instant of the following month.
pub fn month_bounds(date: &DateTime<Utc>, tz: Tz) -> TimeRange {
    let day = date.with_timezone(&tz).date_naive();
    let first = day.with_day(1).unwrap_or(day);
    let next = first.checked_add_months(Months::new(1)).unwrap_or(NaiveDate::MAX);
    TimeRange {
        start: local_midnight(first, tz),
        end: local_midnight(next, tz),
    }
}
