use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::models::focus_time::{DayCount, FocusTime, FocusTimeInput, TimeRange};
use chrono_tz::Tz;
use uuid::Uuid;

#[async_trait::async_trait]
pub trait FocusTimeRepository {
    async fn create_focus_time(&self, input: &FocusTimeInput, user_id: &Uuid) -> Result<FocusTime, AppError>;
    /// Sessions of `user_id` whose `time_from` lies in `range`, oldest first.
    async fn list_focus_times(&self, range: &TimeRange, user_id: &Uuid) -> Result<Vec<FocusTime>, AppError>;
    /// Per-day session counts within `range`, days taken in `tz` and ordered by (year, month, day).
    async fn count_focus_times_per_day(&self, range: &TimeRange, user_id: &Uuid, tz: Tz) -> Result<Vec<DayCount>, AppError>;
}

#[async_trait::async_trait]
impl FocusTimeRepository for PostgresRepository {
    async fn create_focus_time(&self, input: &FocusTimeInput, user_id: &Uuid) -> Result<FocusTime, AppError> {
        let focus_time = sqlx::query_as::<_, FocusTime>(
            r#"
            INSERT INTO focus_time (user_id, time_from, time_to)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, time_from, time_to, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(input.time_from)
        .bind(input.time_to)
        .fetch_one(&self.pool)
        .await?;

        Ok(focus_time)
    }

    async fn list_focus_times(&self, range: &TimeRange, user_id: &Uuid) -> Result<Vec<FocusTime>, AppError> {
        let focus_times = sqlx::query_as::<_, FocusTime>(
            r#"
            SELECT id, user_id, time_from, time_to, created_at, updated_at
            FROM focus_time
            WHERE user_id = $1
              AND time_from >= $2
              AND time_from < $3
            ORDER BY time_from ASC, id ASC
            "#,
        )
        .bind(user_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await?;

        Ok(focus_times)
    }

    async fn count_focus_times_per_day(&self, range: &TimeRange, user_id: &Uuid, tz: Tz) -> Result<Vec<DayCount>, AppError> {
        let rows = sqlx::query_as::<_, DayCount>(
            r#"
            WITH local_days AS (
                SELECT (time_from AT TIME ZONE $4) AS local_from
                FROM focus_time
                WHERE user_id = $1
                  AND time_from >= $2
                  AND time_from < $3
            )
            SELECT EXTRACT(YEAR FROM local_from)::int4  AS year,
                   EXTRACT(MONTH FROM local_from)::int4 AS month,
                   EXTRACT(DAY FROM local_from)::int4   AS day,
                   COUNT(*)                             AS count
            FROM local_days
            GROUP BY 1, 2, 3
            ORDER BY 1, 2, 3
            "#,
        )
        .bind(user_id)
        .bind(range.start)
        .bind(range.end)
        .bind(tz.name())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
