use crate::database::focus_time::FocusTimeRepository;
use crate::error::app_error::AppError;
use crate::models::focus_time::{DayCount, FocusTime, FocusTimeInput, FocusTimeRequest, TimeRange, calendar_key};
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde_json::json;
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::sync::Mutex;
use uuid::Uuid;

pub fn utc(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw).expect("valid RFC 3339 timestamp").with_timezone(&Utc)
}

pub fn focus_request(time_from: &str, time_to: &str) -> FocusTimeRequest {
    FocusTimeRequest {
        time_from: Some(json!(time_from)),
        time_to: Some(json!(time_to)),
    }
}

/// In-memory stand-in for the `focus_time` table.
#[derive(Default)]
pub struct MockRepository {
    rows: Mutex<Vec<FocusTime>>,
}

impl MockRepository {
    pub fn is_empty(&self) -> bool {
        self.rows.lock().unwrap().is_empty()
    }
}

#[async_trait::async_trait]
impl FocusTimeRepository for MockRepository {
    async fn create_focus_time(&self, input: &FocusTimeInput, user_id: &Uuid) -> Result<FocusTime, AppError> {
        let now = Utc::now();
        let focus_time = FocusTime {
            id: Uuid::new_v4(),
            user_id: *user_id,
            time_from: input.time_from,
            time_to: input.time_to,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(focus_time.clone());
        Ok(focus_time)
    }

    async fn list_focus_times(&self, range: &TimeRange, user_id: &Uuid) -> Result<Vec<FocusTime>, AppError> {
        let mut matching: Vec<FocusTime> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.user_id == *user_id && range.contains(&f.time_from))
            .cloned()
            .collect();
        matching.sort_by_key(|f| (f.time_from, f.id));
        Ok(matching)
    }

    async fn count_focus_times_per_day(&self, range: &TimeRange, user_id: &Uuid, tz: Tz) -> Result<Vec<DayCount>, AppError> {
        let mut per_day: BTreeMap<(i32, i32, i32), i64> = BTreeMap::new();
        for focus_time in self.rows.lock().unwrap().iter() {
            if focus_time.user_id == *user_id && range.contains(&focus_time.time_from) {
                *per_day.entry(calendar_key(&focus_time.time_from, tz)).or_default() += 1;
            }
        }

        Ok(per_day
            .into_iter()
            .map(|((year, month, day), count)| DayCount { year, month, day, count })
            .collect())
    }
}

/// Inserts a user plus an unexpired session and returns `(user_id, session_id)`.
/// Only usable by tests that run against a real database.
pub async fn seed_user_session(pool: &PgPool) -> (Uuid, Uuid) {
    let email = format!("focus.{}@example.com", Uuid::new_v4());
    let user_id: Uuid = sqlx::query_scalar("INSERT INTO users (email) VALUES ($1) RETURNING id")
        .bind(&email)
        .fetch_one(pool)
        .await
        .expect("insert user");

    let session_id: Uuid = sqlx::query_scalar("INSERT INTO user_session (user_id, expires_at) VALUES ($1, $2) RETURNING id")
        .bind(user_id)
        .bind(Utc::now() + Duration::hours(1))
        .fetch_one(pool)
        .await
        .expect("insert session");

    (user_id, session_id)
}
