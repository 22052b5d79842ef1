use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use rocket::serde::{Deserialize, Serialize};
use schemars::JsonSchema;
use serde_json::Value;
use std::borrow::Cow;
use uuid::Uuid;
use validator::{ValidationError, ValidationErrors};

/// A persisted focus session.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct FocusTime {
    pub id: Uuid,
    pub user_id: Uuid,
    pub time_from: DateTime<Utc>,
    pub time_to: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FocusTime {
    /// Whole minutes between start and end, truncated.
    pub fn duration_minutes(&self) -> i64 {
        (self.time_to - self.time_from).num_minutes()
    }
}

/// Body of `POST /focus-time`. Fields stay untyped so that coercion failures can be reported per
/// field instead of failing the whole payload.
#[derive(Deserialize, Debug, Default, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FocusTimeRequest {
    /// ISO 8601 timestamp, `YYYY-MM-DD` date or epoch milliseconds.
    #[serde(default)]
    pub time_from: Option<Value>,
    /// ISO 8601 timestamp, `YYYY-MM-DD` date or epoch milliseconds.
    #[serde(default)]
    pub time_to: Option<Value>,
}

/// Coerced and range-checkable form of [`FocusTimeRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusTimeInput {
    pub time_from: DateTime<Utc>,
    pub time_to: DateTime<Utc>,
}

impl FocusTimeInput {
    /// `time_to` equal to `time_from` is a valid, zero-length session.
    pub fn is_reversed(&self) -> bool {
        self.time_to < self.time_from
    }
}

impl FocusTimeRequest {
    pub fn parse(&self, tz: Tz) -> Result<FocusTimeInput, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let time_from = coerce_field(&mut errors, "timeFrom", self.time_from.as_ref(), tz);
        let time_to = coerce_field(&mut errors, "timeTo", self.time_to.as_ref(), tz);

        match (time_from, time_to) {
            (Some(time_from), Some(time_to)) => Ok(FocusTimeInput { time_from, time_to }),
            _ => Err(errors),
        }
    }
}

/// Parses the `date` query parameter shared by the day and month endpoints.
pub fn parse_date_query(date: Option<&str>, tz: Tz) -> Result<DateTime<Utc>, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let value = date.map(|d| Value::String(d.to_string()));
    coerce_field(&mut errors, "date", value.as_ref(), tz).ok_or(errors)
}

fn coerce_field(errors: &mut ValidationErrors, field: &'static str, value: Option<&Value>, tz: Tz) -> Option<DateTime<Utc>> {
    let result = match value {
        None | Some(Value::Null) => Err(field_error("required", "Required")),
        Some(value) => coerce_timestamp(value, tz).ok_or_else(|| field_error("invalid_date", "Invalid date")),
    };

    match result {
        Ok(timestamp) => Some(timestamp),
        Err(error) => {
            errors.add(field, error);
            None
        }
    }
}

fn field_error(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

/// Lenient timestamp coercion.
///
/// Accepts RFC 3339 strings, naive date-times and bare dates (both read as wall-clock time in
/// `tz`) and JSON numbers holding milliseconds since the Unix epoch.
pub fn coerce_timestamp(value: &Value, tz: Tz) -> Option<DateTime<Utc>> {
    match value {
        Value::String(raw) => parse_timestamp_str(raw.trim(), tz),
        Value::Number(number) => {
            let millis = number.as_i64().or_else(|| number.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))?;
            DateTime::from_timestamp_millis(millis)
        }
        _ => None,
    }
}

fn parse_timestamp_str(raw: &str, tz: Tz) -> Option<DateTime<Utc>> {
    if raw.is_empty() {
        return None;
    }

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return local_to_utc(naive, tz);
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().map(|date| local_midnight(date, tz))
}

fn local_to_utc(naive: NaiveDateTime, tz: Tz) -> Option<DateTime<Utc>> {
    tz.from_local_datetime(&naive).earliest().map(|local| local.with_timezone(&Utc))
}

/// Start of `date` in `tz`. Zones that skip midnight on a DST change start the day at the first
/// existing wall-clock instant.
pub fn local_midnight(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let midnight = date.and_time(chrono::NaiveTime::MIN);
    (0..=3)
        .find_map(|hour| local_to_utc(midnight + chrono::Duration::hours(hour), tz))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

/// Half-open `[start, end)` query window in UTC; `end` is the first instant of the next period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn contains(&self, instant: &DateTime<Utc>) -> bool {
        self.start <= *instant && *instant < self.end
    }
}

/// Number of sessions started on one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct DayCount {
    pub year: i32,
    pub month: i32,
    pub day: i32,
    pub count: i64,
}

impl DayCount {
    pub fn key(&self) -> (i32, i32, i32) {
        (self.year, self.month, self.day)
    }
}

/// Extracts the `(year, month, day)` of an instant as seen in `tz`.
pub fn calendar_key(instant: &DateTime<Utc>, tz: Tz) -> (i32, i32, i32) {
    let local = instant.with_timezone(&tz);
    (local.year(), local.month() as i32, local.day() as i32)
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FocusTimeResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub time_from: DateTime<Utc>,
    pub time_to: DateTime<Utc>,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&FocusTime> for FocusTimeResponse {
    fn from(focus_time: &FocusTime) -> Self {
        Self {
            id: focus_time.id,
            time_from: focus_time.time_from,
            time_to: focus_time.time_to,
            user_id: focus_time.user_id,
            created_at: focus_time.created_at,
            updated_at: focus_time.updated_at,
        }
    }
}

/// One entry of `GET /focus-time/metrics`: `{"_id": [year, month, day], "count": n}`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, JsonSchema)]
pub struct DayCountResponse {
    #[serde(rename = "_id")]
    pub id: [i32; 3],
    pub count: i64,
}

impl From<&DayCount> for DayCountResponse {
    fn from(day: &DayCount) -> Self {
        Self {
            id: [day.year, day.month, day.day],
            count: day.count,
        }
    }
}

impl DayCountResponse {
    pub fn date(&self) -> Option<NaiveDate> {
        let [year, month, day] = self.id;
        NaiveDate::from_ymd_opt(year, u32::try_from(month).ok()?, u32::try_from(day).ok()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::app_error::validation_messages;
    use serde_json::json;

    fn utc(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn coerces_rfc3339_with_offset() {
        let parsed = coerce_timestamp(&json!("2024-02-01T09:00:00-03:00"), Tz::UTC);
        assert_eq!(parsed, Some(utc("2024-02-01T12:00:00Z")));
    }

    #[test]
    fn coerces_epoch_millis() {
        let parsed = coerce_timestamp(&json!(1_706_778_000_000_i64), Tz::UTC);
        assert_eq!(parsed, Some(utc("2024-02-01T09:00:00Z")));
    }

    #[test]
    fn bare_date_is_local_midnight() {
        let parsed = coerce_timestamp(&json!("2024-02-01"), Tz::America__Sao_Paulo);
        assert_eq!(parsed, Some(utc("2024-02-01T03:00:00Z")));
    }

    #[test]
    fn naive_datetime_uses_service_zone() {
        let parsed = coerce_timestamp(&json!("2024-07-01T10:30:00"), Tz::Europe__Lisbon);
        assert_eq!(parsed, Some(utc("2024-07-01T09:30:00Z")));
    }

    #[test]
    fn rejects_garbage_and_non_scalar_values() {
        assert_eq!(coerce_timestamp(&json!("not-a-date"), Tz::UTC), None);
        assert_eq!(coerce_timestamp(&json!(""), Tz::UTC), None);
        assert_eq!(coerce_timestamp(&json!(true), Tz::UTC), None);
        assert_eq!(coerce_timestamp(&json!({ "at": "2024-02-01" }), Tz::UTC), None);
    }

    #[test]
    fn request_reports_every_failing_field() {
        let request = FocusTimeRequest {
            time_from: None,
            time_to: Some(json!("yesterday-ish")),
        };
        let errors = request.parse(Tz::UTC).unwrap_err();
        assert_eq!(validation_messages(&errors), vec!["timeFrom: Required", "timeTo: Invalid date"]);
    }

    #[test]
    fn null_counts_as_missing() {
        let request: FocusTimeRequest = serde_json::from_value(json!({ "timeFrom": null, "timeTo": "2024-02-01T09:25:00Z" })).unwrap();
        let errors = request.parse(Tz::UTC).unwrap_err();
        assert_eq!(validation_messages(&errors), vec!["timeFrom: Required"]);
    }

    #[test]
    fn request_parses_camel_case_body() {
        let request: FocusTimeRequest = serde_json::from_value(json!({
            "timeFrom": "2024-02-01T09:00:00Z",
            "timeTo": "2024-02-01T09:25:00Z"
        }))
        .unwrap();
        let input = request.parse(Tz::UTC).unwrap();
        assert_eq!(input.time_from, utc("2024-02-01T09:00:00Z"));
        assert_eq!(input.time_to, utc("2024-02-01T09:25:00Z"));
        assert!(!input.is_reversed());
    }

    #[test]
    fn equal_bounds_are_not_reversed() {
        let at = utc("2024-02-01T09:00:00Z");
        assert!(!FocusTimeInput { time_from: at, time_to: at }.is_reversed());
        assert!(
            FocusTimeInput {
                time_from: at,
                time_to: at - chrono::Duration::seconds(1)
            }
            .is_reversed()
        );
    }

    #[test]
    fn date_query_requires_a_value() {
        let errors = parse_date_query(None, Tz::UTC).unwrap_err();
        assert_eq!(validation_messages(&errors), vec!["date: Required"]);

        let errors = parse_date_query(Some("banana"), Tz::UTC).unwrap_err();
        assert_eq!(validation_messages(&errors), vec!["date: Invalid date"]);
    }

    #[test]
    fn local_midnight_skips_dst_gap() {
        // Sao Paulo jumped from 00:00 to 01:00 on 2018-11-04
        let date = NaiveDate::from_ymd_opt(2018, 11, 4).unwrap();
        assert_eq!(local_midnight(date, Tz::America__Sao_Paulo), utc("2018-11-04T03:00:00Z"));
    }

    #[test]
    fn calendar_key_uses_local_day() {
        let late_evening = utc("2024-02-02T01:30:00Z");
        assert_eq!(calendar_key(&late_evening, Tz::UTC), (2024, 2, 2));
        assert_eq!(calendar_key(&late_evening, Tz::America__Sao_Paulo), (2024, 2, 1));
    }

    #[test]
    fn response_uses_client_field_names() {
        let focus_time = FocusTime {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            time_from: utc("2024-02-01T09:00:00Z"),
            time_to: utc("2024-02-01T09:25:00Z"),
            created_at: utc("2024-02-01T09:25:01Z"),
            updated_at: utc("2024-02-01T09:25:01Z"),
        };
        let value = serde_json::to_value(FocusTimeResponse::from(&focus_time)).unwrap();
        for key in ["_id", "timeFrom", "timeTo", "userId", "createdAt", "updatedAt"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert_eq!(focus_time.duration_minutes(), 25);
    }

    #[test]
    fn day_count_serializes_as_tuple_key() {
        let day = DayCount {
            year: 2024,
            month: 2,
            day: 1,
            count: 3,
        };
        let value = serde_json::to_value(DayCountResponse::from(&day)).unwrap();
        assert_eq!(value, json!({ "_id": [2024, 2, 1], "count": 3 }));
        assert_eq!(DayCountResponse::from(&day).date(), NaiveDate::from_ymd_opt(2024, 2, 1));
    }
    #[test]
    fn time_range_excludes_its_end() {
        let range = TimeRange {
            start: utc("2024-02-29T00:00:00Z"),
            end: utc("2024-03-01T00:00:00Z"),
        };
        assert!(range.contains(&utc("2024-02-29T00:00:00Z")));
        assert!(range.contains(&utc("2024-02-29T23:59:59.999999Z")));
        assert!(!range.contains(&utc("2024-03-01T00:00:00Z")));
    }
}
