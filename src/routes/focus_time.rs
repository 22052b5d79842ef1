use crate::auth::CurrentUser;
use crate::config::FocusSettings;
use crate::database::postgres_repository::PostgresRepository;
use crate::error::app_error::AppError;
use crate::error::json::JsonBody;
use crate::models::focus_time::{DayCountResponse, FocusTimeRequest, FocusTimeResponse};
use crate::service::focus_time::FocusTimeService;
use rocket::response::status::Created;
use rocket::serde::json::Json;
use rocket::{State, get, post};
use rocket_okapi::openapi;
use sqlx::PgPool;

/// Record a completed focus session for the current user
#[openapi(tag = "Focus Time")]
#[post("/", data = "<payload>")]
pub async fn create_focus_time(
    pool: &State<PgPool>,
    settings: &State<FocusSettings>,
    current_user: CurrentUser,
    payload: JsonBody<FocusTimeRequest>,
) -> Result<Created<Json<FocusTimeResponse>>, AppError> {
    let repo = PostgresRepository { pool: pool.inner().clone() };
    let service = FocusTimeService::new(&repo, settings.time_zone);
    let focus_time = service.create(&payload, &current_user.id).await?;

    let day = focus_time.time_from.with_timezone(&settings.time_zone).date_naive();
    Ok(Created::new(format!("?date={}", day.format("%Y-%m-%d"))).body(Json(FocusTimeResponse::from(&focus_time))))
}

/// List the current user's sessions that started on the calendar day of `date`
#[openapi(tag = "Focus Time")]
#[get("/?<date>")]
pub async fn list_focus_times(
    pool: &State<PgPool>,
    settings: &State<FocusSettings>,
    current_user: CurrentUser,
    date: Option<&str>,
) -> Result<Json<Vec<FocusTimeResponse>>, AppError> {
    let repo = PostgresRepository { pool: pool.inner().clone() };
    let service = FocusTimeService::new(&repo, settings.time_zone);
    let focus_times = service.list_by_day(date, &current_user.id).await?;
    Ok(Json(focus_times.iter().map(FocusTimeResponse::from).collect()))
}

/// Per-day session counts for the calendar month of `date`
#[openapi(tag = "Focus Time")]
#[get("/metrics?<date>")]
pub async fn get_focus_time_metrics(
    pool: &State<PgPool>,
    settings: &State<FocusSettings>,
    current_user: CurrentUser,
    date: Option<&str>,
) -> Result<Json<Vec<DayCountResponse>>, AppError> {
    let repo = PostgresRepository { pool: pool.inner().clone() };
    let service = FocusTimeService::new(&repo, settings.time_zone);
    let days = service.metrics_by_month(date, &current_user.id).await?;
    Ok(Json(days.iter().map(DayCountResponse::from).collect()))
}

pub fn routes() -> (Vec<rocket::Route>, okapi::openapi3::OpenApi) {
    rocket_okapi::openapi_get_routes_spec![create_focus_time, list_focus_times, get_focus_time_metrics]
}
