//! Client side of the focus tracker: the HTTP client used by the timer front end and the
//! day/month views built from its responses.

pub mod api;
pub mod metrics;

pub use crate::models::focus_time::{DayCountResponse, FocusTimeResponse};
pub use api::{ClientConfig, ClientError, FocusTimeClient};
pub use metrics::{DailyMetrics, MonthlyMetrics};
