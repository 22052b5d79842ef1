use crate::error::app_error::ErrorBody;
use crate::models::focus_time::{DayCountResponse, FocusTimeResponse};
use crate::timer::driver::SessionSink;
use crate::timer::machine::CompletedSession;
use chrono::NaiveDate;
use chrono_tz::Tz;
use figment::Figment;
use figment::providers::{Env, Serialized};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server answered {status}: {message}")]
    Api { status: u16, message: String },
    #[error("invalid client configuration: {0}")]
    Config(String),
}

/// Settings of the terminal front end, read from `FOCUS_CLIENT_*` variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the API including its base path, e.g. `http://localhost:8000/api`.
    pub api_url: String,
    /// Session id sent as a bearer token.
    pub token: Option<String>,
    pub timeout_seconds: u64,
    /// Zone used to print session times and pick "today".
    pub time_zone: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000/api".to_string(),
            token: None,
            timeout_seconds: 10,
            time_zone: "UTC".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn load() -> Result<Self, ClientError> {
        Figment::from(Serialized::defaults(ClientConfig::default()))
            .merge(Env::prefixed("FOCUS_CLIENT_"))
            .extract()
            .map_err(|e| ClientError::Config(e.to_string()))
    }

    pub fn parse_time_zone(&self) -> Result<Tz, ClientError> {
        self.time_zone
            .trim()
            .parse::<Tz>()
            .map_err(|_| ClientError::Config(format!("unknown time zone '{}'", self.time_zone)))
    }
}

/// Typed access to the focus-time endpoints.
#[derive(Debug, Clone)]
pub struct FocusTimeClient {
    config: ClientConfig,
    http: reqwest::Client,
}

impl FocusTimeClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(Duration::from_secs(config.timeout_seconds)).build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.api_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token.trim()),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T, ClientError> {
        let response = self.authorize(request).send().await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(api_error(status, &text));
        }

        Ok(response.json().await?)
    }

    pub async fn create_focus_time(&self, session: &CompletedSession) -> Result<FocusTimeResponse, ClientError> {
        debug!(time_from = %session.time_from, time_to = %session.time_to, "submitting focus session");
        self.send(self.http.post(self.url("focus-time")).json(session)).await
    }

    pub async fn list_focus_times(&self, date: NaiveDate) -> Result<Vec<FocusTimeResponse>, ClientError> {
        let request = self.http.get(self.url("focus-time")).query(&[("date", date_param(date))]);
        self.send(request).await
    }

    pub async fn focus_time_metrics(&self, date: NaiveDate) -> Result<Vec<DayCountResponse>, ClientError> {
        let request = self.http.get(self.url("focus-time/metrics")).query(&[("date", date_param(date))]);
        self.send(request).await
    }
}

#[async_trait::async_trait]
impl SessionSink for FocusTimeClient {
    async fn submit(&self, session: &CompletedSession) -> Result<(), ClientError> {
        self.create_focus_time(session).await.map(|_| ())
    }
}

fn date_param(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn api_error(status: StatusCode, body: &str) -> ClientError {
    let message = match serde_json::from_str::<ErrorBody>(body) {
        Ok(error) => error.message.to_string(),
        Err(_) if body.trim().is_empty() => status.canonical_reason().unwrap_or("unknown error").to_string(),
        Err(_) => body.trim().to_string(),
    };

    ClientError::Api {
        status: status.as_u16(),
        message,
    }
}
