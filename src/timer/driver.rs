use crate::client::api::ClientError;
use crate::timer::machine::{CompletedSession, FocusTimer, TimerError};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{error, info};

/// Destination of completed focus sessions.
#[async_trait::async_trait]
pub trait SessionSink {
    async fn submit(&self, session: &CompletedSession) -> Result<(), ClientError>;
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Timer(#[from] TimerError),
    /// The transition happened but the session did not reach the sink; it can be retried.
    #[error("failed to submit focus session: {source}")]
    Submit {
        session: CompletedSession,
        #[source]
        source: ClientError,
    },
}

/// Couples a [`FocusTimer`] with the sink that stores its sessions.
pub struct TimerDriver<S> {
    timer: FocusTimer,
    sink: S,
}

impl<S: SessionSink + Sync> TimerDriver<S> {
    pub fn new(timer: FocusTimer, sink: S) -> Self {
        Self { timer, sink }
    }

    pub fn timer(&self) -> &FocusTimer {
        &self.timer
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), DriverError> {
        self.timer.start(now)?;
        info!(focus_minutes = self.timer.focus_minutes(), rest_minutes = self.timer.rest_minutes(), "focus started");
        Ok(())
    }

    /// Advances the clock; submits the focus interval when it has just run out.
    pub async fn tick(&mut self, now: DateTime<Utc>) -> Result<Option<CompletedSession>, DriverError> {
        match self.timer.tick(now) {
            Some(session) => self.submit(session).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn begin_rest(&mut self, now: DateTime<Utc>) -> Result<Option<CompletedSession>, DriverError> {
        match self.timer.begin_rest(now)? {
            Some(session) => self.submit(session).await.map(Some),
            None => Ok(None),
        }
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<(), DriverError> {
        self.timer.resume(now)?;
        Ok(())
    }

    pub fn cancel(&mut self) {
        self.timer.cancel();
        info!("focus cycle cancelled");
    }

    /// Re-sends a session whose earlier submission failed.
    pub async fn retry(&self, session: CompletedSession) -> Result<CompletedSession, DriverError> {
        self.submit(session).await
    }

    async fn submit(&self, session: CompletedSession) -> Result<CompletedSession, DriverError> {
        match self.sink.submit(&session).await {
            Ok(()) => {
                info!(time_from = %session.time_from, time_to = %session.time_to, minutes = session.duration_minutes(), "focus session submitted");
                Ok(session)
            }
            Err(source) => {
                error!(error = %source, time_from = %session.time_from, time_to = %session.time_to, "focus session submission failed");
                Err(DriverError::Submit { session, source })
            }
        }
    }
}
