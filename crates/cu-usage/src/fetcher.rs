use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::error::{ErrorKind, UsageError};
use crate::extract::extract_usage_payload;
use crate::portal::{Credentials, Portal};
use crate::reading::UsageReading;
use crate::throttle::Throttle;

pub const DEFAULT_NAME: &str = "Cox";
pub const UNIT_OF_MEASUREMENT: &str = "GB";
pub const ICON: &str = "mdi:chart-line";
pub const STATE_UNKNOWN: &str = "unknown";
pub const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, PartialEq)]
pub enum SensorState {
    Unknown,
    Published(UsageReading),
}

impl SensorState {
    /// The primary state value: GB used, or the unknown sentinel.
    pub fn to_value(&self) -> Value {
        match self {
            SensorState::Unknown => Value::from(STATE_UNKNOWN),
            SensorState::Published(reading) => Value::from(reading.usage),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum RefreshOutcome {
    /// A new reading was published.
    Updated,
    /// The pipeline failed and the state is now unknown.
    Failed,
    /// No pipeline run: inside the throttle window or another refresh is
    /// already running. Carries the result of the last run.
    Throttled { previous_success: bool },
}

impl RefreshOutcome {
    pub fn is_success(&self) -> bool {
        match self {
            RefreshOutcome::Updated => true,
            RefreshOutcome::Failed => false,
            RefreshOutcome::Throttled { previous_success } => *previous_success,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LastError {
    pub code: &'static str,
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&UsageError> for LastError {
    fn from(err: &UsageError) -> Self {
        Self {
            code: err.error_code(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Everything a state store needs to render the sensor.
#[derive(Debug, Clone, Serialize)]
pub struct SensorSnapshot {
    pub name: String,
    pub state: Value,
    pub unit: &'static str,
    pub icon: &'static str,
    pub attributes: Map<String, Value>,
    /// Start time of the run that produced `state`.
    pub last_refresh: Option<DateTime<Utc>>,
    pub last_error: Option<LastError>,
}

struct Published {
    state: SensorState,
    last_success: bool,
    last_refresh: Option<DateTime<Utc>>,
    last_error: Option<LastError>,
}

/// Scrapes the portal on demand and holds the latest reading.
pub struct UsageFetcher {
    name: String,
    credentials: Credentials,
    portal: Arc<dyn Portal>,
    min_interval: Duration,
    throttle: Mutex<Throttle>,
    published: RwLock<Published>,
    today: fn() -> NaiveDate,
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

impl UsageFetcher {
    pub fn new(name: impl Into<String>, credentials: Credentials, portal: Arc<dyn Portal>) -> Self {
        Self {
            name: name.into(),
            credentials,
            portal,
            min_interval: DEFAULT_MIN_REFRESH_INTERVAL,
            throttle: Mutex::new(Throttle::new(DEFAULT_MIN_REFRESH_INTERVAL)),
            published: RwLock::new(Published {
                state: SensorState::Unknown,
                last_success: false,
                last_refresh: None,
                last_error: None,
            }),
            today: local_today,
        }
    }

    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self.throttle = Mutex::new(Throttle::new(min_interval));
        self
    }

    /// Override the calendar used for the month length.
    pub fn with_calendar(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Run the pipeline unless the last run started less than the minimum
    /// interval ago.
    pub async fn refresh(&self) -> RefreshOutcome {
        self.refresh_gated(false).await
    }

    /// Run the pipeline regardless of the interval. Still never overlaps
    /// with another refresh.
    pub async fn refresh_forced(&self) -> RefreshOutcome {
        self.refresh_gated(true).await
    }

    async fn refresh_gated(&self, force: bool) -> RefreshOutcome {
        let Ok(mut throttle) = self.throttle.try_lock() else {
            tracing::debug!(sensor = %self.name, "refresh already running, returning cached result");
            return self.throttled();
        };

        let now = Instant::now();
        if !force && !throttle.is_ready(now) {
            tracing::debug!(sensor = %self.name, "refresh throttled");
            return self.throttled();
        }
        throttle.mark_started(now);
        let started_at = Utc::now();

        match self.run_pipeline().await {
            Ok(reading) => {
                tracing::info!(
                    sensor = %self.name,
                    usage = reading.usage,
                    limit = reading.limit,
                    days_left = reading.days_left,
                    "usage reading published"
                );
                let mut published = self.write();
                published.state = SensorState::Published(reading);
                published.last_refresh = Some(started_at);
                published.last_success = true;
                published.last_error = None;
                RefreshOutcome::Updated
            }
            Err(err) => {
                tracing::warn!(sensor = %self.name, code = err.error_code(), "{}", err);
                let mut published = self.write();
                published.state = SensorState::Unknown;
                published.last_refresh = Some(started_at);
                published.last_success = false;
                published.last_error = Some(LastError::from(&err));
                RefreshOutcome::Failed
            }
        }
    }

    async fn run_pipeline(&self) -> Result<UsageReading, UsageError> {
        let page = self.portal.fetch_usage_page(&self.credentials).await?;
        let payload = extract_usage_payload(&page)?;
        Ok(UsageReading::derive(payload, (self.today)()))
    }

    fn throttled(&self) -> RefreshOutcome {
        RefreshOutcome::Throttled {
            previous_success: self.read().last_success,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Published> {
        self.published.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Published> {
        self.published.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Minimum time between the starts of two portal scrapes.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn unit_of_measurement(&self) -> &'static str {
        UNIT_OF_MEASUREMENT
    }

    pub fn icon(&self) -> &'static str {
        ICON
    }

    pub fn state(&self) -> SensorState {
        self.read().state.clone()
    }

    /// The published reading, if the last refresh succeeded.
    pub fn reading(&self) -> Option<UsageReading> {
        match &self.read().state {
            SensorState::Published(reading) => Some(reading.clone()),
            SensorState::Unknown => None,
        }
    }

    /// Display attributes; empty while the state is unknown.
    pub fn attributes(&self) -> Map<String, Value> {
        match &self.read().state {
            SensorState::Published(reading) => reading.attributes(),
            SensorState::Unknown => Map::new(),
        }
    }

    pub fn last_error(&self) -> Option<LastError> {
        self.read().last_error.clone()
    }

    pub fn snapshot(&self) -> SensorSnapshot {
        let published = self.read();
        let attributes = match &published.state {
            SensorState::Published(reading) => reading.attributes(),
            SensorState::Unknown => Map::new(),
        };
        SensorSnapshot {
            name: self.name.clone(),
            state: published.state.to_value(),
            unit: UNIT_OF_MEASUREMENT,
            icon: ICON,
            attributes,
            last_refresh: published.last_refresh,
            last_error: published.last_error.clone(),
        }
    }
}
