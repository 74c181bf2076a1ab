//! Wiring shared by the `cox-usaged` binary: config-to-fetcher mapping, the
//! startup gate, the poll loop and the status client types.

use cu_config::{DaemonConfig, PortalConfig};
use cu_usage::{Credentials, HttpPortal, PortalSettings, UsageFetcher};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Build-time daemon version string.
pub const DAEMON_VERSION: &str = match option_env!("COX_USAGED_VERSION") {
    Some(version) => version,
    None => env!("CARGO_PKG_VERSION"),
};

// ---------------------------------------------------------------------------
// Fetcher construction
// ---------------------------------------------------------------------------

pub fn portal_settings(portal: &PortalConfig) -> PortalSettings {
    PortalSettings {
        login_url: portal.login_url.clone(),
        usage_url: portal.usage_url.clone(),
        timeout: Duration::from_secs(portal.timeout_secs),
        accept_invalid_certs: portal.accept_invalid_certs,
    }
}

pub fn build_fetcher(config: &DaemonConfig) -> UsageFetcher {
    let portal = HttpPortal::new(portal_settings(&config.portal));
    UsageFetcher::new(
        config.name.clone(),
        Credentials::new(config.username.clone(), config.password.clone()),
        Arc::new(portal),
    )
    .with_min_interval(Duration::from_secs(
        config.min_refresh_minutes.saturating_mul(60),
    ))
}

// ---------------------------------------------------------------------------
// Scheduling
// ---------------------------------------------------------------------------

/// First refresh at startup. A sensor that cannot scrape once is not served.
pub async fn initial_refresh(fetcher: &UsageFetcher) -> anyhow::Result<()> {
    if fetcher.refresh_forced().await.is_success() {
        return Ok(());
    }
    let reason = fetcher
        .last_error()
        .map(|e| e.message)
        .unwrap_or_else(|| "unknown error".to_string());
    anyhow::bail!("Initial refresh of '{}' failed: {}", fetcher.name(), reason)
}

/// Ask the fetcher for a refresh every `every`. The fetcher's own throttle
/// decides whether the portal is actually hit.
pub fn spawn_poller(fetcher: Arc<UsageFetcher>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; the startup gate already covered it.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let outcome = fetcher.refresh().await;
            tracing::debug!(sensor = %fetcher.name(), ?outcome, "scheduled refresh");
        }
    })
}

// ---------------------------------------------------------------------------
// Status client
// ---------------------------------------------------------------------------

/// `GET /api/v1/sensor` as seen by the `status` command.
#[derive(Debug, Deserialize, PartialEq)]
pub struct SensorStatusResponse {
    pub name: String,
    pub state: Value,
    pub unit: String,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    pub last_refresh: Option<String>,
    pub last_error: Option<LastErrorResponse>,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct LastErrorResponse {
    pub code: String,
    pub message: String,
}

impl SensorStatusResponse {
    pub fn render(&self) -> String {
        let state = match &self.state {
            Value::String(s) => s.clone(),
            other => format!("{} {}", other, self.unit),
        };
        let mut out = format!("{}: {}\n", self.name, state);
        for (label, value) in &self.attributes {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            out.push_str(&format!("  {label}: {value}\n"));
        }
        if let Some(at) = &self.last_refresh {
            out.push_str(&format!("Last refresh: {at}\n"));
        }
        if let Some(err) = &self.last_error {
            out.push_str(&format!("Last error: [{}] {}\n", err.code, err.message));
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
