//! Session, login and dashboard fetch against the customer portal.

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

use crate::error::UsageError;

pub const LOGIN_URL: &str = "https://idm.east.cox.net/idm/coxnetlogin";
pub const USAGE_URL: &str = "https://www.cox.com/internet/mydatausage.cox";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const LOGIN_ON_SUCCESS: &str = "https://www.cox.com/internet/mydatausage.cox";
const LOGIN_ON_FAILURE: &str = "ww2.cox.com/resaccount/sign-in.cox";
const LOGIN_TARGET_FN: &str = "COX.net";
const LOGIN_EMAIL_DOMAIN: &str = "@cox.net";

/// Portal account credentials. Fixed for the lifetime of a fetcher.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Fields posted to the login endpoint.
    pub fn login_form(&self) -> [(&'static str, &str); 7] {
        [
            ("onsuccess", LOGIN_ON_SUCCESS),
            ("onfailure", LOGIN_ON_FAILURE),
            ("targetFN", LOGIN_TARGET_FN),
            ("emaildomain", LOGIN_EMAIL_DOMAIN),
            ("username", &self.username),
            ("password", &self.password),
            ("rememberme", "true"),
        ]
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct PortalSettings {
    pub login_url: String,
    pub usage_url: String,
    /// Applied to each request separately.
    pub timeout: Duration,
    /// Skip TLS certificate verification on both requests.
    pub accept_invalid_certs: bool,
}

impl Default for PortalSettings {
    fn default() -> Self {
        Self {
            login_url: LOGIN_URL.to_string(),
            usage_url: USAGE_URL.to_string(),
            timeout: REQUEST_TIMEOUT,
            accept_invalid_certs: false,
        }
    }
}

/// Where the dashboard HTML comes from.
#[async_trait]
pub trait Portal: Send + Sync {
    /// Log in with `credentials` and return the usage page body.
    async fn fetch_usage_page(&self, credentials: &Credentials) -> Result<String, UsageError>;
}

/// The live portal over HTTPS.
///
/// Every call gets its own cookie jar: the login cookies live exactly as long
/// as one fetch and are never shared between refreshes.
pub struct HttpPortal {
    settings: PortalSettings,
}

impl HttpPortal {
    pub fn new(settings: PortalSettings) -> Self {
        if settings.accept_invalid_certs {
            tracing::warn!(
                login_url = %settings.login_url,
                usage_url = %settings.usage_url,
                "TLS certificate verification is disabled for portal requests"
            );
        }
        Self { settings }
    }

    pub fn settings(&self) -> &PortalSettings {
        &self.settings
    }

    fn open_session(&self) -> Result<reqwest::Client, UsageError> {
        reqwest::Client::builder()
            .cookie_store(true)
            .timeout(self.settings.timeout)
            .danger_accept_invalid_certs(self.settings.accept_invalid_certs)
            .build()
            .map_err(|e| UsageError::Session(e.to_string()))
    }

    fn transport_error(&self, url: &str, err: reqwest::Error) -> UsageError {
        let message = if err.is_timeout() {
            format!("timed out after {}s", self.settings.timeout.as_secs_f32())
        } else {
            err.to_string()
        };
        UsageError::Transport {
            url: url.to_string(),
            message,
        }
    }

    fn check_status(url: &str, resp: reqwest::Response) -> Result<reqwest::Response, UsageError> {
        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            return Err(UsageError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(resp)
    }
}

#[async_trait]
impl Portal for HttpPortal {
    async fn fetch_usage_page(&self, credentials: &Credentials) -> Result<String, UsageError> {
        let session = self.open_session()?;
        tracing::debug!(
            timeout_secs = self.settings.timeout.as_secs_f32(),
            accept_invalid_certs = self.settings.accept_invalid_certs,
            "portal session built"
        );

        let login_url = &self.settings.login_url;
        let resp = session
            .post(login_url)
            .form(&credentials.login_form()[..])
            .send()
            .await
            .map_err(|e| self.transport_error(login_url, e))?;
        Self::check_status(login_url, resp)?;
        tracing::debug!(url = %login_url, "portal login accepted");

        let usage_url = &self.settings.usage_url;
        let resp = session
            .get(usage_url)
            .send()
            .await
            .map_err(|e| self.transport_error(usage_url, e))?;
        let resp = Self::check_status(usage_url, resp)?;
        let body = resp
            .text()
            .await
            .map_err(|e| self.transport_error(usage_url, e))?;
        tracing::debug!(url = %usage_url, bytes = body.len(), "usage page fetched");

        Ok(body)
    }
}
