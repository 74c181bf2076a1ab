use serde::{Deserialize, Serialize};

pub const DEFAULT_LOGIN_URL: &str = "https://idm.east.cox.net/idm/coxnetlogin";
pub const DEFAULT_USAGE_URL: &str = "https://www.cox.com/internet/mydatausage.cox";

fn default_login_url() -> String {
    DEFAULT_LOGIN_URL.to_string()
}

fn default_usage_url() -> String {
    DEFAULT_USAGE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

/// `[portal]` section: where and how to reach the customer portal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalConfig {
    #[serde(default = "default_login_url")]
    pub login_url: String,
    #[serde(default = "default_usage_url")]
    pub usage_url: String,
    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Disables TLS certificate verification for portal requests. Only turn
    /// this on if the portal's certificate chain is broken on your host.
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            login_url: default_login_url(),
            usage_url: default_usage_url(),
            timeout_secs: default_timeout_secs(),
            accept_invalid_certs: false,
        }
    }
}
