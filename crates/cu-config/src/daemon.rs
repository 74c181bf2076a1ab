use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

use crate::paths::ConfigPaths;
use crate::portal::PortalConfig;

pub const USERNAME_ENV: &str = "COX_USAGE_USERNAME";
pub const PASSWORD_ENV: &str = "COX_USAGE_PASSWORD";
/// One year.
pub const MAX_MIN_REFRESH_MINUTES: u64 = 366 * 24 * 60;

fn default_name() -> String {
    "Cox".to_string()
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_port() -> u16 {
    9410
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_min_refresh_minutes() -> u64 {
    60
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// How often the scheduler asks for a refresh.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Minimum time between two portal scrapes.
    #[serde(default = "default_min_refresh_minutes")]
    pub min_refresh_minutes: u64,
    #[serde(default)]
    pub portal: PortalConfig,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            username: String::new(),
            password: String::new(),
            host: default_host(),
            port: default_port(),
            poll_interval_secs: default_poll_interval_secs(),
            min_refresh_minutes: default_min_refresh_minutes(),
            portal: PortalConfig::default(),
        }
    }
}

impl fmt::Debug for DaemonConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DaemonConfig")
            .field("name", &self.name)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("min_refresh_minutes", &self.min_refresh_minutes)
            .field("portal", &self.portal)
            .finish()
    }
}

impl DaemonConfig {
    /// Load config from the default location (`~/.cox-usage/config.toml`).
    pub fn load() -> anyhow::Result<Self> {
        let paths = ConfigPaths::new()?;
        Self::load_from(&paths)
    }

    /// Load config from a specific `ConfigPaths`, apply credential env
    /// overrides, then validate.
    pub fn load_from(paths: &ConfigPaths) -> anyhow::Result<Self> {
        Self::load_with_env(paths, |key| std::env::var(key).ok())
    }

    pub fn load_with_env(
        paths: &ConfigPaths,
        env: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let config_file = paths.config_path();
        let mut config = if config_file.exists() {
            let content = std::fs::read_to_string(&config_file)?;
            toml::from_str(&content)?
        } else {
            Self::default()
        };
        config.apply_env_overrides(env);
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self, env: impl Fn(&str) -> Option<String>) {
        if let Some(username) = env(USERNAME_ENV).filter(|v| !v.is_empty()) {
            self.username = username;
        }
        if let Some(password) = env(PASSWORD_ENV).filter(|v| !v.is_empty()) {
            self.password = password;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("name must not be empty");
        }
        if self.username.is_empty() {
            anyhow::bail!("username is required (config file or {USERNAME_ENV})");
        }
        if self.password.is_empty() {
            anyhow::bail!("password is required (config file or {PASSWORD_ENV})");
        }
        if self.port == 0 {
            anyhow::bail!("port must not be 0");
        }
        if self.poll_interval_secs == 0 {
            anyhow::bail!("poll_interval_secs must be greater than 0");
        }
        if self.min_refresh_minutes == 0 {
            anyhow::bail!("min_refresh_minutes must be greater than 0");
        }
        if self.min_refresh_minutes > MAX_MIN_REFRESH_MINUTES {
            anyhow::bail!("min_refresh_minutes must be at most {MAX_MIN_REFRESH_MINUTES}");
        }
        if self.portal.timeout_secs == 0 {
            anyhow::bail!("portal.timeout_secs must be greater than 0");
        }
        if self.portal.login_url.is_empty() {
            anyhow::bail!("portal.login_url must not be empty");
        }
        if self.portal.usage_url.is_empty() {
            anyhow::bail!("portal.usage_url must not be empty");
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
