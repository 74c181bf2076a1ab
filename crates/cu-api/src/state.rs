use cu_config::DaemonConfig;
use cu_usage::UsageFetcher;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: DaemonConfig,
    pub fetcher: Arc<UsageFetcher>,
    pub version: &'static str,
}

impl AppState {
    pub fn new(config: DaemonConfig, fetcher: Arc<UsageFetcher>) -> Self {
        Self {
            config,
            fetcher,
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}
