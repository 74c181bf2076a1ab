pub mod error;
pub mod extract;
pub mod fetcher;
pub mod portal;
pub mod reading;
pub mod throttle;

#[cfg(test)]
mod test_support;

pub use error::{ErrorKind, UsageError};
pub use extract::{extract_usage_payload, RawUsagePayload};
pub use fetcher::{
    LastError, RefreshOutcome, SensorSnapshot, SensorState, UsageFetcher, DEFAULT_NAME, ICON,
    UNIT_OF_MEASUREMENT,
};
pub use portal::{Credentials, HttpPortal, Portal, PortalSettings};
pub use reading::{UsageReading, ATTRIBUTE_LABELS};
