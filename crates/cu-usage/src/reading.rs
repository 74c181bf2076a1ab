use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::extract::RawUsagePayload;

pub const ATTR_USED_DATA: &str = "Used data";
pub const ATTR_TOTAL_DATA: &str = "Total data";
pub const ATTR_DAYS_IN_MONTH: &str = "Days this month";
pub const ATTR_DAYS_LEFT: &str = "Days Left in Cycle";
pub const ATTR_UTILIZATION: &str = "Percentage Used";
pub const ATTR_CURRENT_AVG_GB: &str = "Average GB Used Per Day";
pub const ATTR_REMAINING_AVG_GB: &str = "Average GB Remaining Per Day";

/// Every attribute label a published reading carries.
pub const ATTRIBUTE_LABELS: [&str; 7] = [
    ATTR_USED_DATA,
    ATTR_TOTAL_DATA,
    ATTR_DAYS_IN_MONTH,
    ATTR_DAYS_LEFT,
    ATTR_UTILIZATION,
    ATTR_CURRENT_AVG_GB,
    ATTR_REMAINING_AVG_GB,
];

/// A complete reading derived from one successful scrape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageReading {
    pub usage: f64,
    pub limit: f64,
    pub utilization: Value,
    pub days_in_month: u32,
    pub days_left: f64,
    pub current_avg_gb: f64,
    pub remaining_avg_gb: f64,
}

impl UsageReading {
    /// Derive the published reading from a scraped payload.
    ///
    /// `today` only feeds the calendar month length; the billing cycle comes
    /// from the payload. Elapsed days floor at one. A cycle that ends today
    /// (zero days left) divides by one and yields the remaining GB; any other
    /// `days_left`, fractional or negative, is used as reported.
    pub fn derive(payload: RawUsagePayload, today: NaiveDate) -> Self {
        let days_in_month = days_in_month(today);
        let elapsed = (f64::from(days_in_month) - payload.days_left).max(1.0);
        let remaining_days = if payload.days_left == 0.0 {
            1.0
        } else {
            payload.days_left
        };

        Self {
            usage: payload.usage,
            limit: payload.limit,
            utilization: payload.utilization,
            days_in_month,
            days_left: payload.days_left,
            current_avg_gb: round2(payload.usage / elapsed),
            remaining_avg_gb: round2((payload.limit - payload.usage) / remaining_days),
        }
    }

    /// The reading keyed by display label.
    pub fn attributes(&self) -> Map<String, Value> {
        let mut attrs = Map::new();
        attrs.insert(ATTR_USED_DATA.to_string(), Value::from(self.usage));
        attrs.insert(ATTR_TOTAL_DATA.to_string(), Value::from(self.limit));
        attrs.insert(ATTR_UTILIZATION.to_string(), self.utilization.clone());
        attrs.insert(
            ATTR_DAYS_IN_MONTH.to_string(),
            Value::from(self.days_in_month),
        );
        attrs.insert(ATTR_DAYS_LEFT.to_string(), Value::from(self.days_left));
        attrs.insert(
            ATTR_CURRENT_AVG_GB.to_string(),
            Value::from(self.current_avg_gb),
        );
        attrs.insert(
            ATTR_REMAINING_AVG_GB.to_string(),
            Value::from(self.remaining_avg_gb),
        );
        attrs
    }
}

/// Calendar length of the month containing `date`.
pub fn days_in_month(date: NaiveDate) -> u32 {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first_of_next| first_of_next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
