//! Pulls the usage figures out of the dashboard page.
//!
//! The portal renders the numbers into a `utag_data` analytics object inside
//! a `<script>` block. This is the one place that knows about that markup;
//! when the page changes, this is what breaks.

use regex::Regex;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use std::sync::OnceLock;

use crate::error::UsageError;

static UTAG_DATA: OnceLock<Regex> = OnceLock::new();

fn utag_data_pattern() -> &'static Regex {
    UTAG_DATA.get_or_init(|| {
        Regex::new(r"(?sm)var.utag_data=\{\s*(.*?)\}\n").expect("utag_data pattern is valid")
    })
}

/// The subset of `utag_data` the sensor cares about. Unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawUsagePayload {
    /// GB used so far in the billing cycle.
    #[serde(rename = "dumUsage", deserialize_with = "numeric")]
    pub usage: f64,
    /// Plan limit in GB.
    #[serde(rename = "dumLimit", deserialize_with = "numeric")]
    pub limit: f64,
    /// Days remaining in the billing cycle.
    #[serde(rename = "dumDaysLeft", deserialize_with = "numeric")]
    pub days_left: f64,
    /// Percentage used, exactly as the portal reports it.
    #[serde(rename = "dumUtilization")]
    pub utilization: serde_json::Value,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Numeric {
    Number(f64),
    Text(String),
}

// The portal sends numbers as strings ("150.5"); accept bare numbers too.
fn numeric<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = match Numeric::deserialize(deserializer)? {
        Numeric::Number(n) => n,
        Numeric::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| D::Error::custom(format!("not a number: {s:?}")))?,
    };
    if !value.is_finite() {
        return Err(D::Error::custom(format!("not a finite number: {value}")));
    }
    Ok(value)
}

/// Locate the first `utag_data` object in `page` and decode it.
///
/// Returns [`UsageError::Extraction`] when the block is missing and
/// [`UsageError::Parse`] when it is there but is not the JSON we expect.
pub fn extract_usage_payload(page: &str) -> Result<RawUsagePayload, UsageError> {
    let body = utag_data_pattern()
        .captures(page)
        .and_then(|caps| caps.get(1))
        .ok_or(UsageError::Extraction)?
        .as_str();

    let json = format!("{{{body}}}");
    let payload: RawUsagePayload = serde_json::from_str(&json)?;
    tracing::debug!(
        usage = payload.usage,
        limit = payload.limit,
        days_left = payload.days_left,
        "usage payload extracted"
    );
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DASHBOARD: &str = r#"<html>
<head>
<script type="text/javascript">
    var utag_data={
        "dumUsage":"312.4",
        "dumLimit":"1024",
        "dumDaysLeft":"12",
        "dumUtilization":"31",
        "pageName":"cox:res:myprofile:data usage"
    }
</script>
</head>
<body>usage</body>
</html>
"#;

    #[test]
    fn extracts_single_line_block() {
        let page = "<script>var utag_data={\"dumUsage\":\"150.5\",\"dumLimit\":\"500\",\"dumDaysLeft\":\"10\",\"dumUtilization\":\"30%\"}\n</script>";
        let payload = extract_usage_payload(page).unwrap();
        assert_eq!(payload.usage, 150.5);
        assert_eq!(payload.limit, 500.0);
        assert_eq!(payload.days_left, 10.0);
        assert_eq!(payload.utilization, serde_json::json!("30%"));
    }

    #[test]
    fn extracts_multiline_block_and_ignores_extra_keys() {
        let payload = extract_usage_payload(DASHBOARD).unwrap();
        assert_eq!(payload.usage, 312.4);
        assert_eq!(payload.limit, 1024.0);
        assert_eq!(payload.days_left, 12.0);
        assert_eq!(payload.utilization, serde_json::json!("31"));
    }

    #[test]
    fn logs_extracted_payload() {
        let (logs, subscriber) = crate::test_support::capture_logs();
        tracing::subscriber::with_default(subscriber, || {
            extract_usage_payload(DASHBOARD).unwrap();
        });
        let output = logs.contents();
        assert!(output.contains("usage payload extracted"), "{output}");
        assert!(output.contains("usage=312.4"), "{output}");
    }

    #[test]
    fn missing_block_logs_nothing() {
        let (logs, subscriber) = crate::test_support::capture_logs();
        tracing::subscriber::with_default(subscriber, || {
            assert!(extract_usage_payload("<html></html>").is_err());
        });
        assert!(logs.contents().is_empty());
    }

    #[test]
    fn accepts_bare_numbers() {
        let page = "var utag_data={\"dumUsage\":42,\"dumLimit\":100.5,\"dumDaysLeft\":3,\"dumUtilization\":42}\n";
        let payload = extract_usage_payload(page).unwrap();
        assert_eq!(payload.usage, 42.0);
        assert_eq!(payload.limit, 100.5);
        assert_eq!(payload.utilization, serde_json::json!(42));
    }

    #[test]
    fn uses_first_block_only() {
        let page = "var utag_data={\"dumUsage\":\"1\",\"dumLimit\":\"2\",\"dumDaysLeft\":\"3\",\"dumUtilization\":\"4\"}\n\
                    var utag_data={\"dumUsage\":\"9\",\"dumLimit\":\"9\",\"dumDaysLeft\":\"9\",\"dumUtilization\":\"9\"}\n";
        let payload = extract_usage_payload(page).unwrap();
        assert_eq!(payload.usage, 1.0);
    }

    #[test]
    fn missing_block_is_extraction_error() {
        let err = extract_usage_payload("<html><body>Sign in</body></html>").unwrap_err();
        assert!(matches!(err, UsageError::Extraction));
    }

    #[test]
    fn block_without_trailing_newline_is_not_matched() {
        let page = "var utag_data={\"dumUsage\":\"1\"}</script>";
        assert!(matches!(
            extract_usage_payload(page),
            Err(UsageError::Extraction)
        ));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let page = "var utag_data={\"dumUsage\":\"1\",,}\n";
        let err = extract_usage_payload(page).unwrap_err();
        assert!(matches!(err, UsageError::Parse(_)));
    }

    #[test]
    fn missing_key_is_parse_error() {
        let page = "var utag_data={\"dumLimit\":\"500\",\"dumDaysLeft\":\"10\",\"dumUtilization\":\"30%\"}\n";
        let err = extract_usage_payload(page).unwrap_err();
        assert!(matches!(err, UsageError::Parse(ref msg) if msg.contains("dumUsage")));
    }

    #[test]
    fn non_numeric_string_is_parse_error() {
        let page = "var utag_data={\"dumUsage\":\"lots\",\"dumLimit\":\"500\",\"dumDaysLeft\":\"10\",\"dumUtilization\":\"30%\"}\n";
        assert!(matches!(
            extract_usage_payload(page),
            Err(UsageError::Parse(_))
        ));
    }

    #[test]
    fn non_finite_string_is_parse_error() {
        let page = "var utag_data={\"dumUsage\":\"NaN\",\"dumLimit\":\"500\",\"dumDaysLeft\":\"10\",\"dumUtilization\":\"30%\"}\n";
        assert!(matches!(
            extract_usage_payload(page),
            Err(UsageError::Parse(_))
        ));
    }
}
