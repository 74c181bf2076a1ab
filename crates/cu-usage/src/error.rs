use serde::Serialize;

/// Failure classes a refresh can end in. Every class is handled the same way
/// at the refresh boundary; the split exists for logs and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Transport,
    Protocol,
    Extraction,
    Parse,
}

#[derive(Debug, thiserror::Error)]
pub enum UsageError {
    #[error("Failed to build HTTP session: {0}")]
    Session(String),
    #[error("Request failed for url {url}: {message}")]
    Transport { url: String, message: String },
    #[error("Invalid status code {status} from url {url}")]
    Status { url: String, status: u16 },
    #[error("utag_data block not found in usage page")]
    Extraction,
    #[error("Invalid usage payload: {0}")]
    Parse(String),
}

impl UsageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UsageError::Session(_) | UsageError::Transport { .. } => ErrorKind::Transport,
            UsageError::Status { .. } => ErrorKind::Protocol,
            UsageError::Extraction => ErrorKind::Extraction,
            UsageError::Parse(_) => ErrorKind::Parse,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            UsageError::Session(_) => "USAGE_SESSION",
            UsageError::Transport { .. } => "USAGE_TRANSPORT",
            UsageError::Status { .. } => "USAGE_BAD_STATUS",
            UsageError::Extraction => "USAGE_EXTRACTION",
            UsageError::Parse(_) => "USAGE_PARSE",
        }
    }

    /// The endpoint involved, for transport and status failures.
    pub fn url(&self) -> Option<&str> {
        match self {
            UsageError::Transport { url, .. } | UsageError::Status { url, .. } => Some(url),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for UsageError {
    fn from(err: serde_json::Error) -> Self {
        UsageError::Parse(err.to_string())
    }
}
