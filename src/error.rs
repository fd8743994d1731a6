use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request timeout for URL: {0}")]
    RequestTimeout(String),

    #[error("HTTP error {status} for URL: {url}")]
    Http { status: u16, url: String },

    #[error("reCAPTCHA challenge requested for URL: {url}")]
    ReCaptcha { url: String },

    #[error("Transport failed: {0}")]
    Transport(String),

    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),

    #[error("Platform not supported: {0}")]
    PlatformNotSupported(String),

    #[error("Content not available: {0}")]
    ContentNotAvailable(String),

    #[error("Content not supported: {0}")]
    ContentNotSupported(String),

    #[error("Could not parse {field}: {reason}")]
    Parsing { field: String, reason: String },

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown format: {0}")]
    UnknownFormat(String),

    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("Fetch previously failed: {0}")]
    PreviouslyFailed(String),

    #[error("Invalid header value: {0}")]
    Header(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl ExtractionError {
    /// Field-level parsing failure naming the field that could not be read.
    pub fn parsing(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parsing {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Network, HTTP status and timeout failures raised by the transport.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Network(_)
                | Self::RequestTimeout(_)
                | Self::Http { .. }
                | Self::ReCaptcha { .. }
                | Self::Transport(_)
        )
    }

    /// Errors a collector records and moves past instead of aborting a listing.
    pub fn is_item_level(&self) -> bool {
        matches!(self, Self::Parsing { .. } | Self::UnknownFormat(_))
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ExtractionError>;
