use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({platform}): {message}")]
    Api {
        platform: String,
        message: String,
        status_code: Option<u16>,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Itinerary failed validation: {0}")]
    Validation(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Rate limited by {platform}")]
    RateLimit {
        platform: String,
        retry_after_secs: Option<u64>,
    },

    #[error("No route between {from} and {to} for walking, transit or driving")]
    RouteNotFound { from: String, to: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Template error: {0}")]
    Template(String),
}

impl Error {
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    pub fn api(platform: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            platform: platform.into(),
            message: message.into(),
            status_code: None,
        }
    }

    pub fn api_with_status(
        platform: impl Into<String>,
        message: impl Into<String>,
        status_code: u16,
    ) -> Self {
        Self::Api {
            platform: platform.into(),
            message: message.into(),
            status_code: Some(status_code),
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Upstream answered 503: the model or service is temporarily overloaded.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Api { status_code: Some(503), .. })
    }

    /// Upstream quota exhausted (429).
    pub fn is_quota_exhausted(&self) -> bool {
        matches!(self, Self::RateLimit { .. })
    }

    /// The response arrived but its content could not be turned into an itinerary.
    pub fn is_malformed_response(&self) -> bool {
        matches!(self, Self::Parse(_) | Self::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
