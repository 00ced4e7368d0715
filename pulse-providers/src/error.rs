/// Errors a provider call can end in.
///
/// Sentinel answers ("no data for this identifier") are not errors; they are
/// returned as payloads.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("timeout from {provider}")]
    Timeout { provider: &'static str },

    #[error("hard-stop rate limit from {provider}")]
    HardRateLimit { provider: &'static str },

    #[error("{provider} is halted after a hard-stop rate limit")]
    Halted { provider: &'static str },

    #[error("got a 403 for unknown reasons from {provider}")]
    Forbidden { provider: &'static str },

    #[error("got unexpected {provider} status code {status}")]
    UnexpectedStatus { provider: &'static str, status: u16 },

    #[error("empty response from {provider}")]
    EmptyResponse { provider: &'static str },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{provider} authentication failed: {message}")]
    Auth {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} is not configured: {message}")]
    NotConfigured {
        provider: &'static str,
        message: String,
    },
}

impl FetchError {
    /// Map a transport error, keeping timeouts distinct.
    pub fn from_reqwest(provider: &'static str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout { provider }
        } else {
            FetchError::Http(err)
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout { .. })
    }
}

/// Errors loading or saving provider configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },

    #[error("Configuration error: {0}")]
    Other(String),
}
