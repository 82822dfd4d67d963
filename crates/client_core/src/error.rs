use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportFetchError {
    #[error("invalid endpoint url: {0}")]
    Url(#[from] url::ParseError),
    #[error("endpoint url cannot carry path segments: {0}")]
    NotABase(String),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollConfigError {
    #[error("max_attempts must be at least 1")]
    ZeroAttempts,
    #[error("poll interval must be greater than zero")]
    ZeroInterval,
}

#[derive(Debug, Error)]
pub enum PollerError {
    #[error("no polling session has been started")]
    NoSession,
}
