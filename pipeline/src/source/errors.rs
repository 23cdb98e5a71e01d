use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchCause {
    #[error("timed out")]
    Timeout,

    #[error("http status {0}")]
    Status(u16),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("unreadable body: {0}")]
    Body(String),

    #[error("client error: {0}")]
    Client(String),
}

/// A source could not be fetched. Always converted into a per-source
/// failure flag; never aborts the cycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("fetch from {source_name} failed: {cause}")]
pub struct FetchError {
    pub source_name: String,
    pub cause: FetchCause,
}

impl FetchError {
    pub fn new(source_name: impl Into<String>, cause: FetchCause) -> Self {
        Self {
            source_name: source_name.into(),
            cause,
        }
    }

    pub fn from_reqwest(source_name: &str, err: &reqwest::Error) -> Self {
        let cause = if err.is_timeout() {
            FetchCause::Timeout
        } else if let Some(status) = err.status() {
            FetchCause::Status(status.as_u16())
        } else if err.is_connect() {
            FetchCause::Connect(err.to_string())
        } else if err.is_body() || err.is_decode() {
            FetchCause::Body(err.to_string())
        } else {
            FetchCause::Client(err.to_string())
        };
        Self::new(source_name, cause)
    }
}
