use std::time::Duration;

use thiserror::Error;

/// Page- and session-level failures. Field- and section-level absence never
/// reaches this type; it is absorbed as an empty value.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("timed out after {waited:?} waiting for {what}")]
    Timeout { what: String, waited: Duration },
    #[error("Login failed. Check your credentials or if there's a CAPTCHA challenge.")]
    AuthFailure,
    #[error("could not load {0}")]
    PageLoad(String),
    #[error("store error: {0}")]
    Store(#[source] anyhow::Error),
    #[error("browser error: {0}")]
    Browser(#[from] anyhow::Error),
}

impl ScrapeError {
    pub fn timeout(what: impl Into<String>, waited: Duration) -> Self {
        ScrapeError::Timeout {
            what: what.into(),
            waited,
        }
    }
}

pub type ScrapeResult<T> = std::result::Result<T, ScrapeError>;
