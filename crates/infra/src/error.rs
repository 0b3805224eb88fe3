use thiserror::Error;

use tingo_auth::StoreError;

/// Failure talking to the hosted backend (or its in-memory stand-in).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Transport failure, timeout or 5xx.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The backend understood the request and refused it.
    #[error("backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The response did not have the expected shape.
    #[error("unexpected backend response: {0}")]
    Decode(String),

    #[error("not found")]
    NotFound,
}

impl BackendError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Rejected { status, .. } if (400..500).contains(status))
            || matches!(self, Self::NotFound)
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Decode(e.to_string())
        } else {
            Self::Unavailable(e.to_string())
        }
    }
}

/// The gate treats every backend failure as "cannot decide".
impl From<BackendError> for StoreError {
    fn from(e: BackendError) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}
