//! Client-side error types.

use pi_upstream::UpstreamError;
use serde::Deserialize;
use thiserror::Error;

/// Why a query fetch failed. Cloneable so it can live in query state.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// The backend answered with a non-success status.
    #[error("backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    /// Connection failure, DNS, TLS, malformed URL, etc.
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Parse(err.to_string())
        } else {
            ClientError::Http(err.to_string())
        }
    }
}

/// Outcome of a failed [`crate::SearchClient::search`].
#[derive(Debug, Clone, Error)]
pub enum SearchError {
    /// The backend rejected the query (HTTP 400).
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The backend gave up waiting for the upstream (HTTP 504).
    #[error("search timed out: {0}")]
    TimedOut(String),

    /// Any other non-success answer.
    #[error("search failed ({status}): {message}")]
    Failed { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("parse error: {0}")]
    Parse(String),
}

impl SearchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, SearchError::TimedOut(_))
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SearchError::Parse(err.to_string())
        } else {
            SearchError::Http(err.to_string())
        }
    }
}

/// `{error, details?}` as produced by the backend's error responses.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
    #[serde(default)]
    pub details: Option<String>,
}

impl ErrorBody {
    pub(crate) fn message(self) -> String {
        match self.details {
            Some(details) => format!("{}: {}", self.error, details),
            None => self.error,
        }
    }
}
