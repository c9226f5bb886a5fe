//! Error types returned by the SDK.

use http::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Failures raised by an [`crate::HttpClient`] backend before any response was received.
#[derive(Debug, Error)]
pub enum HttpClientError {
    #[error("request timed out")]
    Timeout,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("HTTP backend error: {0}")]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

/// Every failure a [`crate::GithubClient`] call can produce.
#[derive(Debug, Error)]
pub enum GithubError {
    #[error("HTTP client error: {0}")]
    Http(#[from] HttpClientError),

    #[error("GitHub returned HTTP {status}: {message}")]
    Api { status: StatusCode, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("unsupported content encoding `{0}`")]
    UnsupportedEncoding(String),

    #[error("path resolved to a directory, not a file: {0}")]
    NotAFile(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl GithubError {
    /// The HTTP status GitHub answered with, if the request made it that far.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// Whether the request was rejected because the supplied blob `sha` is stale.
    ///
    /// GitHub reports this as `409 Conflict`, or as `422` with a message naming the sha.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        match self {
            Self::Api { status, .. } if *status == StatusCode::CONFLICT => true,
            Self::Api { status, message } if *status == StatusCode::UNPROCESSABLE_ENTITY => {
                message.contains("sha")
            }
            _ => false,
        }
    }

    /// Build an [`GithubError::Api`] from a non-success response body.
    pub(crate) fn from_response(status: StatusCode, body: &[u8]) -> Self {
        #[derive(Deserialize)]
        struct ApiMessage {
            message: String,
        }

        let message = serde_json::from_slice::<ApiMessage>(body).map_or_else(
            |_| String::from_utf8_lossy(body).trim().to_owned(),
            |m| m.message,
        );
        Self::Api { status, message }
    }
}
