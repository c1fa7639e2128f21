//! Error types for the Localskills API client.
//!
//! # Design
//! `Api` is the only variant the resource layer inspects: it carries the real
//! HTTP status and the server's best-effort message, and the two predicates
//! [`ApiError::is_not_found`] and [`ApiError::is_unauthorized`] look only at
//! it. Everything else (transport, exhausted retries, decode, cancellation)
//! is a hard failure for the caller.

use thiserror::Error;

use crate::config::ConfigError;

/// Cause of the last failed attempt inside a retry sequence.
#[derive(Debug, Error)]
pub enum AttemptFailure {
    /// The request never produced a response (connect, DNS, timeout).
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    /// The server answered with 429 or a 5xx status.
    #[error("retryable status code: {0}")]
    Status(u16),
}

/// Errors returned by `LocalskillsClient`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The API answered with a failure, either through an HTTP status >= 400
    /// or through `success: false` in the envelope.
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The request could not be built or sent.
    #[error("sending request: {0}")]
    Transport(#[from] reqwest::Error),

    /// Every attempt in the retry budget failed.
    #[error("request failed after {retries} retries: {source}")]
    RetriesExhausted {
        retries: u32,
        last_status: Option<u16>,
        #[source]
        source: AttemptFailure,
    },

    /// A response with a success status did not match the envelope contract.
    #[error("decoding response: {0}")]
    Decode(#[source] serde_json::Error),

    /// The request body could not be serialized to JSON.
    #[error("marshaling request body: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The envelope reported success but carried no `data`.
    #[error("response envelope has no data")]
    MissingData,

    /// The caller's cancellation token fired.
    #[error("request cancelled")]
    Cancelled,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ApiError {
    /// True iff this is a typed API error with status 404.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// True iff this is a typed API error with status 401 or 403.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled)
    }

    /// Status of a typed API error. Exhausted retries report `None` here even
    /// when the last attempt had a status; see `RetriesExhausted::last_status`.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Server message of a typed API error.
    pub fn message(&self) -> Option<&str> {
        match self {
            ApiError::Api { message, .. } => Some(message),
            _ => None,
        }
    }
}

pub fn is_not_found(err: &ApiError) -> bool {
    err.is_not_found()
}

pub fn is_unauthorized(err: &ApiError) -> bool {
    err.is_unauthorized()
}

/// Recovery rule of the resource layer: a read or delete that hits 404 means
/// the remote object is already gone.
pub trait NotFoundExt<T> {
    /// Maps a not-found error to `Ok(None)` and passes every other result
    /// through.
    fn or_gone(self) -> Result<Option<T>, ApiError>;
}

impl<T> NotFoundExt<T> for Result<T, ApiError> {
    fn or_gone(self) -> Result<Option<T>, ApiError> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }
}
