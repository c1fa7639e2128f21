//! The `{success, data, error}` wrapper every Localskills endpoint returns.
//!
//! # Design
//! The HTTP status and the `success` flag are independent failure signals:
//! the backend answers some validation failures with `200 OK` and
//! `success: false`. [`Outcome`] folds both into one value so the decoding
//! rules live in a single `match` instead of nested checks.

use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Wire envelope. `data` and `error` are omitted when absent; an explicit
/// `null` reads the same as absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Result of interpreting one final HTTP response.
#[derive(Debug)]
pub enum Outcome<T> {
    /// Success; `None` when the envelope carried no `data`.
    Ok(Option<T>),
    /// HTTP status >= 400, or `success: false` under any status.
    Failure { status: u16, message: String },
    /// A success status whose body is not a valid envelope of `T`.
    Malformed(serde_json::Error),
}

impl<T: DeserializeOwned> Outcome<T> {
    pub fn classify(status: u16, body: &[u8]) -> Self {
        if status >= 400 {
            return Outcome::Failure {
                status,
                message: error_message(body),
            };
        }

        match serde_json::from_slice::<Envelope<T>>(body) {
            Err(err) => Outcome::Malformed(err),
            Ok(envelope) if !envelope.success => Outcome::Failure {
                status,
                message: envelope
                    .error
                    .filter(|message| !message.is_empty())
                    .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned()),
            },
            Ok(envelope) => Outcome::Ok(envelope.data),
        }
    }
}

impl<T> Outcome<T> {
    pub fn into_result(self) -> Result<Option<T>, ApiError> {
        match self {
            Outcome::Ok(data) => Ok(data),
            Outcome::Failure { status, message } => Err(ApiError::Api { status, message }),
            Outcome::Malformed(err) => Err(ApiError::Decode(err)),
        }
    }
}

/// Status-only classification for calls that never read the payload: any
/// status below 400 succeeds, whatever the body.
pub fn check_status(status: u16, body: &[u8]) -> Result<(), ApiError> {
    if status >= 400 {
        return Err(ApiError::Api {
            status,
            message: error_message(body),
        });
    }
    Ok(())
}

/// Best-effort message for an error status: the envelope's `error` field when
/// the body is an envelope with one, otherwise the raw body text.
fn error_message(body: &[u8]) -> String {
    serde_json::from_slice::<Envelope<IgnoredAny>>(body)
        .ok()
        .and_then(|envelope| envelope.error)
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: String,
    }

    #[test]
    fn success_returns_data() {
        let outcome = Outcome::<Item>::classify(200, br#"{"success":true,"data":{"id":"a"}}"#);
        let data = outcome.into_result().unwrap();
        assert_eq!(data, Some(Item { id: "a".into() }));
    }

    #[test]
    fn absent_or_null_data_is_none() {
        let absent = Outcome::<Vec<Item>>::classify(200, br#"{"success":true}"#);
        assert!(absent.into_result().unwrap().is_none());

        let null = Outcome::<Vec<Item>>::classify(201, br#"{"success":true,"data":null}"#);
        assert!(null.into_result().unwrap().is_none());
    }

    #[test]
    fn success_false_under_200_is_a_typed_error() {
        let body = br#"{"success":false,"error":"operation failed"}"#;
        for _ in 0..2 {
            let err = Outcome::<Item>::classify(200, body).into_result().unwrap_err();
            assert_eq!(err.status(), Some(200));
            assert_eq!(err.message(), Some("operation failed"));
        }
    }

    #[test]
    fn error_status_prefers_envelope_message() {
        let body = br#"{"success":false,"error":"name is required"}"#;
        let err = Outcome::<Item>::classify(400, body).into_result().unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.message(), Some("name is required"));
    }

    #[test]
    fn error_status_falls_back_to_raw_body() {
        let err = Outcome::<Item>::classify(404, b"<html>not found</html>")
            .into_result()
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.message(), Some("<html>not found</html>"));

        let err = Outcome::<Item>::classify(403, br#"{"success":false}"#)
            .into_result()
            .unwrap_err();
        assert!(err.is_unauthorized());
        assert_eq!(err.message(), Some(r#"{"success":false}"#));
    }

    #[test]
    fn error_status_ignores_data_shape() {
        let body = br#"{"success":false,"error":"conflict","data":[1,2,3]}"#;
        let err = Outcome::<Item>::classify(409, body).into_result().unwrap_err();
        assert_eq!(err.message(), Some("conflict"));
    }

    #[test]
    fn malformed_success_body_is_a_decode_error() {
        let err = Outcome::<Item>::classify(200, b"not json").into_result().unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));

        let err = Outcome::<Item>::classify(200, br#"{"success":true,"data":{"id":7}}"#)
            .into_result()
            .unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn status_check_ignores_success_bodies() {
        assert!(check_status(204, b"").is_ok());
        assert!(check_status(200, b"not json").is_ok());

        let err = check_status(404, br#"{"success":false,"error":"skill not found"}"#).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.message(), Some("skill not found"));
    }

    #[test]
    fn envelope_omits_absent_fields() {
        let json = serde_json::to_string(&Envelope::ok(1)).unwrap();
        assert_eq!(json, r#"{"success":true,"data":1}"#);
    }
}
