//! Asynchronous API client core for the Localskills service.
//!
//! # Overview
//! Every call goes through [`LocalskillsClient::send`], which authenticates,
//! retries transport failures and `429`/`5xx` responses with exponential
//! backoff, and honours a [`CancellationToken`]. The JSON envelope
//! `{"success", "data", "error"}` is unwrapped by
//! [`LocalskillsClient::decode_json`], which turns failures into a typed
//! [`ApiError`]. Resource-level methods (skills, tenants, tokens, ...) live
//! in [`api`] and are thin wrappers over those two.
//!
//! # Design
//! - The client is `Clone` and shares one connection pool and one immutable
//!   [`ClientConfig`]; it is safe to use from many tasks at once.
//! - `404` and `401`/`403` are distinguishable through
//!   [`ApiError::is_not_found`] and [`ApiError::is_unauthorized`], so callers
//!   can treat a vanished resource as removed ([`NotFoundExt::or_gone`]).
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod api;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod http;
pub mod logging;
pub mod query;
pub mod retry;
pub mod types;

pub use client::{LocalskillsClient, NO_BODY};
pub use config::{ClientConfig, ConfigError};
pub use envelope::Envelope;
pub use error::{is_not_found, is_unauthorized, ApiError, AttemptFailure, NotFoundExt};
pub use http::{HttpMethod, RawResponse};
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use query::Query;
pub use retry::RetryPolicy;
pub use tokio_util::sync::CancellationToken;
pub use types::*;
