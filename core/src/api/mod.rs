//! Typed endpoint surface of the Localskills API.
//!
//! Each submodule adds one group of methods to [`LocalskillsClient`]. They are
//! thin: build the path (identifiers percent-encoded, query appended), pick a
//! method, and hand off to `fetch`, `fetch_list` or `execute`. Retry,
//! authentication and error classification all happen in the client.
//!
//! [`LocalskillsClient`]: crate::LocalskillsClient

mod oidc;
mod skills;
mod sso;
mod tenants;
mod tokens;
mod user;
mod versions;
