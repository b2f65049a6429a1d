//! Domain errors surfaced by the services and mapped to HTTP statuses
//! by the REST layer. Storage-level failures stay as `anyhow::Error`
//! and surface as 500s.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    /// Month token did not match `YYYY-MM`.
    #[error("invalid month token: {0:?} (expected YYYY-MM)")]
    InvalidMonth(String),

    /// Report date did not match `YYYY-MM-DD`.
    #[error("invalid report date: {0:?} (expected YYYY-MM-DD)")]
    InvalidDate(String),

    /// Amounts submitted to the goal workflow must be >= 0.
    #[error("negative amount: {field} = {value}")]
    NegativeAmount { field: &'static str, value: f64 },

    #[error("invalid username or password")]
    BadCredentials,

    #[error("username already exists: {0}")]
    DuplicateUser(String),

    #[error("unknown user: {0}")]
    UnknownUser(String),

    /// A required field was empty.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// Underlying store failure (unreachable, write rejected).
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}
