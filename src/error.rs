//! Crate-wide error and status types.
//!
//! Repository methods never throw across their boundary (spec §7): every
//! fallible operation returns a [`ForumError`], which the HTTP layer maps to
//! a status code in [`ForumError::http_status`]. Invariant violations inside
//! indexing/mutation code are bugs, not recoverable errors, and are left to
//! panic.

use thiserror::Error;

/// The full set of outcomes a repository command or query can produce.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ForumError {
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("value too long: {field} (max {max})")]
    ValueTooLong { field: String, max: usize },

    #[error("value too short: {field} (min {min})")]
    ValueTooShort { field: String, min: usize },

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("a user with the same authentication handle already exists")]
    UserWithSameAuthAlreadyExists,

    #[error("no effect")]
    NoEffect,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("circular reference not allowed")]
    CircularReferenceNotAllowed,

    #[error("not allowed")]
    NotAllowed,

    #[error("unauthorized")]
    Unauthorized,

    #[error("throttled, retry after {retry_after_secs}s")]
    Throttled { retry_after_secs: u64 },

    #[error("not updated since last check")]
    NotUpdatedSinceLastCheck,
}

impl ForumError {
    /// Maps a repository-level outcome to the HTTP status code from spec §7.
    pub fn http_status(&self) -> u16 {
        match self {
            ForumError::InvalidParameters(_)
            | ForumError::ValueTooLong { .. }
            | ForumError::ValueTooShort { .. }
            | ForumError::AlreadyExists(_)
            | ForumError::UserWithSameAuthAlreadyExists
            | ForumError::NoEffect => 200,
            ForumError::NotFound(_) => 404,
            ForumError::CircularReferenceNotAllowed => 403,
            ForumError::NotAllowed => 403,
            ForumError::Unauthorized => 401,
            ForumError::Throttled { .. } => 429,
            ForumError::NotUpdatedSinceLastCheck => 304,
        }
    }

    /// A short machine-readable code, stable across versions, carried in the
    /// JSON error body (the exact JSON shape is left to the caller per
    /// spec §1 "out of scope").
    pub fn code(&self) -> &'static str {
        match self {
            ForumError::InvalidParameters(_) => "INVALID_PARAMETERS",
            ForumError::ValueTooLong { .. } => "VALUE_TOO_LONG",
            ForumError::ValueTooShort { .. } => "VALUE_TOO_SHORT",
            ForumError::AlreadyExists(_) => "ALREADY_EXISTS",
            ForumError::UserWithSameAuthAlreadyExists => "USER_WITH_SAME_AUTH_ALREADY_EXISTS",
            ForumError::NoEffect => "NO_EFFECT",
            ForumError::NotFound(_) => "NOT_FOUND",
            ForumError::CircularReferenceNotAllowed => "CIRCULAR_REFERENCE_NOT_ALLOWED",
            ForumError::NotAllowed => "NOT_ALLOWED",
            ForumError::Unauthorized => "UNAUTHORIZED",
            ForumError::Throttled { .. } => "THROTTLED",
            ForumError::NotUpdatedSinceLastCheck => "NOT_UPDATED_SINCE_LAST_CHECK",
        }
    }
}

pub type ForumResult<T> = Result<T, ForumError>;
