//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`LightControlError`] via `From`, so that port boundaries only ever see
//! one error type.

/// Top-level error shared by ports and services.
#[derive(Debug, thiserror::Error)]
pub enum LightControlError {
    /// A domain invariant was violated.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// An inbound payload could not be decoded.
    #[error("malformed message")]
    Decode(#[from] DecodeError),

    /// The key/value or publish/subscribe substrate failed.
    #[error("state store error")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The physical light driver failed.
    #[error("light driver error")]
    Driver(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Domain invariant violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A group id outside `1..=count` was addressed.
    #[error("group {id} is outside the configured range 1..={count}")]
    GroupOutOfRange { id: u8, count: u8 },

    /// A program start time was not `HH:MM`.
    #[error("invalid program start time {0:?}")]
    InvalidStartTime(String),

    /// A program must last at least one second.
    #[error("program duration must be non-zero")]
    ZeroDuration,
}

/// Errors raised while decoding channel payloads.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The payload was not valid JSON or did not match the expected shape.
    #[error("invalid JSON payload")]
    Json(#[from] serde_json::Error),

    /// The `command` field named a command this system does not know.
    #[error("unknown command {0:?}")]
    UnknownCommand(String),

    /// The `source` field was not one of `manual`, `trigger`, `program`.
    #[error("unknown command source {0:?}")]
    UnknownSource(String),

    /// A color was present but empty.
    #[error("color must not be empty")]
    EmptyColor,

    /// A timer duration was negative, not finite or too long.
    #[error("invalid timer duration {0}")]
    InvalidDuration(f64),
}
