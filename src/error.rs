//! Crate-wide error taxonomy.

use crate::types::DateTime;

/// Failure modes of the engine.
///
/// Per-simulation failures abort only that simulation; indicator failures abort only that
/// indicator's task. Messages carry the offending date and/or instrument so callers never see a
/// bare crash.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Addressing a row that does not exist: a non-negative index, an offset earlier than the
    /// active calendar, or advancing past the last known day.
    #[error("out of range: {0}")]
    OutOfRange(String),

    /// Mutation attempted without the matching access key, or setting a key twice. Indicates a
    /// wiring bug and is never retried.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// A position that cannot be traded: zero-sum at normalization or referencing an instrument
    /// outside the configured target.
    #[error("invalid position on {date}: {reason}")]
    InvalidPosition { date: DateTime, reason: String },

    /// Malformed simulation configuration or dataset, rejected before any step runs.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A requested indicator name is not registered. Fatal to that evaluation request only.
    #[error("indicator not found: {0}")]
    IndicatorNotFound(String),
}

pub type Result<T> = std::result::Result<T, Error>;
