//! Error taxonomy for the gNMI data-access layer.
//!
//! The taxonomy is semantic rather than typed-per-call-site: every fallible
//! operation in this workspace returns a [`GnmiError`], and callers (chiefly
//! the external gRPC transport, out of scope here) map `status_code()` onto
//! whatever RPC status type they use. Keeping the mapping as a plain string
//! code means this crate never depends on `tonic`.

use thiserror::Error;

/// Result type used throughout the gNMI data-access layer.
pub type GnmiResult<T> = std::result::Result<T, GnmiError>;

/// Errors produced by the gNMI core. Variant names mirror the taxonomy in
/// the design document rather than the implementation detail that raised
/// them, so unrelated subsystems (resolver, queue, set engine) can share one
/// enum.
#[derive(Debug, Error, Clone)]
pub enum GnmiError {
    /// Malformed target, malformed path shape, sampling interval below the
    /// minimum, unsupported subscription mode, non-IETF-JSON value in a
    /// CONFIG_DB set, or an unsupported per-field set.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Path shape resolved but the target key/field was absent in Redis at
    /// resolve time.
    #[error("not found: {0}")]
    NotFound(String),

    /// The priority queue's byte cap would be exceeded on enqueue.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Redis or a downstream-service RPC failed after retries were
    /// exhausted.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Codec panic, unexpected Redis reply shape, or any other condition
    /// that indicates a programming error rather than bad input.
    #[error("internal error: {0}")]
    Internal(String),
}

impl GnmiError {
    /// Short machine-readable status code, matching gRPC's canonical status
    /// names so an external transport layer can `match` on it without
    /// parsing `Display` output.
    pub fn status_code(&self) -> &'static str {
        match self {
            GnmiError::InvalidArgument(_) => "invalid-argument",
            GnmiError::NotFound(_) => "not-found",
            GnmiError::ResourceExhausted(_) => "resource-exhausted",
            GnmiError::Unavailable(_) => "unavailable",
            GnmiError::Internal(_) => "internal",
        }
    }

    /// True for conditions that may succeed if retried later (currently:
    /// downstream/Redis unavailability).
    pub fn is_retryable(&self) -> bool {
        matches!(self, GnmiError::Unavailable(_))
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        GnmiError::InvalidArgument(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        GnmiError::NotFound(msg.into())
    }

    pub fn resource_exhausted(msg: impl Into<String>) -> Self {
        GnmiError::ResourceExhausted(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        GnmiError::Unavailable(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        GnmiError::Internal(msg.into())
    }
}
