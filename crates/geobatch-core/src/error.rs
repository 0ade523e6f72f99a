//! Backend-level and configuration error types.

use thiserror::Error;

/// How the fallback chain reacts to a failed backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Retry on the same backend (bounded by the retry limit).
    Transient,
    /// Move on to the next backend immediately.
    Permanent,
}

impl std::fmt::Display for FailureClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transient => write!(f, "transient"),
            Self::Permanent => write!(f, "permanent"),
        }
    }
}

/// Errors a single `Geocoder::resolve` call can report.
///
/// "No match" is not an error: backends return `Ok(None)` for it.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// Connection refused, reset, DNS failure and similar transport errors.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Request timed out after the configured duration.
    #[error("Request timed out after {ms}ms")]
    Timeout { ms: u64 },

    /// Provider answered with a temporary-unavailability status.
    #[error("Service unavailable (provider: {provider}, status: {status})")]
    Unavailable { provider: String, status: u16 },

    /// Provider asked us to slow down.
    #[error("Rate limit exceeded (provider: {provider})")]
    RateLimited { provider: String },

    /// Daily/monthly quota or account credits are used up.
    #[error("Quota exhausted (provider: {provider}): {reason}")]
    QuotaExhausted { provider: String, reason: String },

    /// Malformed query, bad API key or any other refused request.
    #[error("Request rejected by {provider}: {reason}")]
    Rejected { provider: String, reason: String },

    /// Provider answered 2xx but the payload made no sense.
    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    /// Response body could not be deserialized.
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),

    /// An unexpected error.
    #[error("{0}")]
    Other(String),
}

impl GeocodeError {
    /// Returns `true` if this error is worth retrying on the same backend.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Http(_)
                | Self::Timeout { .. }
                | Self::Unavailable { .. }
                | Self::RateLimited { .. }
        )
    }

    pub fn class(&self) -> FailureClass {
        if self.is_transient() {
            FailureClass::Transient
        } else {
            FailureClass::Permanent
        }
    }
}

/// Batch configuration rejected before any work starts.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no geocoding backends configured")]
    NoBackends,

    #[error("max_parallel must be at least 1")]
    ZeroParallelism,

    #[error("backend '{backend}' requires an API key")]
    MissingApiKey { backend: String },

    #[error("unknown geocoding backend '{0}'")]
    UnknownBackend(String),

    #[error("failed to build HTTP client for '{backend}': {reason}")]
    Client { backend: String, reason: String },
}
