//! The `ProviderApi` trait: everything provider-specific about an HTTP geocoder.

use geobatch_core::{Candidate, GeocodeError};

/// Request/response shape of one geocoding provider.
///
/// Implementations are plain data (base URL, key, options); the transport
/// concerns live in [`crate::HttpGeocoder`].
pub trait ProviderApi: Send + Sync + 'static {
    /// Stable backend name used in logs and results.
    fn name(&self) -> &str;

    /// Build the request for one trimmed, non-empty query.
    fn request(&self, http: &reqwest::Client, query: &str) -> reqwest::RequestBuilder;

    /// Parse a 2xx body into candidates, best first.
    ///
    /// An empty list means "no match". Provider-level error envelopes
    /// delivered with a 2xx status must be mapped to an error here.
    fn parse(&self, query: &str, body: &str) -> Result<Vec<Candidate>, GeocodeError>;

    /// Pick the candidate that answers `query`. Defaults to the first.
    fn select<'a>(&self, _query: &str, candidates: &'a [Candidate]) -> Option<&'a Candidate> {
        candidates.first()
    }

    /// Map a non-2xx status that is not already transient.
    fn classify_status(&self, status: u16, body: &str) -> GeocodeError {
        GeocodeError::Rejected {
            provider: self.name().to_string(),
            reason: format!("HTTP {status}: {}", truncate(body, 200)),
        }
    }
}

/// Classify a non-2xx response.
///
/// 429 and the usual temporary-unavailability statuses are transient for
/// every provider; anything else goes through [`ProviderApi::classify_status`].
pub fn classify_status<A: ProviderApi + ?Sized>(api: &A, status: u16, body: &str) -> GeocodeError {
    match status {
        429 => GeocodeError::RateLimited {
            provider: api.name().to_string(),
        },
        408 | 500 | 502 | 503 | 504 => GeocodeError::Unavailable {
            provider: api.name().to_string(),
            status,
        },
        _ => api.classify_status(status, body),
    }
}

pub(crate) fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}
