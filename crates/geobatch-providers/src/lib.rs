//! geobatch-providers: pre-configured profiles for public geocoding services.
//!
//! Each provider module knows its endpoint, key handling, response envelope
//! and error vocabulary. [`profile`] turns declarative [`BackendSpec`]s into
//! a ready fallback chain.
//!
//! # Quick start
//! ```rust,no_run
//! use geobatch_http::HttpClientConfig;
//! use geobatch_providers::{build_chain, BackendSpec, ProviderKind};
//!
//! let specs = vec![
//!     BackendSpec::new(ProviderKind::Nominatim),
//!     BackendSpec::new(ProviderKind::Census),
//! ];
//! let chain = build_chain(&specs, &HttpClientConfig::default()).unwrap();
//! assert_eq!(chain.len(), 2);
//! ```

pub mod arcgis;
pub mod census;
pub mod geocodio;
pub mod google;
pub mod nominatim;
pub mod profile;

pub use profile::{build_backend, build_chain, BackendSpec, ProviderKind};

use geobatch_core::{Candidate, GeocodeError};
use serde::de::DeserializeOwned;

/// Decode a provider body, reporting failures as `InvalidResponse`.
pub(crate) fn decode<T: DeserializeOwned>(provider: &str, body: &str) -> Result<T, GeocodeError> {
    serde_json::from_str(body).map_err(|e| GeocodeError::InvalidResponse {
        provider: provider.to_string(),
        reason: e.to_string(),
    })
}

/// Candidates with unusable coordinates are dropped; a response where every
/// candidate was unusable is an `InvalidResponse`, not a miss.
pub(crate) fn usable(
    provider: &str,
    returned: usize,
    candidates: Vec<Candidate>,
) -> Result<Vec<Candidate>, GeocodeError> {
    if returned > 0 && candidates.is_empty() {
        return Err(GeocodeError::InvalidResponse {
            provider: provider.to_string(),
            reason: format!("none of {returned} candidates had a valid coordinate"),
        });
    }
    Ok(candidates)
}

/// Strip a trailing slash so endpoint paths can be appended verbatim.
pub(crate) fn trim_base(url: impl Into<String>) -> String {
    let mut url = url.into();
    while url.ends_with('/') {
        url.pop();
    }
    url
}
