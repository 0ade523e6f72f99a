//! U.S. Census Bureau geocoder profile (one-line address, no key).
//!
//! US street addresses only; institute names rarely match, so it works best
//! late in a chain.

use serde::Deserialize;

use geobatch_core::{Candidate, Coordinate, GeocodeError};
use geobatch_http::ProviderApi;

use crate::{decode, trim_base, usable};

pub const NAME: &str = "census";
pub const DEFAULT_BASE_URL: &str = "https://geocoding.geo.census.gov";
pub const BENCHMARK: &str = "Public_AR_Current";

#[derive(Debug, Clone)]
pub struct Census {
    base_url: String,
}

impl Default for Census {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl Census {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = trim_base(url);
        self
    }
}

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    result: Option<ResultBody>,
    #[serde(default)]
    errors: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ResultBody {
    #[serde(default, rename = "addressMatches")]
    address_matches: Vec<AddressMatch>,
}

#[derive(Debug, Deserialize)]
struct AddressMatch {
    #[serde(rename = "matchedAddress")]
    matched_address: String,
    coordinates: Xy,
}

#[derive(Debug, Deserialize)]
struct Xy {
    x: f64,
    y: f64,
}

impl ProviderApi for Census {
    fn name(&self) -> &str {
        NAME
    }

    fn request(&self, http: &reqwest::Client, query: &str) -> reqwest::RequestBuilder {
        http.get(format!("{}/geocoder/locations/onelineaddress", self.base_url))
            .query(&[("address", query), ("benchmark", BENCHMARK), ("format", "json")])
    }

    fn parse(&self, _query: &str, body: &str) -> Result<Vec<Candidate>, GeocodeError> {
        let resp: Response = decode(NAME, body)?;
        if !resp.errors.is_empty() {
            return Err(GeocodeError::Rejected {
                provider: NAME.to_string(),
                reason: resp.errors.join("; "),
            });
        }
        let matches = resp.result.map(|r| r.address_matches).unwrap_or_default();
        let returned = matches.len();
        let candidates = matches
            .into_iter()
            .filter_map(|m| {
                Coordinate::new(m.coordinates.y, m.coordinates.x)
                    .map(|c| Candidate::new(m.matched_address, c))
            })
            .collect();
        usable(NAME, returned, candidates)
    }

    fn classify_status(&self, status: u16, body: &str) -> GeocodeError {
        // 400s carry the same `errors` envelope as 200s.
        let reason = decode::<Response>(NAME, body)
            .ok()
            .filter(|r| !r.errors.is_empty())
            .map(|r| r.errors.join("; "))
            .unwrap_or_else(|| format!("HTTP {status}"));
        GeocodeError::Rejected {
            provider: NAME.to_string(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn x_is_longitude() {
        let body = r#"{"result":{"addressMatches":[{"matchedAddress":"1600 PENNSYLVANIA AVE NW, WASHINGTON, DC, 20500","coordinates":{"x":-77.03535,"y":38.898754}}]}}"#;
        let out = Census::new().parse("q", body).unwrap();
        assert_eq!(out.len(), 1);
        assert!((out[0].coordinate.lat - 38.898754).abs() < 1e-9);
        assert!((out[0].coordinate.lon + 77.03535).abs() < 1e-9);
    }

    #[test]
    fn error_status_uses_envelope_text() {
        let body = r#"{"errors":["Address cannot be empty and cannot exceed 100 characters"],"status":"400"}"#;
        let err = Census::new().classify_status(400, body);
        assert!(err.to_string().contains("cannot be empty"), "{err}");
    }
}
