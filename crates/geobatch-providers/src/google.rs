//! Google Maps Geocoding API profile.
//!
//! Always answers HTTP 200; the outcome is carried in `status`.
//! <https://developers.google.com/maps/documentation/geocoding/requests-geocoding#StatusCodes>

use serde::Deserialize;

use geobatch_core::{Candidate, Coordinate, GeocodeError};
use geobatch_http::ProviderApi;

use crate::{decode, trim_base, usable};

pub const NAME: &str = "google";
pub const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com";
pub const KEY_ENV: &str = "GOOGLE_MAPS_API_KEY";

#[derive(Debug, Clone)]
pub struct Google {
    base_url: String,
    api_key: String,
}

impl Google {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = trim_base(url);
        self
    }
}

#[derive(Debug, Deserialize)]
struct Response {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: String,
    geometry: Geometry,
    #[serde(default)]
    types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

fn status_error(status: &str, message: Option<String>) -> GeocodeError {
    let provider = NAME.to_string();
    let reason = message.unwrap_or_else(|| status.to_string());
    match status {
        "OVER_QUERY_LIMIT" => GeocodeError::RateLimited { provider },
        "OVER_DAILY_LIMIT" => GeocodeError::QuotaExhausted { provider, reason },
        "UNKNOWN_ERROR" => GeocodeError::Unavailable {
            provider,
            status: 500,
        },
        "REQUEST_DENIED" | "INVALID_REQUEST" => GeocodeError::Rejected { provider, reason },
        other => GeocodeError::InvalidResponse {
            provider,
            reason: format!("unexpected status {other}: {reason}"),
        },
    }
}

impl ProviderApi for Google {
    fn name(&self) -> &str {
        NAME
    }

    fn request(&self, http: &reqwest::Client, query: &str) -> reqwest::RequestBuilder {
        http.get(format!("{}/maps/api/geocode/json", self.base_url))
            .query(&[("address", query), ("key", self.api_key.as_str())])
    }

    fn parse(&self, _query: &str, body: &str) -> Result<Vec<Candidate>, GeocodeError> {
        let resp: Response = decode(NAME, body)?;
        match resp.status.as_str() {
            "OK" => {
                let returned = resp.results.len();
                let candidates = resp
                    .results
                    .into_iter()
                    .filter_map(|r| {
                        let loc = r.geometry.location;
                        let coordinate = Coordinate::new(loc.lat, loc.lng)?;
                        Some(Candidate {
                            label: r.formatted_address,
                            coordinate,
                            place_type: r.types.into_iter().next(),
                            score: None,
                        })
                    })
                    .collect();
                usable(NAME, returned, candidates)
            }
            "ZERO_RESULTS" => Ok(Vec::new()),
            other => Err(status_error(other, resp.error_message)),
        }
    }
}
