//! Geocodio profile (US and Canada, API key required).
//!
//! Errors are plain HTTP statuses with `{"error": "..."}` bodies; 403 covers
//! both bad keys and exhausted credits.

use serde::Deserialize;

use geobatch_core::{Candidate, Coordinate, GeocodeError};
use geobatch_http::ProviderApi;

use crate::{decode, trim_base, usable};

pub const NAME: &str = "geocodio";
pub const DEFAULT_BASE_URL: &str = "https://api.geocod.io";
pub const API_VERSION: &str = "v1.7";
pub const KEY_ENV: &str = "GEOCODIO_API_KEY";

#[derive(Debug, Clone)]
pub struct Geocodio {
    base_url: String,
    api_key: String,
}

impl Geocodio {
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
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: String,
    location: LatLng,
    #[serde(default)]
    accuracy: Option<f64>,
    #[serde(default)]
    accuracy_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

impl ProviderApi for Geocodio {
    fn name(&self) -> &str {
        NAME
    }

    fn request(&self, http: &reqwest::Client, query: &str) -> reqwest::RequestBuilder {
        http.get(format!("{}/{API_VERSION}/geocode", self.base_url))
            .query(&[("q", query), ("api_key", self.api_key.as_str())])
    }

    fn parse(&self, _query: &str, body: &str) -> Result<Vec<Candidate>, GeocodeError> {
        let resp: Response = decode(NAME, body)?;
        let returned = resp.results.len();
        let candidates = resp
            .results
            .into_iter()
            .filter_map(|r| {
                let coordinate = Coordinate::new(r.location.lat, r.location.lng)?;
                Some(Candidate {
                    label: r.formatted_address,
                    coordinate,
                    place_type: r.accuracy_type,
                    score: r.accuracy,
                })
            })
            .collect();
        usable(NAME, returned, candidates)
    }

    fn classify_status(&self, status: u16, body: &str) -> GeocodeError {
        let provider = NAME.to_string();
        let reason = decode::<ErrorBody>(NAME, body)
            .map(|e| e.error)
            .unwrap_or_else(|_| format!("HTTP {status}"));
        let lower = reason.to_lowercase();
        if status == 403 && (lower.contains("limit") || lower.contains("credit")) {
            GeocodeError::QuotaExhausted { provider, reason }
        } else {
            GeocodeError::Rejected { provider, reason }
        }
    }
}
