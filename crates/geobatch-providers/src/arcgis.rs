//! Esri ArcGIS World Geocoding Service profile.
//!
//! Errors usually arrive as HTTP 200 with an `error` object in the body.
//! <https://developers.arcgis.com/rest/geocode/api-reference/geocoding-find-address-candidates.htm>

use serde::Deserialize;

use geobatch_core::{Candidate, Coordinate, GeocodeError};
use geobatch_http::ProviderApi;

use crate::{decode, trim_base, usable};

pub const NAME: &str = "arcgis";
pub const DEFAULT_BASE_URL: &str = "https://geocode.arcgis.com";
pub const KEY_ENV: &str = "ARCGIS_API_KEY";
const PATH: &str = "/arcgis/rest/services/World/GeocodeServer/findAddressCandidates";

#[derive(Debug, Clone)]
pub struct ArcGis {
    base_url: String,
    token: Option<String>,
    max_locations: u32,
}

impl Default for ArcGis {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            max_locations: 5,
        }
    }
}

impl ArcGis {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token,
            ..Self::default()
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
    candidates: Vec<RawCandidate>,
    #[serde(default)]
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RawCandidate {
    address: String,
    location: Location,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    attributes: Option<Attributes>,
}

#[derive(Debug, Deserialize)]
struct Location {
    x: f64,
    y: f64,
}

#[derive(Debug, Deserialize)]
struct Attributes {
    #[serde(default, rename = "Addr_type")]
    addr_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    details: Vec<String>,
}

fn envelope_error(err: ErrorBody) -> GeocodeError {
    let reason = if err.details.is_empty() {
        err.message
    } else {
        format!("{} ({})", err.message, err.details.join("; "))
    };
    match err.code {
        code @ 500..=599 => GeocodeError::Unavailable {
            provider: NAME.to_string(),
            status: code as u16,
        },
        code => GeocodeError::Rejected {
            provider: NAME.to_string(),
            reason: format!("code {code}: {reason}"),
        },
    }
}

impl ProviderApi for ArcGis {
    fn name(&self) -> &str {
        NAME
    }

    fn request(&self, http: &reqwest::Client, query: &str) -> reqwest::RequestBuilder {
        let req = http.get(format!("{}{PATH}", self.base_url)).query(&[
            ("SingleLine", query),
            ("f", "json"),
            ("outFields", "Addr_type"),
            ("maxLocations", self.max_locations.to_string().as_str()),
        ]);
        match &self.token {
            Some(token) => req.query(&[("token", token.as_str())]),
            None => req,
        }
    }

    fn parse(&self, _query: &str, body: &str) -> Result<Vec<Candidate>, GeocodeError> {
        let resp: Response = decode(NAME, body)?;
        if let Some(err) = resp.error {
            return Err(envelope_error(err));
        }
        let returned = resp.candidates.len();
        let candidates = resp
            .candidates
            .into_iter()
            .filter_map(|c| {
                let coordinate = Coordinate::new(c.location.y, c.location.x)?;
                Some(Candidate {
                    label: c.address,
                    coordinate,
                    place_type: c.attributes.and_then(|a| a.addr_type),
                    score: c.score,
                })
            })
            .collect();
        usable(NAME, returned, candidates)
    }
}
