//! OpenStreetMap Nominatim provider profile.
//!
//! Usage policy: at most 1 request/s and an identifying User-Agent.
//! <https://operations.osmfoundation.org/policies/nominatim/>

use serde::Deserialize;
use std::time::Duration;

use geobatch_core::{Candidate, ConfigError, Coordinate, GeocodeError};
use geobatch_http::{HttpClientConfig, HttpGeocoder, ProviderApi};

use crate::{decode, trim_base, usable};

pub const NAME: &str = "nominatim";
pub const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";
/// Public instance policy: one request per second.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(1);
/// Candidates fetched per batch lookup.
pub const BATCH_LIMIT: u32 = 5;
/// Candidates fetched for interactive suggestions.
pub const SUGGEST_LIMIT: u32 = 10;

#[derive(Debug, Clone)]
pub struct Nominatim {
    base_url: String,
    limit: u32,
    prefer_institutes: bool,
}

impl Default for Nominatim {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            limit: BATCH_LIMIT,
            prefer_institutes: true,
        }
    }
}

impl Nominatim {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = trim_base(url);
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit.max(1);
        self
    }

    pub fn prefer_institutes(mut self, on: bool) -> Self {
        self.prefer_institutes = on;
        self
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }
}

#[derive(Debug, Deserialize)]
struct Place {
    display_name: String,
    lat: String,
    lon: String,
    #[serde(default, rename = "type")]
    place_type: Option<String>,
    #[serde(default)]
    importance: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SearchResponse {
    Places(Vec<Place>),
    Error { error: serde_json::Value },
}

impl ProviderApi for Nominatim {
    fn name(&self) -> &str {
        NAME
    }

    fn request(&self, http: &reqwest::Client, query: &str) -> reqwest::RequestBuilder {
        let limit = self.limit.to_string();
        http.get(format!("{}/search", self.base_url)).query(&[
            ("q", query),
            ("format", "json"),
            ("limit", limit.as_str()),
            ("addressdetails", "0"),
        ])
    }

    fn parse(&self, _query: &str, body: &str) -> Result<Vec<Candidate>, GeocodeError> {
        match decode::<SearchResponse>(NAME, body)? {
            SearchResponse::Places(places) => {
                let returned = places.len();
                let candidates = places
                    .into_iter()
                    .filter_map(|p| {
                        let coordinate = Coordinate::parse(&p.lat, &p.lon)?;
                        Some(Candidate {
                            label: p.display_name,
                            coordinate,
                            place_type: p.place_type,
                            score: p.importance,
                        })
                    })
                    .collect();
                usable(NAME, returned, candidates)
            }
            SearchResponse::Error { error } => Err(GeocodeError::Rejected {
                provider: NAME.to_string(),
                reason: match error {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                },
            }),
        }
    }

    fn select<'a>(&self, query: &str, candidates: &'a [Candidate]) -> Option<&'a Candidate> {
        if self.prefer_institutes {
            institute_matches(query, candidates).into_iter().next()
        } else {
            candidates.first()
        }
    }
}

/// Narrow a candidate list to the most plausible institutes, keeping order.
///
/// 1. labels mentioning "university" that also contain the query
/// 2. otherwise, candidates typed `university`
/// 3. otherwise, the whole list
pub fn institute_matches<'a>(query: &str, candidates: &'a [Candidate]) -> Vec<&'a Candidate> {
    let needle = query.to_lowercase();
    let named: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| {
            let label = c.label.to_lowercase();
            label.contains("university") && label.contains(&needle)
        })
        .collect();
    if !named.is_empty() {
        return named;
    }

    let typed: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| c.place_type.as_deref() == Some("university"))
        .collect();
    if !typed.is_empty() {
        return typed;
    }

    candidates.iter().collect()
}

/// Build an `HttpGeocoder` paced to the public instance's policy.
pub fn http_client(
    api: Nominatim,
    config: &HttpClientConfig,
) -> Result<HttpGeocoder<Nominatim>, ConfigError> {
    let mut config = config.clone();
    if config.min_interval.is_zero() {
        config.min_interval = DEFAULT_MIN_INTERVAL;
    }
    HttpGeocoder::new(api, &config)
}

/// Ranked suggestions for one query, after institute preference.
pub async fn suggest(
    geocoder: &HttpGeocoder<Nominatim>,
    query: &str,
) -> Result<Vec<Candidate>, GeocodeError> {
    use geobatch_core::Geocoder;

    let candidates = geocoder.candidates(query).await?;
    if !geocoder.api().prefer_institutes {
        return Ok(candidates);
    }
    Ok(institute_matches(query, &candidates)
        .into_iter()
        .cloned()
        .collect())
}
