//! Data model: coordinates, provider candidates and per-query results.

use serde::{Deserialize, Serialize};

/// A validated WGS84 latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    /// Build a coordinate, rejecting non-finite or out-of-range values.
    pub fn new(lat: f64, lon: f64) -> Option<Self> {
        let valid = lat.is_finite()
            && lon.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lon);
        valid.then_some(Self { lat, lon })
    }

    /// Parse the string-encoded pair some providers (Nominatim) return.
    pub fn parse(lat: &str, lon: &str) -> Option<Self> {
        let lat = lat.trim().parse::<f64>().ok()?;
        let lon = lon.trim().parse::<f64>().ok()?;
        Self::new(lat, lon)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.6}, {:.6}", self.lat, self.lon)
    }
}

/// One match returned by a provider for a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Human-readable label ("Temple University, Philadelphia, ...").
    pub label: String,
    pub coordinate: Coordinate,
    /// Provider place type, when the provider reports one (e.g. `university`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_type: Option<String>,
    /// Provider relevance score, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl Candidate {
    pub fn new(label: impl Into<String>, coordinate: Coordinate) -> Self {
        Self {
            label: label.into(),
            coordinate,
            place_type: None,
            score: None,
        }
    }
}

/// Terminal state of one query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupOutcome {
    /// A backend returned a coordinate.
    Resolved,
    /// Every backend failed or found nothing.
    Exhausted,
    /// The query was empty after trimming and never dispatched.
    Blank,
}

impl std::fmt::Display for LookupOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resolved => write!(f, "resolved"),
            Self::Exhausted => write!(f, "exhausted"),
            Self::Blank => write!(f, "blank"),
        }
    }
}

/// The result slot for the query at `index` in the input list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupResult {
    pub index: usize,
    /// The query text after trimming.
    pub query: String,
    pub coordinate: Option<Coordinate>,
    /// Name of the backend that produced `coordinate`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
    pub outcome: LookupOutcome,
    /// Outbound calls made for this query across the whole chain.
    pub attempts: u32,
}

impl LookupResult {
    pub fn blank(index: usize) -> Self {
        Self {
            index,
            query: String::new(),
            coordinate: None,
            backend: None,
            outcome: LookupOutcome::Blank,
            attempts: 0,
        }
    }

    pub fn exhausted(index: usize, query: impl Into<String>, attempts: u32) -> Self {
        Self {
            index,
            query: query.into(),
            coordinate: None,
            backend: None,
            outcome: LookupOutcome::Exhausted,
            attempts,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.outcome == LookupOutcome::Resolved
    }
}

/// Trim a raw query; `None` for blank input, which is never dispatched.
pub fn normalize_query(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_range_checks() {
        assert!(Coordinate::new(39.98, -75.15).is_some());
        assert!(Coordinate::new(90.0, 180.0).is_some());
        assert!(Coordinate::new(90.5, 0.0).is_none());
        assert!(Coordinate::new(0.0, -180.1).is_none());
        assert!(Coordinate::new(f64::NAN, 0.0).is_none());
        assert!(Coordinate::new(0.0, f64::INFINITY).is_none());
    }

    #[test]
    fn coordinate_parse_strings() {
        let c = Coordinate::parse("42.3601", " -71.0942 ").unwrap();
        assert!((c.lat - 42.3601).abs() < 1e-9);
        assert!((c.lon + 71.0942).abs() < 1e-9);
        assert!(Coordinate::parse("north", "0").is_none());
    }

    #[test]
    fn normalize_trims_and_rejects_blank() {
        assert_eq!(normalize_query("  MIT \n"), Some("MIT"));
        assert_eq!(normalize_query(""), None);
        assert_eq!(normalize_query(" \t "), None);
    }

    #[test]
    fn outcome_serializes_snake_case() {
        let json = serde_json::to_string(&LookupResult::blank(3)).unwrap();
        assert!(json.contains("\"outcome\":\"blank\""));
        assert!(json.contains("\"index\":3"));
        assert!(!json.contains("backend"));
    }
}
