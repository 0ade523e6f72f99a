//! Declarative backend selection: `BackendSpec` → `Arc<dyn Geocoder>`.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use geobatch_core::{ConfigError, Geocoder};
use geobatch_http::{HttpClientConfig, HttpGeocoder};

use crate::arcgis::{self, ArcGis};
use crate::census::{self, Census};
use crate::geocodio::{self, Geocodio};
use crate::google::{self, Google};
use crate::nominatim::{self, Nominatim};

/// The built-in geocoding services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Nominatim,
    Arcgis,
    Google,
    Census,
    Geocodio,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 5] = [
        Self::Nominatim,
        Self::Arcgis,
        Self::Google,
        Self::Census,
        Self::Geocodio,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nominatim => nominatim::NAME,
            Self::Arcgis => arcgis::NAME,
            Self::Google => google::NAME,
            Self::Census => census::NAME,
            Self::Geocodio => geocodio::NAME,
        }
    }

    pub fn requires_key(self) -> bool {
        matches!(self, Self::Google | Self::Geocodio)
    }

    /// Environment variable consulted when no key is given inline.
    pub fn key_env(self) -> Option<&'static str> {
        match self {
            Self::Arcgis => Some(arcgis::KEY_ENV),
            Self::Google => Some(google::KEY_ENV),
            Self::Geocodio => Some(geocodio::KEY_ENV),
            Self::Nominatim | Self::Census => None,
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            Self::Nominatim => nominatim::DEFAULT_BASE_URL,
            Self::Arcgis => arcgis::DEFAULT_BASE_URL,
            Self::Google => google::DEFAULT_BASE_URL,
            Self::Census => census::DEFAULT_BASE_URL,
            Self::Geocodio => geocodio::DEFAULT_BASE_URL,
        }
    }

    pub fn default_min_interval(self) -> Duration {
        match self {
            Self::Nominatim => nominatim::DEFAULT_MIN_INTERVAL,
            _ => Duration::ZERO,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Nominatim => "OpenStreetMap Nominatim, free, 1 req/s, prefers universities",
            Self::Arcgis => "Esri ArcGIS World Geocoder, optional token",
            Self::Google => "Google Maps Geocoding API, key required",
            Self::Census => "U.S. Census Bureau one-line address geocoder, US only",
            Self::Geocodio => "Geocodio, US/Canada, key required",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == needle)
            .ok_or_else(|| ConfigError::UnknownBackend(s.trim().to_string()))
    }
}

/// One entry of the fallback chain as written in a config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendSpec {
    pub kind: ProviderKind,
    /// Inline API key. Takes precedence over `api_key_env`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Environment variable holding the key; defaults per provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    /// Override the service root, e.g. a self-hosted Nominatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Minimum spacing between calls on this backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_interval_ms: Option<u64>,
}

impl BackendSpec {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            api_key: None,
            api_key_env: None,
            base_url: None,
            min_interval_ms: None,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Inline key, else the named (or provider default) environment variable.
    /// Empty values count as missing.
    pub fn resolve_key(&self) -> Option<String> {
        if let Some(key) = self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            return Some(key.to_string());
        }
        let var = self.api_key_env.as_deref().or(self.kind.key_env())?;
        std::env::var(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Pacing for this backend: the entry's own `min_interval_ms`, else a
    /// nonzero `http.min_interval`, else the provider default.
    pub fn effective_min_interval(&self, http: &HttpClientConfig) -> Duration {
        match self.min_interval_ms {
            Some(ms) => Duration::from_millis(ms),
            None if !http.min_interval.is_zero() => http.min_interval,
            None => self.kind.default_min_interval(),
        }
    }

    fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(self.kind.default_base_url())
    }

    fn required_key(&self) -> Result<String, ConfigError> {
        self.resolve_key().ok_or_else(|| ConfigError::MissingApiKey {
            backend: self.kind.to_string(),
        })
    }
}

impl From<ProviderKind> for BackendSpec {
    fn from(kind: ProviderKind) -> Self {
        Self::new(kind)
    }
}

/// Build one backend. Fails if a required key is missing or the HTTP client
/// cannot be constructed.
pub fn build_backend(
    spec: &BackendSpec,
    http: &HttpClientConfig,
) -> Result<Arc<dyn Geocoder>, ConfigError> {
    let config = HttpClientConfig {
        min_interval: spec.effective_min_interval(http),
        ..http.clone()
    };
    let base = spec.base_url();

    let backend: Arc<dyn Geocoder> = match spec.kind {
        ProviderKind::Nominatim => Arc::new(HttpGeocoder::new(
            Nominatim::new().with_base_url(base),
            &config,
        )?),
        ProviderKind::Arcgis => Arc::new(HttpGeocoder::new(
            ArcGis::new(spec.resolve_key()).with_base_url(base),
            &config,
        )?),
        ProviderKind::Google => Arc::new(HttpGeocoder::new(
            Google::new(spec.required_key()?).with_base_url(base),
            &config,
        )?),
        ProviderKind::Census => Arc::new(HttpGeocoder::new(
            Census::new().with_base_url(base),
            &config,
        )?),
        ProviderKind::Geocodio => Arc::new(HttpGeocoder::new(
            Geocodio::new(spec.required_key()?).with_base_url(base),
            &config,
        )?),
    };

    tracing::debug!(
        backend = %spec.kind,
        base_url = base,
        min_interval_ms = config.min_interval.as_millis() as u64,
        "backend configured"
    );
    Ok(backend)
}

/// Build the ordered fallback chain. An empty list is a configuration error.
pub fn build_chain(
    specs: &[BackendSpec],
    http: &HttpClientConfig,
) -> Result<Vec<Arc<dyn Geocoder>>, ConfigError> {
    if specs.is_empty() {
        return Err(ConfigError::NoBackends);
    }
    specs.iter().map(|s| build_backend(s, http)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNSET_VAR: &str = "GEOBATCH_TEST_DEFINITELY_UNSET_KEY";

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("Nominatim".parse::<ProviderKind>().unwrap(), ProviderKind::Nominatim);
        assert_eq!(" ARCGIS ".parse::<ProviderKind>().unwrap(), ProviderKind::Arcgis);
        assert_eq!(
            "bing".parse::<ProviderKind>().unwrap_err(),
            ConfigError::UnknownBackend("bing".into())
        );
    }

    #[test]
    fn kind_display_round_trips() {
        for kind in ProviderKind::ALL {
            assert_eq!(kind.to_string().parse::<ProviderKind>().unwrap(), kind);
        }
    }

    #[test]
    fn spec_from_json() {
        let spec: BackendSpec = serde_json::from_str(
            r#"{"kind": "google", "api_key_env": "MY_KEY", "min_interval_ms": 50}"#,
        )
        .unwrap();
        assert_eq!(spec.kind, ProviderKind::Google);
        assert_eq!(spec.api_key_env.as_deref(), Some("MY_KEY"));
        let http = HttpClientConfig {
            min_interval: Duration::from_secs(2),
            ..Default::default()
        };
        assert_eq!(spec.effective_min_interval(&http), Duration::from_millis(50));
    }

    #[test]
    fn nominatim_paced_by_default() {
        let http = HttpClientConfig::default();
        let spec = BackendSpec::new(ProviderKind::Nominatim);
        assert_eq!(spec.effective_min_interval(&http), Duration::from_secs(1));
        assert!(BackendSpec::new(ProviderKind::Census)
            .effective_min_interval(&http)
            .is_zero());
    }

    #[test]
    fn shared_http_interval_applies_without_an_entry_override() {
        let http = HttpClientConfig {
            min_interval: Duration::from_millis(300),
            ..Default::default()
        };
        assert_eq!(
            BackendSpec::new(ProviderKind::Census).effective_min_interval(&http),
            Duration::from_millis(300)
        );
        assert_eq!(
            BackendSpec::new(ProviderKind::Nominatim).effective_min_interval(&http),
            Duration::from_millis(300)
        );
        let unpaced = BackendSpec {
            min_interval_ms: Some(0),
            ..BackendSpec::new(ProviderKind::Census)
        };
        assert!(unpaced.effective_min_interval(&http).is_zero());
    }

    #[test]
    fn inline_key_wins_and_blank_is_missing() {
        let spec = BackendSpec::new(ProviderKind::Google).with_api_key("abc");
        assert_eq!(spec.resolve_key().as_deref(), Some("abc"));

        let blank = BackendSpec {
            api_key: Some("  ".into()),
            api_key_env: Some(UNSET_VAR.into()),
            ..BackendSpec::new(ProviderKind::Google)
        };
        assert_eq!(blank.resolve_key(), None);
    }

    #[test]
    fn missing_required_key_is_config_error() {
        let spec = BackendSpec {
            api_key_env: Some(UNSET_VAR.into()),
            ..BackendSpec::new(ProviderKind::Geocodio)
        };
        let err = build_backend(&spec, &HttpClientConfig::default()).err();
        assert_eq!(
            err,
            Some(ConfigError::MissingApiKey {
                backend: "geocodio".into()
            })
        );
    }

    #[test]
    fn chain_keeps_order() {
        let specs = vec![
            BackendSpec::new(ProviderKind::Census),
            BackendSpec::new(ProviderKind::Nominatim),
            BackendSpec::new(ProviderKind::Google).with_api_key("k"),
        ];
        let Ok(chain) = build_chain(&specs, &HttpClientConfig::default()) else {
            panic!("chain should build");
        };
        let names: Vec<&str> = chain.iter().map(|b| b.name()).collect();
        assert_eq!(names, vec!["census", "nominatim", "google"]);
    }

    #[test]
    fn empty_chain_rejected() {
        let err = build_chain(&[], &HttpClientConfig::default()).err();
        assert_eq!(err, Some(ConfigError::NoBackends));
    }
}
