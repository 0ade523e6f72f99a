//! Application config file: chain, batch tunables, HTTP client and logging.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use geobatch_core::BatchConfig;
use geobatch_http::HttpClientConfig;
use geobatch_providers::{BackendSpec, ProviderKind};

use crate::logging::LogConfig;

/// Top-level config, loaded from JSON. Every section is optional.
///
/// ```json
/// {
///   "backends": [
///     { "kind": "google", "api_key_env": "GOOGLE_MAPS_API_KEY" },
///     { "kind": "nominatim" }
///   ],
///   "batch": { "max_parallel": 8, "retry_limit": 2, "backoff": 1000 },
///   "http": { "user_agent": "uni-mapper/1.0 (ops@example.org)" },
///   "log": { "level": "info" }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_backends")]
    pub backends: Vec<BackendSpec>,
    #[serde(default)]
    pub batch: BatchConfig,
    #[serde(default)]
    pub http: HttpClientConfig,
    #[serde(default)]
    pub log: LogConfig,
}

fn default_backends() -> Vec<BackendSpec> {
    vec![BackendSpec::new(ProviderKind::Nominatim)]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backends: default_backends(),
            batch: BatchConfig::default(),
            http: HttpClientConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from `path`, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file '{}'", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("invalid config file '{}'", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Replace the chain with `kinds`, in order. Settings for a kind already
    /// configured (key, base URL, pacing) carry over.
    pub fn override_backends(&mut self, kinds: &[ProviderKind]) {
        if kinds.is_empty() {
            return;
        }
        self.backends = kinds
            .iter()
            .map(|kind| {
                self.backends
                    .iter()
                    .find(|s| s.kind == *kind)
                    .cloned()
                    .unwrap_or_else(|| BackendSpec::new(*kind))
            })
            .collect();
    }

    /// The configured Nominatim entry, if any.
    pub fn nominatim(&self) -> Option<&BackendSpec> {
        self.backends.iter().find(|s| s.kind == ProviderKind::Nominatim)
    }
}
