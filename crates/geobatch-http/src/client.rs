//! HTTP geocoding backend backed by `reqwest`.
//!
//! One call per `resolve`: retries and fallback belong to the chain, so this
//! client only paces, sends and classifies.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use geobatch_core::policy::retry::duration_ms;
use geobatch_core::policy::Pacer;
use geobatch_core::{Candidate, ConfigError, Coordinate, GeocodeError, Geocoder};

use crate::api::{classify_status, truncate, ProviderApi};

/// Configuration for `HttpGeocoder`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpClientConfig {
    /// Whole-request timeout, connect included.
    #[serde(default = "default_request_timeout", with = "duration_ms")]
    pub request_timeout: Duration,
    /// Sent on every request. Nominatim rejects requests without one.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Minimum spacing between call starts on this backend; zero disables.
    #[serde(default, with = "duration_ms")]
    pub min_interval: Duration,
}

fn default_request_timeout() -> Duration { Duration::from_secs(10) }
fn default_user_agent() -> String { format!("geobatch/{}", env!("CARGO_PKG_VERSION")) }

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
            min_interval: Duration::ZERO,
        }
    }
}

/// A [`Geocoder`] that talks to one provider over HTTP.
pub struct HttpGeocoder<A> {
    api: A,
    http: reqwest::Client,
    pacer: Pacer,
    request_timeout: Duration,
}

impl<A: ProviderApi> HttpGeocoder<A> {
    pub fn new(api: A, config: &HttpClientConfig) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| ConfigError::Client {
                backend: api.name().to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            api,
            http,
            pacer: Pacer::new(config.min_interval),
            request_timeout: config.request_timeout,
        })
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn min_interval(&self) -> Duration {
        self.pacer.interval()
    }

    async fn fetch(&self, query: &str) -> Result<Vec<Candidate>, GeocodeError> {
        self.pacer.wait().await;

        let resp = self
            .api
            .request(&self.http, query)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let err = classify_status(&self.api, status.as_u16(), &body);
            tracing::debug!(
                backend = self.api.name(),
                status = status.as_u16(),
                class = %err.class(),
                body = truncate(&body, 200),
                "non-success response"
            );
            return Err(err);
        }

        self.api.parse(query, &body)
    }

    fn transport_error(&self, e: reqwest::Error) -> GeocodeError {
        if e.is_timeout() {
            GeocodeError::Timeout {
                ms: self.request_timeout.as_millis() as u64,
            }
        } else if e.is_decode() {
            GeocodeError::InvalidResponse {
                provider: self.api.name().to_string(),
                reason: e.to_string(),
            }
        } else {
            GeocodeError::Http(e.to_string())
        }
    }
}

#[async_trait]
impl<A: ProviderApi> Geocoder for HttpGeocoder<A> {
    async fn resolve(&self, query: &str) -> Result<Option<Coordinate>, GeocodeError> {
        let candidates = self.fetch(query).await?;
        Ok(self
            .api
            .select(query, &candidates)
            .map(|c| c.coordinate))
    }

    async fn candidates(&self, query: &str) -> Result<Vec<Candidate>, GeocodeError> {
        self.fetch(query).await
    }

    fn name(&self) -> &str {
        self.api.name()
    }
}

impl<A: ProviderApi> std::fmt::Debug for HttpGeocoder<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGeocoder")
            .field("provider", &self.api.name())
            .field("request_timeout", &self.request_timeout)
            .field("min_interval", &self.pacer.interval())
            .finish()
    }
}
