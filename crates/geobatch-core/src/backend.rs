//! The `Geocoder` trait, implemented by every geocoding backend.

use async_trait::async_trait;

use crate::error::GeocodeError;
use crate::types::{Candidate, Coordinate};

/// The central async trait every geocoding backend must implement.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` for use across Tokio tasks.
///
/// # Object Safety
/// The trait is object-safe and can be stored as `Arc<dyn Geocoder>`.
#[async_trait]
pub trait Geocoder: Send + Sync + 'static {
    /// Resolve a trimmed, non-empty query to a single coordinate.
    ///
    /// `Ok(None)` means the provider answered but had no match.
    async fn resolve(&self, query: &str) -> Result<Option<Coordinate>, GeocodeError>;

    /// Return every match the provider offers for `query`.
    ///
    /// Default implementation wraps `resolve`; override when the provider
    /// returns ranked lists.
    async fn candidates(&self, query: &str) -> Result<Vec<Candidate>, GeocodeError> {
        Ok(self
            .resolve(query)
            .await?
            .map(|c| vec![Candidate::new(query, c)])
            .unwrap_or_default())
    }

    /// Return the backend's identifier (provider name).
    fn name(&self) -> &str;
}
