//! geobatch-http: HTTP geocoding backend built on `reqwest`.
//!
//! A provider is described by a [`ProviderApi`]: how to build the request,
//! how to parse the body and which candidate to pick. [`HttpGeocoder`] wraps
//! any `ProviderApi` with pacing, timeouts and failure classification and
//! implements [`geobatch_core::Geocoder`].

pub mod api;
pub mod client;

pub use api::{classify_status, ProviderApi};
pub use client::{HttpClientConfig, HttpGeocoder};
