//! geobatch-core: foundation traits and types for geobatch.
//!
//! # Overview
//!
//! geobatch resolves ordered lists of free-text place names (institutes,
//! addresses) to coordinates through an ordered chain of geocoding backends.
//! The core crate defines:
//!
//! - [`Geocoder`]: the async trait every backend implements
//! - [`Coordinate`] / [`Candidate`] / [`LookupResult`]: data model
//! - [`GeocodeError`] / [`ConfigError`]: structured error types
//! - [`policy`]: retry backoff and per-backend pacing
//! - [`chain`]: the per-query fallback state machine
//! - [`batch`]: bounded-parallel, order-preserving batch runs

pub mod backend;
pub mod batch;
pub mod chain;
pub mod config;
pub mod error;
pub mod policy;
pub mod types;

pub use backend::Geocoder;
pub use batch::{geocode_batch, BatchGeocoder, BatchSummary};
pub use chain::{ChainOutcome, FallbackChain};
pub use config::BatchConfig;
pub use error::{ConfigError, FailureClass, GeocodeError};
pub use types::{normalize_query, Candidate, Coordinate, LookupOutcome, LookupResult};
