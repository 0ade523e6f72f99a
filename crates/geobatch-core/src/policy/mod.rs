//! Reliability and courtesy controls for backend calls.
//!
//! Per attempt (applied in order):
//! ```text
//! Query → [Pacer] → [Geocoder] → classify → [RetryPolicy] → next backend
//! ```

pub mod pacing;
pub mod retry;

pub use pacing::Pacer;
pub use retry::{RetryConfig, RetryPolicy};
