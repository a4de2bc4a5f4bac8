//! # Error Module
//!
//! Error taxonomy for the geofence engine.
//!
//! Only two kinds of failure originate in the core:
//! - malformed reports, surfaced synchronously and never touching state
//! - invalid configuration, which is fatal at startup
//!
//! Notification dispatch failures belong to the application layer.

use thiserror::Error;

/// Errors produced by the geofence engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    /// The report is missing a tag or coordinates, or they are unusable.
    #[error("invalid report: {0}")]
    InvalidReport(String),

    /// A coordinate was non-finite or outside its valid range.
    #[error("invalid {axis} {value}: expected a finite value in [{min}, {max}]")]
    InvalidCoordinate {
        /// "latitude" or "longitude".
        axis: &'static str,
        /// The rejected value.
        value: f64,
        /// Lower bound (inclusive).
        min: f64,
        /// Upper bound (inclusive).
        max: f64,
    },

    /// Startup configuration is unusable (radius, authorization set, ...).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl GeoError {
    /// Whether this error is the caller's fault (maps to a client error).
    #[must_use]
    pub fn is_invalid_report(&self) -> bool {
        matches!(self, Self::InvalidReport(_) | Self::InvalidCoordinate { .. })
    }
}

/// Result alias for the core crate.
pub type Result<T> = std::result::Result<T, GeoError>;
