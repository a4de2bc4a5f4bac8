//! # Core Types
//!
//! Value types shared by the Distance Evaluator and the Geofence Tracker.
//!
//! `ReferencePoint` and `AuthorizationSet` are built once at startup and
//! never mutated. `Report`, `NotificationIntent` and `Outcome` are ephemeral.

use crate::error::{GeoError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// =============================================================================
// COORDINATE
// =============================================================================

/// A validated WGS-84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in [-90, 90].
    pub lat: f64,
    /// Longitude in [-180, 180].
    pub lon: f64,
}

impl Coordinate {
    /// Create a coordinate, rejecting non-finite or out-of-range values.
    ///
    /// Values are never clamped.
    pub fn new(lat: f64, lon: f64) -> Result<Self> {
        check_axis("latitude", lat, 90.0)?;
        check_axis("longitude", lon, 180.0)?;
        Ok(Self { lat, lon })
    }
}

fn check_axis(axis: &'static str, value: f64, bound: f64) -> Result<()> {
    if value.is_finite() && (-bound..=bound).contains(&value) {
        Ok(())
    } else {
        Err(GeoError::InvalidCoordinate {
            axis,
            value,
            min: -bound,
            max: bound,
        })
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.lat, self.lon)
    }
}

// =============================================================================
// REFERENCE POINT
// =============================================================================

/// The fence: a center location and an inclusive radius in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferencePoint {
    /// Center of the fence.
    pub location: Coordinate,
    /// Radius in meters.
    pub radius_m: f64,
}

impl ReferencePoint {
    /// Create a reference point. A negative or non-finite radius is a
    /// configuration error.
    pub fn new(location: Coordinate, radius_m: f64) -> Result<Self> {
        if !radius_m.is_finite() || radius_m < 0.0 {
            return Err(GeoError::InvalidConfig(format!(
                "radius must be a finite, non-negative number of meters, got {}",
                radius_m
            )));
        }
        Ok(Self { location, radius_m })
    }
}

// =============================================================================
// AUTHORIZATION SET
// =============================================================================

/// The fixed set of tags considered authorized.
///
/// Membership is an exact string match. Absence means unauthorized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizationSet {
    tags: BTreeSet<String>,
}

impl AuthorizationSet {
    /// An empty set: every tag is unauthorized.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a set from tags. Empty tags are rejected.
    pub fn from_tags<I, S>(tags: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = BTreeSet::new();
        for tag in tags {
            let tag = tag.into();
            if tag.is_empty() {
                return Err(GeoError::InvalidConfig(
                    "authorized tags must not be empty".to_string(),
                ));
            }
            set.insert(tag);
        }
        Ok(Self { tags: set })
    }

    /// Parse a comma-separated list, e.g. `"alice, bob"`.
    ///
    /// Surrounding whitespace is trimmed. A blank input yields an empty set,
    /// but an empty entry inside a list (`"alice,,bob"`) is malformed.
    pub fn parse(csv: &str) -> Result<Self> {
        if csv.trim().is_empty() {
            return Ok(Self::empty());
        }
        Self::from_tags(csv.split(',').map(str::trim))
    }

    /// Whether `tag` is authorized.
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

// =============================================================================
// REPORT
// =============================================================================

/// An inbound position report, as received.
///
/// Coordinates are optional so that a missing field is reported as
/// `InvalidReport` rather than failing deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub tag: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl Report {
    /// Create a report with both coordinates present.
    #[must_use]
    pub fn new(tag: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            tag: tag.into(),
            lat: Some(lat),
            lon: Some(lon),
        }
    }

    /// Check the report and extract its position.
    pub fn validate(&self) -> Result<Coordinate> {
        if self.tag.trim().is_empty() {
            return Err(GeoError::InvalidReport("tag must not be empty".to_string()));
        }
        let (Some(lat), Some(lon)) = (self.lat, self.lon) else {
            return Err(GeoError::InvalidReport("Missing coordinates".to_string()));
        };
        Coordinate::new(lat, lon)
    }
}

// =============================================================================
// NOTIFICATION INTENT
// =============================================================================

/// The kind of transition that produced a notification.
///
/// Only entries notify; exits are silent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionKind {
    Entry,
}

/// A request to notify, produced on an outside to inside transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationIntent {
    pub tag: String,
    pub authorized: bool,
    pub kind: TransitionKind,
}

impl NotificationIntent {
    #[must_use]
    pub fn entry(tag: impl Into<String>, authorized: bool) -> Self {
        Self {
            tag: tag.into(),
            authorized,
            kind: TransitionKind::Entry,
        }
    }

    /// Render the outbound message body.
    ///
    /// The body names the tag and flags unauthorized identities.
    #[must_use]
    pub fn message(&self) -> String {
        if self.authorized {
            format!("Alert: {} has entered the geofence", self.tag)
        } else {
            format!("Alert: UNAUTHORIZED {} has entered the geofence", self.tag)
        }
    }
}

// =============================================================================
// OUTCOME
// =============================================================================

/// Result of processing one report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// Geodesic distance from the reference point in meters.
    pub distance_m: f64,
    /// Whether the report fell within the fence.
    pub within_fence: bool,
    /// Present only on an outside to inside transition.
    pub notification: Option<NotificationIntent>,
}

// =============================================================================
// TESTS
// =============================================================================
