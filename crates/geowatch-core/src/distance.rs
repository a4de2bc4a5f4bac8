//! # Distance Evaluator
//!
//! Geodesic distance between two positions and the fence verdict.
//!
//! Distances are shortest paths on the WGS-84 ellipsoid, solved with
//! Karney's algorithm. It converges for every pair of valid coordinates,
//! nearly antipodal ones included, so the distance never jumps as a point
//! moves away from the fence.
//!
//! Everything here is pure and safe to call from any thread.

use crate::types::{Coordinate, ReferencePoint};
use geographiclib_rs::{Geodesic, InverseGeodesic};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// The WGS-84 ellipsoid, with its series coefficients computed once.
static WGS84: LazyLock<Geodesic> = LazyLock::new(Geodesic::wgs84);

// =============================================================================
// VERDICT
// =============================================================================

/// Distance to the fence center and whether the point is inside.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub distance_m: f64,
    pub within_fence: bool,
}

/// Evaluate a point against the fence.
///
/// The boundary is inclusive: a point exactly `radius_m` away is inside.
#[must_use]
pub fn evaluate(reference: &ReferencePoint, point: Coordinate) -> Verdict {
    let distance_m = geodesic_distance(reference.location, point);
    Verdict {
        distance_m,
        within_fence: distance_m <= reference.radius_m,
    }
}

// =============================================================================
// DISTANCE
// =============================================================================

/// Ellipsoidal distance in meters between two coordinates.
///
/// Identical coordinates are exactly 0.
#[must_use]
pub fn geodesic_distance(a: Coordinate, b: Coordinate) -> f64 {
    if a == b {
        return 0.0;
    }
    InverseGeodesic::<f64>::inverse(&*WGS84, a.lat, a.lon, b.lat, b.lon)
}

// =============================================================================
// TESTS
// =============================================================================
