//! # Geowatch Core
//!
//! The geofence engine: a pure Distance Evaluator feeding a stateful,
//! thread-safe Geofence Tracker.
//!
//! ```text
//! Report ──► distance::evaluate ──► Verdict ──► GeofenceTracker ──► Outcome
//!                                                  (presence table)   (+ NotificationIntent)
//! ```
//!
//! The crate is synchronous and does no I/O. Delivering notifications,
//! parsing wire formats and loading configuration are left to the caller.
//!
//! ## Example
//!
//! ```
//! use geowatch_core::{AuthorizationSet, Coordinate, GeofenceTracker, ReferencePoint, Report};
//!
//! let home = ReferencePoint::new(Coordinate::new(0.0, 0.0)?, 50.0)?;
//! let tracker = GeofenceTracker::new(home, AuthorizationSet::parse("alice")?);
//!
//! let outcome = tracker.process(&Report::new("alice", 0.0, 0.0))?;
//! assert!(outcome.notification.is_some());
//!
//! // Still inside: no second alert.
//! let outcome = tracker.process(&Report::new("alice", 0.0, 0.0))?;
//! assert!(outcome.notification.is_none());
//! # Ok::<(), geowatch_core::GeoError>(())
//! ```

pub mod distance;
pub mod error;
pub mod tracker;
pub mod types;

pub use distance::{Verdict, evaluate, geodesic_distance};
pub use error::{GeoError, Result};
pub use tracker::{GeofenceTracker, PresenceSnapshot};
pub use types::{
    AuthorizationSet, Coordinate, NotificationIntent, Outcome, ReferencePoint, Report,
    TransitionKind,
};
