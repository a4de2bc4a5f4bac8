//! # Geofence Tracker
//!
//! Per-tag presence state and the edge-triggered entry protocol.
//!
//! ## Protocol
//!
//! For every valid report the tracker evaluates the distance, then updates
//! the tag's `inside` flag:
//!
//! | within fence | inside before | effect                          |
//! |--------------|---------------|---------------------------------|
//! | yes          | no            | inside = true, emit entry       |
//! | yes          | yes           | nothing                         |
//! | no           | any           | inside = false, no notification |
//!
//! A tag never seen before counts as outside.
//!
//! ## Concurrency
//!
//! The presence table maps each tag to its own `AtomicBool`. Known tags are
//! resolved under a shared read lock; the write lock is taken only to insert
//! a new tag and is held for that single map access. The outside to inside
//! edge is detected with an atomic swap, so when many reports for the same
//! tag race, exactly one of them observes `false` and emits the entry.
//! Reports for different tags never wait on each other's transitions.
//!
//! The tracker performs no I/O. Delivering the returned intent is the
//! caller's job, after `process` has returned.

use crate::distance::{Verdict, evaluate};
use crate::error::Result;
use crate::types::{AuthorizationSet, NotificationIntent, Outcome, ReferencePoint, Report};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

// =============================================================================
// PRESENCE TABLE
// =============================================================================

/// Shared inside/outside flag for one tag.
type PresenceFlag = Arc<AtomicBool>;

/// Read-only view of the presence table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceSnapshot {
    /// Number of distinct tags seen since startup.
    pub tracked: usize,
    /// Tags currently inside the fence, sorted.
    pub inside: Vec<String>,
}

impl PresenceSnapshot {
    #[must_use]
    pub fn inside_count(&self) -> usize {
        self.inside.len()
    }
}

// =============================================================================
// TRACKER
// =============================================================================

/// The stateful geofence registry.
///
/// Shared between request handlers behind an `Arc`; every method takes
/// `&self`.
#[derive(Debug)]
pub struct GeofenceTracker {
    reference: ReferencePoint,
    authorized: AuthorizationSet,
    /// Tag -> inside flag. Entries are never evicted.
    presence: RwLock<BTreeMap<String, PresenceFlag>>,
}

impl GeofenceTracker {
    /// Create a tracker for one fence.
    #[must_use]
    pub fn new(reference: ReferencePoint, authorized: AuthorizationSet) -> Self {
        Self {
            reference,
            authorized,
            presence: RwLock::new(BTreeMap::new()),
        }
    }

    /// Process one report.
    ///
    /// Invalid reports fail with `InvalidReport`/`InvalidCoordinate` and
    /// leave the presence table untouched.
    pub fn process(&self, report: &Report) -> Result<Outcome> {
        let point = report.validate()?;
        let Verdict {
            distance_m,
            within_fence,
        } = evaluate(&self.reference, point);

        let notification = self.apply(&report.tag, within_fence);

        Ok(Outcome {
            distance_m,
            within_fence,
            notification,
        })
    }

    /// Apply a verdict to the tag's presence flag.
    fn apply(&self, tag: &str, within_fence: bool) -> Option<NotificationIntent> {
        let flag = self.flag(tag);
        if within_fence {
            let was_inside = flag.swap(true, Ordering::AcqRel);
            (!was_inside).then(|| NotificationIntent::entry(tag, self.is_authorized(tag)))
        } else {
            flag.store(false, Ordering::Release);
            None
        }
    }

    /// Resolve the flag for a tag, creating it (outside) on first sight.
    fn flag(&self, tag: &str) -> PresenceFlag {
        {
            let table = self.presence.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(flag) = table.get(tag) {
                return Arc::clone(flag);
            }
        }

        let mut table = self
            .presence
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            table
                .entry(tag.to_owned())
                .or_insert_with(|| Arc::new(AtomicBool::new(false))),
        )
    }

    /// Whether `tag` belongs to the authorization set.
    #[must_use]
    pub fn is_authorized(&self, tag: &str) -> bool {
        self.authorized.contains(tag)
    }

    /// Current state of a tag, or `None` if it has never reported.
    #[must_use]
    pub fn is_inside(&self, tag: &str) -> Option<bool> {
        let table = self.presence.read().unwrap_or_else(PoisonError::into_inner);
        table.get(tag).map(|flag| flag.load(Ordering::Acquire))
    }

    /// Snapshot of the presence table (deterministic order).
    #[must_use]
    pub fn snapshot(&self) -> PresenceSnapshot {
        let table = self.presence.read().unwrap_or_else(PoisonError::into_inner);
        PresenceSnapshot {
            tracked: table.len(),
            inside: table
                .iter()
                .filter(|(_, flag)| flag.load(Ordering::Acquire))
                .map(|(tag, _)| tag.clone())
                .collect(),
        }
    }

    #[must_use]
    pub fn reference(&self) -> &ReferencePoint {
        &self.reference
    }

    #[must_use]
    pub fn authorization(&self) -> &AuthorizationSet {
        &self.authorized
    }
}

// =============================================================================
// TESTS
// =============================================================================
