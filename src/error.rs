//! Guidance faults.
//!
//! None of these are fatal: a driver that reports a fault skips command
//! synthesis for that tick and recovers once it sees a usable surface again.

use bevy::prelude::Entity;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuidanceFault {
    /// No target finder is active, or its target waypoint no longer exists.
    #[error("no guidance target available")]
    MissingGuidance,
    /// The vehicle stands on a surface whose tag has no guidance strategy.
    #[error("surface tag `{0}` has no guidance strategy")]
    UnrecognizedSurfaceTag(String),
    /// A selection pass found no usable waypoint in the group.
    #[error("waypoint group {group} of surface {surface} has no usable waypoint")]
    EmptyWaypointGroup { surface: Entity, group: usize },
}
