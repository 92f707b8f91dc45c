//! autodrive - autonomous traffic agents for Bevy driving scenes.
//!
//! Each car picks a waypoint to steer for based on the road surface under its
//! wheels (lane, bend or intersection), turns that target into motor, brake
//! and steering commands, and yields to nearby cars seen by its forward and
//! lateral proximity sensors.

use bevy::prelude::*;

pub mod debug;
pub mod demo;
pub mod driving;
pub mod error;
pub mod kinematics;
pub mod perception;
pub mod road;
pub mod vehicle;

/// Ordering of the traffic systems.
///
/// `Perception` and `Guidance` run in `Update`; `Contacts`, `Drive` and
/// `Integrate` run in `FixedUpdate`.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AutodriveSet {
    Perception,
    Guidance,
    Contacts,
    Drive,
    Integrate,
}

/// Road graph, driving and perception. Bring your own wheel physics, or add
/// [`kinematics::KinematicsPlugin`].
pub struct AutodrivePlugin;

impl Plugin for AutodrivePlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(road::RoadPlugin)
            .add_plugins(driving::DrivingPlugin)
            .add_plugins(perception::PerceptionPlugin);
    }
}
