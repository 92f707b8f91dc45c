//! Vehicle components shared by guidance, perception and physics.

use bevy::prelude::*;

/// Name of the container entity every traffic car is parented to.
pub const CARS_CONTAINER: &str = "Cars";

/// Marker for simulated traffic cars.
#[derive(Component, Default)]
pub struct Vehicle;

/// Current speed in world units per second, written by the physics backend.
#[derive(Component, Clone, Copy, Debug, Default, PartialEq)]
pub struct Speed(pub f32);

/// Ground-plane pose of a vehicle. Yaw is in degrees from +Z toward +X.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub yaw_degrees: f32,
}

impl Pose {
    pub fn new(position: Vec3, yaw_degrees: f32) -> Self {
        Self {
            position,
            yaw_degrees,
        }
    }

    /// Vehicles are direct children of the identity `Cars` container, so
    /// their local transform is their world pose.
    pub fn from_transform(transform: &Transform) -> Self {
        Self::new(transform.translation, yaw_of(transform.rotation))
    }

    /// Unit forward vector on the ground plane.
    pub fn forward(&self) -> Vec3 {
        let yaw = self.yaw_degrees.to_radians();
        Vec3::new(yaw.sin(), 0.0, yaw.cos())
    }

    /// Unit vector pointing toward +yaw, perpendicular to `forward`.
    pub fn right(&self) -> Vec3 {
        let yaw = self.yaw_degrees.to_radians();
        Vec3::new(yaw.cos(), 0.0, -yaw.sin())
    }

    /// Transform a vehicle-space offset into world space.
    pub fn transform_point(&self, offset: Vec3) -> Vec3 {
        self.position + self.right() * offset.x + Vec3::Y * offset.y + self.forward() * offset.z
    }
}

/// Yaw of a rotation in degrees.
pub fn yaw_of(rotation: Quat) -> f32 {
    rotation.to_euler(EulerRot::YXZ).0.to_degrees()
}

/// Whether `entity` is parented to the traffic container.
pub fn is_car(entity: Entity, parents: &Query<&Parent>, names: &Query<&Name>) -> bool {
    parents
        .get(entity)
        .ok()
        .and_then(|parent| names.get(parent.get()).ok())
        .is_some_and(|name| name.as_str() == CARS_CONTAINER)
}
