//! Heading error and steering shaping.
//!
//! Yaw is measured in degrees from +Z toward +X, so a vehicle with yaw 0
//! faces +Z and one with yaw 90 faces +X.

use bevy::prelude::*;

/// Default speed at which the steering range has shrunk to zero.
pub const STEERING_SPEED_LIMIT: f32 = 450.0;

/// Wrap an angle in degrees into [-180, 180).
pub fn wrap_degrees(angle: f32) -> f32 {
    (angle + 180.0).rem_euclid(360.0) - 180.0
}

/// Wrap an angle in degrees into (-180, 180]. A target dead astern steers
/// toward +yaw.
pub fn wrap_heading(angle: f32) -> f32 {
    180.0 - (180.0 - angle).rem_euclid(360.0)
}

/// Signed angle between the vehicle's forward axis and the direction to
/// `target`, in degrees, within (-180, 180]. Positive means the target lies
/// toward +yaw.
pub fn heading_error(position: Vec3, yaw_degrees: f32, target: Vec3) -> f32 {
    let delta = target - position;
    let mut angle = -delta.z.atan2(delta.x).to_degrees();
    angle -= yaw_degrees - 90.0;
    wrap_heading(angle)
}

/// Clamp a steering angle to a range that shrinks linearly with speed and
/// closes completely at `speed_limit`.
pub fn speed_limited(angle: f32, max_angle: f32, speed: f32, speed_limit: f32) -> f32 {
    let limit = max_angle * (1.0 - speed / speed_limit).max(0.0);
    angle.clamp(-limit, limit)
}

/// One step of an exponential low-pass filter.
pub fn low_pass(target: f32, previous: f32, lambda: f32) -> f32 {
    lambda * target + (1.0 - lambda) * previous
}
