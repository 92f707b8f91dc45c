//! Wheel meshes that roll with the wheel's rpm and turn with its steer angle.

use std::f32::consts::FRAC_PI_2;

use bevy::prelude::*;

use crate::driving::wheels::{WheelActuator, WheelSet};

/// Visual of one wheel, a child of the car it belongs to.
#[derive(Component, Clone, Debug, Default)]
pub struct WheelVisual {
    /// Index into the parent's [`WheelSet`].
    pub index: usize,
    /// Accumulated roll around the axle, in [0, 360).
    pub spin_degrees: f32,
}

impl WheelVisual {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            spin_degrees: 0.0,
        }
    }
}

/// Roll accumulated over `dt` seconds at `rpm`, wrapped into [0, 360).
pub fn advance_spin(spin_degrees: f32, rpm: f32, dt: f32) -> f32 {
    (spin_degrees + rpm / 60.0 * 360.0 * dt).rem_euclid(360.0)
}

/// Local rotation of a wheel mesh. Cylinders are built along Y, so the mesh
/// is first laid on its side to put the axle along X.
pub fn wheel_rotation(steer_degrees: f32, spin_degrees: f32) -> Quat {
    Quat::from_rotation_y(steer_degrees.to_radians())
        * Quat::from_rotation_x(spin_degrees.to_radians())
        * Quat::from_rotation_z(FRAC_PI_2)
}

pub(super) fn animate_wheels(
    time: Res<Time>,
    cars: Query<&WheelSet>,
    mut visuals: Query<(&Parent, &mut WheelVisual, &mut Transform)>,
) {
    let dt = time.delta_secs();
    for (parent, mut visual, mut transform) in visuals.iter_mut() {
        let Ok(wheels) = cars.get(parent.get()) else {
            continue;
        };
        let Some(wheel) = wheels.0.get(visual.index) else {
            continue;
        };
        visual.spin_degrees = advance_spin(visual.spin_degrees, wheel.rotational_speed(), dt);
        transform.rotation = wheel_rotation(wheel.command.steer_angle, visual.spin_degrees);
    }
}
