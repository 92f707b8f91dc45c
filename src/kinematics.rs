//! Kinematic stand-in for wheel physics.
//!
//! Good enough to run the demo and integration tests without a physics
//! engine: wheels touch whichever road footprint lies under them, torque is
//! turned into longitudinal acceleration and steering follows a bicycle model.

use bevy::prelude::*;

use crate::driving::wheels::{GroundContact, WheelActuator, WheelSet};
use crate::road::RoadSurface;
use crate::vehicle::{Pose, Speed, Vehicle};
use crate::AutodriveSet;

pub struct KinematicsPlugin;

impl Plugin for KinematicsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<KinematicsConfig>().add_systems(
            FixedUpdate,
            (
                sample_ground_contacts.in_set(AutodriveSet::Contacts),
                integrate_vehicles.in_set(AutodriveSet::Integrate),
            ),
        );
    }
}

#[derive(Resource, Clone, Debug)]
pub struct KinematicsConfig {
    pub mass: f32,
    /// Quadratic drag coefficient.
    pub drag: f32,
}

impl Default for KinematicsConfig {
    fn default() -> Self {
        Self {
            mass: 400.0,
            drag: 0.01,
        }
    }
}

/// Mark each wheel with the road surface under it, if any.
fn sample_ground_contacts(
    surfaces: Query<(Entity, &RoadSurface)>,
    mut vehicles: Query<(&Transform, &mut WheelSet), With<Vehicle>>,
) {
    for (transform, mut wheels) in vehicles.iter_mut() {
        let pose = Pose::from_transform(transform);
        for wheel in wheels.iter_mut() {
            let point = pose.transform_point(wheel.offset);
            wheel.contact = surfaces
                .iter()
                .find(|(_, surface)| surface.footprint.contains(point))
                .map(|(entity, surface)| GroundContact {
                    surface: entity,
                    tag: surface.tag.clone(),
                });
        }
    }
}

fn integrate_vehicles(
    time: Res<Time>,
    config: Res<KinematicsConfig>,
    mut vehicles: Query<(&mut Transform, &mut Speed, &mut WheelSet), With<Vehicle>>,
) {
    let dt = time.delta_secs();
    if dt <= 0.0 {
        return;
    }

    for (mut transform, mut speed, mut wheels) in vehicles.iter_mut() {
        let (pose, new_speed) =
            step(Pose::from_transform(transform.as_ref()), speed.0, &mut wheels, &config, dt);
        transform.translation = pose.position;
        transform.rotation = Quat::from_rotation_y(pose.yaw_degrees.to_radians());
        speed.0 = new_speed;
    }
}

/// Advance one vehicle by `dt` seconds. Returns the new pose and speed and
/// updates each wheel's rotational speed.
pub fn step(
    pose: Pose,
    speed: f32,
    wheels: &mut WheelSet,
    config: &KinematicsConfig,
    dt: f32,
) -> (Pose, f32) {
    let mut force = 0.0;
    let mut steer_sum = 0.0;
    let mut steered = 0;

    for wheel in wheels.iter() {
        if wheel.steered {
            steer_sum += wheel.command.steer_angle;
            steered += 1;
        }
        if wheel.ground_contact().is_none() || wheel.radius <= 0.0 {
            continue;
        }
        let mut torque = wheel.command.motor_torque;
        if speed > 0.0 {
            torque -= wheel.command.brake_torque;
        }
        force += torque / wheel.radius;
    }

    let acceleration = force / config.mass - config.drag * speed * speed;
    let speed = (speed + acceleration * dt).max(0.0);

    let steer = if steered > 0 {
        steer_sum / steered as f32
    } else {
        0.0
    };
    let wheelbase = wheels.wheelbase();
    let yaw_rate = if wheelbase > 0.0 {
        (speed / wheelbase * steer.to_radians().tan()).to_degrees()
    } else {
        0.0
    };

    let yaw_degrees = pose.yaw_degrees + yaw_rate * dt;
    let moved = Pose::new(pose.position, yaw_degrees);
    let position = pose.position + moved.forward() * speed * dt;

    for wheel in wheels.iter_mut() {
        wheel.rpm = if wheel.radius > 0.0 {
            speed / wheel.radius * 60.0 / std::f32::consts::TAU
        } else {
            0.0
        };
    }

    (Pose::new(position, yaw_degrees), speed)
}
