//! Target selection and the drive control loop.
//!
//! Guidance (which waypoint to aim for) follows the frame rate; torque and
//! steering are produced on the fixed physics step.

use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::road::WaypointGraph;
use crate::vehicle::{Pose, Speed, Vehicle};
use crate::AutodriveSet;

pub mod controller;
pub mod steering;
pub mod target_finder;
pub mod wheels;

use controller::Driver;
use wheels::WheelSet;

pub struct DrivingPlugin;

impl Plugin for DrivingPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DriverConfig>()
            .configure_sets(Update, AutodriveSet::Perception.before(AutodriveSet::Guidance))
            .configure_sets(
                FixedUpdate,
                (
                    AutodriveSet::Contacts,
                    AutodriveSet::Drive,
                    AutodriveSet::Integrate,
                )
                    .chain(),
            )
            .add_systems(Update, update_guidance.in_set(AutodriveSet::Guidance))
            .add_systems(
                FixedUpdate,
                apply_drive_commands.in_set(AutodriveSet::Drive),
            );
    }
}

/// Tunables of the drive controller.
#[derive(Resource, Clone, Debug)]
pub struct DriverConfig {
    /// Motor torque applied to each wheel when below the target speed.
    pub max_motor_torque: f32,
    /// Brake torque applied to each wheel when above the target speed.
    pub max_brake_torque: f32,
    /// Steering range at standstill, in degrees.
    pub max_steering_angle: f32,
    /// Weight of the new steering target in the low-pass filter.
    pub steering_angle_lowpass: f32,
    /// Speed at which the steering range closes completely.
    pub steering_speed_limit: f32,
    /// Seed for intersection lane choice.
    pub seed: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_motor_torque: 100.0,
            max_brake_torque: 300.0,
            max_steering_angle: 45.0,
            steering_angle_lowpass: 0.05,
            steering_speed_limit: steering::STEERING_SPEED_LIMIT,
            seed: 20_160_512,
        }
    }
}

/// Detect the surface under each vehicle and keep its target finder current.
fn update_guidance(
    config: Res<DriverConfig>,
    graph: Res<WaypointGraph>,
    mut vehicles: Query<(Entity, &Transform, &WheelSet, &mut Driver), With<Vehicle>>,
    mut local_rng: Local<Option<StdRng>>,
) {
    let rng = local_rng.get_or_insert_with(|| StdRng::seed_from_u64(config.seed));

    for (entity, transform, wheels, mut driver) in vehicles.iter_mut() {
        let replaced = driver.refresh_guidance(
            wheels.ground_contact(),
            transform.translation,
            &*graph,
            rng,
        );
        if !replaced {
            continue;
        }

        match (driver.ground(), driver.fault()) {
            (Some(ground), Some(fault)) => {
                warn!("Vehicle {entity} lost guidance on {} surface: {fault}", ground.tag);
            }
            (Some(ground), None) => {
                debug!("Vehicle {entity} entered {} surface {}", ground.tag, ground.surface);
            }
            _ => {}
        }
    }
}

/// Turn each vehicle's target into wheel commands.
fn apply_drive_commands(
    config: Res<DriverConfig>,
    graph: Res<WaypointGraph>,
    mut vehicles: Query<(Entity, &Transform, &Speed, &mut Driver, &mut WheelSet), With<Vehicle>>,
) {
    for (entity, transform, speed, mut driver, mut wheels) in vehicles.iter_mut() {
        let previous = driver.fault().cloned();
        match driver.drive(Pose::from_transform(transform), speed.0, &*graph, &config) {
            Ok(command) => wheels.broadcast(command),
            Err(fault) => {
                // Wheels keep their last command until guidance returns.
                if previous.as_ref() != Some(&fault) {
                    debug!("Vehicle {entity} has no drive command: {fault}");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driving::target_finder::{TargetFinder, LANE_CRUISE_SPEED};
    use crate::driving::wheels::GroundContact;
    use crate::road::{Footprint, RoadPlugin, RoadSurface, SurfaceTag};

    #[test]
    fn lane_car_gets_guidance_and_throttle() {
        let mut app = App::new();
        app.add_plugins((RoadPlugin, DrivingPlugin));

        let lane = app
            .world_mut()
            .spawn(RoadSurface::lane(
                Footprint::new(Vec2::new(0.0, 25.0), Vec2::new(8.0, 50.0)),
                Vec3::ZERO,
                Vec3::new(0.0, 0.0, 50.0),
            ))
            .id();

        let mut wheels = WheelSet::four_wheel(1.6, 2.6, 0.35);
        for wheel in wheels.iter_mut() {
            wheel.contact = Some(GroundContact {
                surface: lane,
                tag: SurfaceTag::Lane,
            });
        }
        let car = app
            .world_mut()
            .spawn((
                Vehicle,
                Transform::from_xyz(0.0, 0.0, 5.0),
                Speed(2.0),
                Driver::default(),
                wheels,
            ))
            .id();

        app.update();
        let driver = app.world().get::<Driver>(car).unwrap();
        assert!(matches!(driver.finder(), Some(TargetFinder::Lane(_))));
        assert_eq!(driver.finder().unwrap().max_speed(), LANE_CRUISE_SPEED);

        app.world_mut().run_schedule(FixedUpdate);
        let wheels = app.world().get::<WheelSet>(car).unwrap();
        for wheel in wheels.iter() {
            assert_eq!(wheel.command.motor_torque, 100.0);
            assert_eq!(wheel.command.brake_torque, 0.0);
            assert!(wheel.command.steer_angle.abs() < 1e-4);
        }
    }
}
