//! Proximity sensors that make cars yield to each other.
//!
//! Each car carries a [`ForwardSensor`] and a [`LateralSensor`]. Membership
//! of their volumes is driven by [`ProximityEvent`]s: `detect_sensor_overlaps`
//! emits them by testing cars against the volumes, but a physics backend with
//! real trigger colliders can send the same events instead. Every frame the
//! sensors then turn their members into the driver's brake requests, before
//! guidance and the drive step read them.

use bevy::prelude::*;

pub mod forward;
pub mod lateral;
pub mod proximity;

use crate::driving::controller::Driver;
use crate::vehicle::{is_car, Pose, Speed, Vehicle};
use crate::AutodriveSet;

pub use forward::ForwardSensor;
pub use lateral::LateralSensor;
pub use proximity::{ProximityEvent, ProximityPhase, ProximitySet, SensorKind};

pub struct PerceptionPlugin;

impl Plugin for PerceptionPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SensorConfig>()
            .add_event::<ProximityEvent>()
            .configure_sets(Update, AutodriveSet::Perception.before(AutodriveSet::Guidance))
            .add_systems(
                Update,
                (
                    detect_sensor_overlaps,
                    apply_proximity_events,
                    update_forward_sensors,
                    update_lateral_sensors,
                )
                    .chain()
                    .in_set(AutodriveSet::Perception),
            );
    }
}

/// Sensor geometry and yield thresholds.
#[derive(Resource, Clone, Debug)]
pub struct SensorConfig {
    /// Forward sensor origin in vehicle space.
    pub forward_mount: Vec3,
    pub forward_width: f32,
    /// Forward length at standstill; speed squared is added on top.
    pub forward_base_length: f32,
    /// Fraction of the forward length that counts as near.
    pub forward_near_fraction: f32,
    /// Cars at or below this speed are treated as parked.
    pub stationary_speed: f32,
    /// Lateral sensor origin in vehicle space.
    pub lateral_mount: Vec3,
    pub lateral_radius: f32,
    /// Bearing window (degrees) in which lateral traffic has priority.
    pub lateral_bearing_min: f32,
    pub lateral_bearing_max: f32,
    /// Lateral traffic slower than this is ignored.
    pub lateral_min_speed: f32,
    /// Half-size of the other car's body used for overlap tests.
    pub vehicle_radius: f32,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            forward_mount: Vec3::new(0.0, 0.0, 2.0),
            forward_width: 2.0,
            forward_base_length: 10.0,
            forward_near_fraction: 0.6,
            stationary_speed: 0.1,
            lateral_mount: Vec3::ZERO,
            lateral_radius: 12.0,
            lateral_bearing_min: 0.0,
            lateral_bearing_max: 75.0,
            lateral_min_speed: 1.0,
            vehicle_radius: 1.0,
        }
    }
}

/// Emit enter/exit events by testing every other car against each volume.
fn detect_sensor_overlaps(
    config: Res<SensorConfig>,
    sensors: Query<(Entity, Option<&ForwardSensor>, Option<&LateralSensor>), With<Vehicle>>,
    cars: Query<(Entity, &Transform), With<Vehicle>>,
    mut events: EventWriter<ProximityEvent>,
) {
    for (observer, forward, lateral) in sensors.iter() {
        for (other, transform) in cars.iter() {
            if other == observer {
                continue;
            }
            let position = transform.translation;

            // Volumes are sized after detection; a zero length means not yet.
            if let Some(sensor) = forward.filter(|sensor| sensor.length() > 0.0) {
                let inside =
                    sensor.contains(position, config.forward_width, config.vehicle_radius);
                if let Some(event) =
                    transition(observer, SensorKind::Forward, other, &sensor.members, inside)
                {
                    events.send(event);
                }
            }

            if let Some(sensor) = lateral {
                let inside = sensor.is_enabled() && sensor.contains(position, &config);
                if let Some(event) =
                    transition(observer, SensorKind::Lateral, other, &sensor.members, inside)
                {
                    events.send(event);
                }
            }
        }
    }
}

fn transition(
    observer: Entity,
    sensor: SensorKind,
    other: Entity,
    members: &ProximitySet,
    inside: bool,
) -> Option<ProximityEvent> {
    let phase = match (members.contains(other), inside) {
        (false, true) => ProximityPhase::Enter,
        (true, false) => ProximityPhase::Exit,
        _ => return None,
    };
    Some(ProximityEvent {
        observer,
        sensor,
        other,
        phase,
    })
}

/// Update sensor membership. Only entities parented to the `Cars`
/// container count.
fn apply_proximity_events(
    mut events: EventReader<ProximityEvent>,
    mut forward: Query<&mut ForwardSensor>,
    mut lateral: Query<&mut LateralSensor>,
    parents: Query<&Parent>,
    names: Query<&Name>,
) {
    for event in events.read() {
        if !is_car(event.other, &parents, &names) {
            continue;
        }

        match event.sensor {
            SensorKind::Forward => {
                if let Ok(mut sensor) = forward.get_mut(event.observer) {
                    sensor.members.apply(event.phase, event.other);
                }
            }
            SensorKind::Lateral => {
                if let Ok(mut sensor) = lateral.get_mut(event.observer) {
                    if event.phase == ProximityPhase::Enter && !sensor.is_enabled() {
                        continue;
                    }
                    sensor.members.apply(event.phase, event.other);
                }
            }
        }
    }
}

fn update_forward_sensors(
    config: Res<SensorConfig>,
    mut sensors: Query<(&Transform, &Speed, &mut Driver, &mut ForwardSensor), With<Vehicle>>,
    cars: Query<(&Transform, &Speed), With<Vehicle>>,
) {
    for (transform, speed, mut driver, mut sensor) in sensors.iter_mut() {
        sensor.update_volume(
            Pose::from_transform(transform),
            driver.steering_angle,
            speed.0,
            &config,
        );
        sensor.members.retain(|other| cars.contains(other));

        let members = sensor
            .members
            .iter()
            .filter_map(|other| cars.get(other).ok())
            .map(|(transform, speed)| (transform.translation, speed.0));
        driver.force_brake = sensor.evaluate(speed.0, members, &config);
    }
}

fn update_lateral_sensors(
    config: Res<SensorConfig>,
    mut sensors: Query<(&Transform, &mut Driver, &mut LateralSensor), With<Vehicle>>,
    cars: Query<(&Transform, &Speed), With<Vehicle>>,
) {
    for (transform, mut driver, mut sensor) in sensors.iter_mut() {
        sensor.set_enabled(driver.on_intersection());
        sensor.update_volume(Pose::from_transform(transform), &config);
        sensor.members.retain(|other| cars.contains(other));

        let members = sensor
            .members
            .iter()
            .filter_map(|other| cars.get(other).ok())
            .map(|(transform, speed)| (transform.translation, speed.0));
        driver.force_brake_right = sensor.evaluate(members, &config);
    }
}
