//! Lateral yield sensor.
//!
//! A sphere around the car that is only live inside intersections. Cars
//! approaching from the front-right raise `force_brake_right`.

use bevy::prelude::*;

use super::proximity::ProximitySet;
use super::SensorConfig;
use crate::driving::steering::{heading_error, wrap_degrees};
use crate::vehicle::Pose;

#[derive(Component, Clone, Debug, Default)]
pub struct LateralSensor {
    pub members: ProximitySet,
    enabled: bool,
    origin: Vec3,
    yaw_degrees: f32,
}

impl LateralSensor {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    /// Disabling forgets every member.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.members.clear();
        }
    }

    pub fn update_volume(&mut self, pose: Pose, config: &SensorConfig) {
        self.origin = pose.transform_point(config.lateral_mount);
        self.yaw_degrees = pose.yaw_degrees;
    }

    pub fn contains(&self, point: Vec3, config: &SensorConfig) -> bool {
        self.origin.distance(point) <= config.lateral_radius + config.vehicle_radius
    }

    /// Bearing of `other` seen from the sensor, in [-180, 180). Positive
    /// bearings lie toward +yaw.
    pub fn bearing_to(&self, other: Vec3) -> f32 {
        wrap_degrees(heading_error(other, self.yaw_degrees, self.origin) - 180.0)
    }

    /// Brake decision for one tick. Members are visited in entry order and
    /// each one overwrites the decision of the previous.
    pub fn evaluate(
        &self,
        members: impl IntoIterator<Item = (Vec3, f32)>,
        config: &SensorConfig,
    ) -> bool {
        let window = config.lateral_bearing_min..=config.lateral_bearing_max;
        let mut brake = false;

        for (position, speed) in members {
            brake = window.contains(&self.bearing_to(position)) && speed > config.lateral_min_speed;
        }

        if self.members.is_empty() {
            brake = false;
        }
        brake
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SensorConfig {
        SensorConfig {
            lateral_mount: Vec3::ZERO,
            ..default()
        }
    }

    fn sensor(members: usize) -> LateralSensor {
        let mut sensor = LateralSensor::default();
        sensor.set_enabled(true);
        sensor.update_volume(Pose::new(Vec3::ZERO, 0.0), &config());
        for index in 0..members {
            sensor.members.insert(Entity::from_raw(index as u32));
        }
        sensor
    }

    fn at_bearing(degrees: f32, distance: f32) -> Vec3 {
        let radians = degrees.to_radians();
        Vec3::new(radians.sin(), 0.0, radians.cos()) * distance
    }

    #[test]
    fn bearing_is_measured_from_sensor_heading() {
        let sensor = sensor(0);
        for degrees in [-150.0, -40.0, 0.0, 40.0, 75.0, 120.0] {
            let bearing = sensor.bearing_to(at_bearing(degrees, 6.0));
            assert!((bearing - degrees).abs() < 1e-3, "{degrees} -> {bearing}");
        }
    }

    #[test]
    fn moving_car_at_forty_degrees_brakes() {
        let sensor = sensor(1);
        let other = at_bearing(40.0, 6.0);
        assert!(sensor.evaluate([(other, 2.0)], &config()));
        assert!(!sensor.evaluate([(other, 0.5)], &config()));
    }

    #[test]
    fn cars_outside_the_window_never_brake() {
        let sensor = sensor(1);
        for degrees in [-40.0, 80.0, 170.0] {
            assert!(!sensor.evaluate([(at_bearing(degrees, 6.0), 5.0)], &config()));
        }
    }

    #[test]
    fn last_member_decides() {
        let sensor = sensor(2);
        let blocking = (at_bearing(30.0, 5.0), 4.0);
        let harmless = (at_bearing(-90.0, 5.0), 4.0);
        assert!(!sensor.evaluate([blocking, harmless], &config()));
        assert!(sensor.evaluate([harmless, blocking], &config()));
    }

    #[test]
    fn disabling_clears_membership() {
        let mut sensor = sensor(2);
        sensor.set_enabled(false);
        assert!(!sensor.is_enabled());
        assert!(sensor.members.is_empty());
        assert!(!sensor.evaluate([(at_bearing(40.0, 6.0), 5.0)], &config()));
    }
}
