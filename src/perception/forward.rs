//! Forward yield sensor.
//!
//! A box ahead of the car that grows with the square of its speed and swings
//! with half the steering angle. Cars caught in it raise `force_brake`.

use bevy::prelude::*;

use super::proximity::ProximitySet;
use super::SensorConfig;
use crate::vehicle::Pose;

#[derive(Component, Clone, Debug, Default)]
pub struct ForwardSensor {
    pub members: ProximitySet,
    origin: Vec3,
    yaw_degrees: f32,
    length: f32,
}

impl ForwardSensor {
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn yaw_degrees(&self) -> f32 {
        self.yaw_degrees
    }

    pub fn length(&self) -> f32 {
        self.length
    }

    /// Resize and re-aim the volume for the current speed and steering.
    pub fn update_volume(
        &mut self,
        pose: Pose,
        steering_angle: f32,
        speed: f32,
        config: &SensorConfig,
    ) {
        self.origin = pose.transform_point(config.forward_mount);
        self.yaw_degrees = pose.yaw_degrees + steering_angle / 2.0;
        self.length = speed * speed + config.forward_base_length;
    }

    /// Whether `point` lies inside the box, widened by `margin` on each side.
    pub fn contains(&self, point: Vec3, width: f32, margin: f32) -> bool {
        let aim = Pose::new(self.origin, self.yaw_degrees);
        let offset = point - self.origin;
        let along = offset.dot(aim.forward());
        let across = offset.dot(aim.right());
        (-margin..=self.length + margin).contains(&along) && across.abs() <= width / 2.0 + margin
    }

    /// Brake decision for one tick, given the position and speed of every
    /// current member. Far cars matter only when slower than us; near cars
    /// matter whenever they move.
    pub fn evaluate(
        &self,
        own_speed: f32,
        members: impl IntoIterator<Item = (Vec3, f32)>,
        config: &SensorConfig,
    ) -> bool {
        let near_limit = config.forward_near_fraction * self.length;
        let mut brake = false;

        for (position, speed) in members {
            if self.origin.distance(position) > near_limit {
                if speed < own_speed {
                    brake = true;
                }
            } else if speed > config.stationary_speed {
                brake = true;
            }
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
            forward_mount: Vec3::ZERO,
            ..default()
        }
    }

    fn sensor_at_rest(members: usize) -> ForwardSensor {
        let mut sensor = ForwardSensor::default();
        sensor.update_volume(Pose::new(Vec3::ZERO, 0.0), 0.0, 0.0, &config());
        for index in 0..members {
            sensor.members.insert(Entity::from_raw(index as u32));
        }
        sensor
    }

    #[test]
    fn volume_grows_with_speed_squared_and_follows_half_steering() {
        let mut sensor = ForwardSensor::default();
        sensor.update_volume(Pose::new(Vec3::ZERO, 30.0), 20.0, 4.0, &config());
        assert_eq!(sensor.length(), 26.0);
        assert_eq!(sensor.yaw_degrees(), 40.0);

        sensor.update_volume(Pose::new(Vec3::ZERO, 30.0), -20.0, 0.0, &config());
        assert_eq!(sensor.length(), 10.0);
        assert_eq!(sensor.yaw_degrees(), 20.0);
    }

    #[test]
    fn volume_contains_points_ahead_only() {
        let sensor = sensor_at_rest(0);
        assert!(sensor.contains(Vec3::new(0.5, 0.0, 8.0), 2.0, 0.0));
        assert!(!sensor.contains(Vec3::new(0.0, 0.0, -3.0), 2.0, 0.0));
        assert!(!sensor.contains(Vec3::new(0.0, 0.0, 12.0), 2.0, 0.0));
        assert!(!sensor.contains(Vec3::new(3.0, 0.0, 5.0), 2.0, 0.0));
        assert!(sensor.contains(Vec3::new(3.0, 0.0, 5.0), 2.0, 2.5));
    }

    #[test]
    fn near_boundary_sits_at_sixty_percent_of_length() {
        let sensor = sensor_at_rest(1);
        let config = config();

        // Just inside the near zone: any moving car brakes us.
        assert!(sensor.evaluate(5.0, [(Vec3::new(0.0, 0.0, 5.99), 3.0)], &config));
        assert!(!sensor.evaluate(5.0, [(Vec3::new(0.0, 0.0, 5.99), 0.05)], &config));

        // Just beyond it: only slower cars brake us.
        assert!(!sensor.evaluate(5.0, [(Vec3::new(0.0, 0.0, 6.01), 6.0)], &config));
        assert!(sensor.evaluate(5.0, [(Vec3::new(0.0, 0.0, 6.01), 3.0)], &config));
    }

    #[test]
    fn trailing_a_faster_lead_does_not_brake() {
        let sensor = sensor_at_rest(1);
        let lead = (Vec3::new(0.0, 0.0, 9.0), 8.0);
        assert!(!sensor.evaluate(4.0, [lead], &config()));
    }

    #[test]
    fn any_blocking_member_raises_the_flag() {
        let sensor = sensor_at_rest(2);
        let members = [(Vec3::new(0.0, 0.0, 9.0), 8.0), (Vec3::new(0.0, 0.0, 2.0), 1.0)];
        assert!(sensor.evaluate(4.0, members, &config()));
    }

    #[test]
    fn empty_set_never_brakes() {
        let sensor = sensor_at_rest(0);
        assert!(!sensor.evaluate(4.0, [(Vec3::new(0.0, 0.0, 2.0), 1.0)], &config()));
    }
}
