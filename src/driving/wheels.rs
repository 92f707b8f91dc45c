//! Wheel actuation interface.

use bevy::prelude::*;
use smallvec::SmallVec;

use crate::road::SurfaceTag;

/// Surface a wheel is currently touching.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroundContact {
    pub surface: Entity,
    pub tag: SurfaceTag,
}

/// A wheel the driver can command. The physics behind it is opaque.
pub trait WheelActuator {
    fn set_command(&mut self, motor_torque: f32, brake_torque: f32, steer_angle: f32);

    fn ground_contact(&self) -> Option<&GroundContact>;

    /// Rotational speed in revolutions per minute.
    fn rotational_speed(&self) -> f32;
}

/// Torque and steering sent to every wheel of a vehicle.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DriveCommand {
    pub motor_torque: f32,
    pub brake_torque: f32,
    /// Degrees, positive toward +yaw.
    pub steer_angle: f32,
}

/// Wheel state shared between the driver and the physics backend.
#[derive(Clone, Debug)]
pub struct Wheel {
    /// Mount point in vehicle space.
    pub offset: Vec3,
    pub radius: f32,
    /// Whether the steer angle turns this wheel.
    pub steered: bool,
    pub command: DriveCommand,
    pub contact: Option<GroundContact>,
    pub rpm: f32,
}

impl Wheel {
    pub fn new(offset: Vec3, radius: f32, steered: bool) -> Self {
        Self {
            offset,
            radius,
            steered,
            command: DriveCommand::default(),
            contact: None,
            rpm: 0.0,
        }
    }
}

impl WheelActuator for Wheel {
    fn set_command(&mut self, motor_torque: f32, brake_torque: f32, steer_angle: f32) {
        self.command = DriveCommand {
            motor_torque,
            brake_torque,
            steer_angle: if self.steered { steer_angle } else { 0.0 },
        };
    }

    fn ground_contact(&self) -> Option<&GroundContact> {
        self.contact.as_ref()
    }

    fn rotational_speed(&self) -> f32 {
        self.rpm
    }
}

/// All wheels of a vehicle.
#[derive(Component, Clone, Debug, Default)]
pub struct WheelSet(pub SmallVec<[Wheel; 4]>);

impl WheelSet {
    /// Two steered front wheels and two fixed rear wheels.
    pub fn four_wheel(track: f32, wheelbase: f32, radius: f32) -> Self {
        let x = track * 0.5;
        let z = wheelbase * 0.5;
        Self(SmallVec::from_iter([
            Wheel::new(Vec3::new(-x, 0.0, z), radius, true),
            Wheel::new(Vec3::new(x, 0.0, z), radius, true),
            Wheel::new(Vec3::new(-x, 0.0, -z), radius, false),
            Wheel::new(Vec3::new(x, 0.0, -z), radius, false),
        ]))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Wheel> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Wheel> {
        self.0.iter_mut()
    }

    /// Contact of the first wheel that reports one.
    pub fn ground_contact(&self) -> Option<&GroundContact> {
        self.0.iter().find_map(|wheel| wheel.ground_contact())
    }

    /// Send the same command to every wheel.
    pub fn broadcast(&mut self, command: DriveCommand) {
        for wheel in self.0.iter_mut() {
            wheel.set_command(command.motor_torque, command.brake_torque, command.steer_angle);
        }
    }

    /// Distance between the front and rear axle.
    pub fn wheelbase(&self) -> f32 {
        let (min, max) = self
            .0
            .iter()
            .fold((f32::MAX, f32::MIN), |(min, max), w| (min.min(w.offset.z), max.max(w.offset.z)));
        (max - min).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_wheel_with_contact_wins() {
        let mut wheels = WheelSet::four_wheel(1.6, 2.6, 0.35);
        assert!(wheels.ground_contact().is_none());

        wheels.0[2].contact = Some(GroundContact {
            surface: Entity::from_raw(5),
            tag: SurfaceTag::Bend,
        });
        wheels.0[3].contact = Some(GroundContact {
            surface: Entity::from_raw(6),
            tag: SurfaceTag::Lane,
        });
        assert_eq!(wheels.ground_contact().unwrap().surface, Entity::from_raw(5));

        wheels.0[0].contact = Some(GroundContact {
            surface: Entity::from_raw(7),
            tag: SurfaceTag::Cross,
        });
        assert_eq!(wheels.ground_contact().unwrap().tag, SurfaceTag::Cross);
    }

    #[test]
    fn broadcast_only_steers_front_wheels() {
        let mut wheels = WheelSet::four_wheel(1.6, 2.6, 0.35);
        wheels.broadcast(DriveCommand {
            motor_torque: 100.0,
            brake_torque: 0.0,
            steer_angle: 12.0,
        });

        for wheel in wheels.iter() {
            assert_eq!(wheel.command.motor_torque, 100.0);
            let expected = if wheel.steered { 12.0 } else { 0.0 };
            assert_eq!(wheel.command.steer_angle, expected);
        }
        assert!((wheels.wheelbase() - 2.6).abs() < 1e-5);
    }
}
