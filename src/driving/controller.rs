//! Per-vehicle drive controller.
//!
//! Guidance is refreshed once per frame from the wheels' ground contact;
//! torque and steering are synthesized on the fixed physics step from the
//! current target and the brake requests raised by the proximity sensors.

use bevy::prelude::*;
use rand::Rng;

use crate::driving::steering::{heading_error, low_pass, speed_limited};
use crate::driving::target_finder::TargetFinder;
use crate::driving::wheels::{DriveCommand, GroundContact};
use crate::driving::DriverConfig;
use crate::error::GuidanceFault;
use crate::road::WaypointLookup;
use crate::vehicle::Pose;

/// Effective target speed while any brake request is raised.
const FORCED_BRAKE_SPEED: f32 = -1.0;

#[derive(Component, Debug, Default)]
pub struct Driver {
    /// Applied steering angle in degrees, after low-pass filtering.
    pub steering_angle: f32,
    /// Raised by the forward sensor.
    pub force_brake: bool,
    /// Raised by the lateral sensor inside intersections.
    pub force_brake_right: bool,
    ground: Option<GroundContact>,
    finder: Option<TargetFinder>,
    fault: Option<GuidanceFault>,
}

impl Driver {
    /// Surface the vehicle was last seen on.
    pub fn ground(&self) -> Option<&GroundContact> {
        self.ground.as_ref()
    }

    pub fn finder(&self) -> Option<&TargetFinder> {
        self.finder.as_ref()
    }

    pub fn fault(&self) -> Option<&GuidanceFault> {
        self.fault.as_ref()
    }

    pub fn on_intersection(&self) -> bool {
        self.ground
            .as_ref()
            .is_some_and(|ground| ground.tag.is_intersection())
    }

    /// Track the surface under the wheels. A new surface replaces the target
    /// finder; the same surface advances the existing one. Without any
    /// contact the previous surface is kept. Returns true when the finder
    /// was replaced.
    pub fn refresh_guidance<L, R>(
        &mut self,
        contact: Option<&GroundContact>,
        position: Vec3,
        waypoints: &L,
        rng: &mut R,
    ) -> bool
    where
        L: WaypointLookup + ?Sized,
        R: Rng + ?Sized,
    {
        let same_surface = match (contact, self.ground.as_ref()) {
            (None, _) => true,
            (Some(contact), Some(ground)) => contact.surface == ground.surface,
            (Some(_), None) => false,
        };

        if same_surface {
            if let Some(finder) = self.finder.as_mut() {
                finder.update_target(position, waypoints);
            }
            return false;
        }

        let Some(contact) = contact else {
            return false;
        };
        self.ground = Some(contact.clone());
        match TargetFinder::for_surface(&contact.tag, contact.surface, position, waypoints, rng) {
            Ok(finder) => {
                self.finder = Some(finder);
                self.fault = None;
            }
            Err(fault) => {
                self.finder = None;
                self.fault = Some(fault);
            }
        }
        true
    }

    /// Resolve the current target and synthesize a command for it. On error
    /// nothing is commanded and the previous wheel state stands.
    pub fn drive<L>(
        &mut self,
        pose: Pose,
        speed: f32,
        waypoints: &L,
        config: &DriverConfig,
    ) -> Result<DriveCommand, GuidanceFault>
    where
        L: WaypointLookup + ?Sized,
    {
        let guidance = match self.finder.as_ref() {
            Some(finder) => finder
                .target(waypoints)
                .map(|target| (finder.max_speed(), target)),
            None => Err(self.fault.clone().unwrap_or(GuidanceFault::MissingGuidance)),
        };

        match guidance {
            Ok((advisory_speed, target)) => {
                self.fault = None;
                Ok(self.synthesize(pose, speed, advisory_speed, target, config))
            }
            Err(fault) => {
                self.fault = Some(fault.clone());
                Err(fault)
            }
        }
    }

    /// Torque from the speed policy, steering from the filtered heading error.
    pub fn synthesize(
        &mut self,
        pose: Pose,
        speed: f32,
        advisory_speed: f32,
        target: Vec3,
        config: &DriverConfig,
    ) -> DriveCommand {
        let max_speed = if self.force_brake || self.force_brake_right {
            FORCED_BRAKE_SPEED
        } else {
            advisory_speed
        };

        let (motor_torque, brake_torque) = if speed <= max_speed {
            (config.max_motor_torque, 0.0)
        } else {
            (0.0, config.max_brake_torque)
        };

        let desired = speed_limited(
            heading_error(pose.position, pose.yaw_degrees, target),
            config.max_steering_angle,
            speed,
            config.steering_speed_limit,
        );
        self.steering_angle = low_pass(desired, self.steering_angle, config.steering_angle_lowpass);

        DriveCommand {
            motor_torque,
            brake_torque,
            steer_angle: self.steering_angle,
        }
    }
}
