//! Debug rendering of guidance and sensors using Bevy gizmos.

use bevy::prelude::*;

use crate::driving::controller::Driver;
use crate::perception::{ForwardSensor, LateralSensor, SensorConfig};
use crate::road::{RoadSurface, WaypointGraph, WaypointLookup};
use crate::vehicle::{Pose, Vehicle};

pub struct DebugGizmosPlugin;

impl Plugin for DebugGizmosPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DebugGizmosConfig>().add_systems(
            Update,
            (
                toggle_debug_gizmos,
                draw_targets,
                draw_sensor_volumes,
                draw_waypoints,
            ),
        );
    }
}

#[derive(Resource)]
pub struct DebugGizmosConfig {
    pub show_targets: bool,
    pub show_sensors: bool,
    pub show_waypoints: bool,
}

impl Default for DebugGizmosConfig {
    fn default() -> Self {
        Self {
            show_targets: true,
            show_sensors: false,
            show_waypoints: false,
        }
    }
}

fn toggle_debug_gizmos(keys: Res<ButtonInput<KeyCode>>, mut config: ResMut<DebugGizmosConfig>) {
    if keys.just_pressed(KeyCode::KeyT) {
        config.show_targets = !config.show_targets;
        info!("Targets: {}", if config.show_targets { "ON" } else { "OFF" });
    }

    if keys.just_pressed(KeyCode::KeyY) {
        config.show_sensors = !config.show_sensors;
        info!("Sensors: {}", if config.show_sensors { "ON" } else { "OFF" });
    }

    if keys.just_pressed(KeyCode::KeyU) {
        config.show_waypoints = !config.show_waypoints;
        info!(
            "Waypoints: {}",
            if config.show_waypoints { "ON" } else { "OFF" }
        );
    }
}

/// Line to the current target, or a red post over cars without guidance.
fn draw_targets(
    config: Res<DebugGizmosConfig>,
    graph: Res<WaypointGraph>,
    vehicles: Query<(&Transform, &Driver), With<Vehicle>>,
    mut gizmos: Gizmos,
) {
    if !config.show_targets {
        return;
    }

    for (transform, driver) in vehicles.iter() {
        let position = transform.translation;
        let target = driver
            .finder()
            .and_then(|finder| finder.target(&*graph).ok());

        match target {
            Some(target) => {
                let color = if driver.force_brake || driver.force_brake_right {
                    Color::srgb(1.0, 0.6, 0.0)
                } else {
                    Color::srgb(0.0, 1.0, 0.0)
                };
                gizmos.line(position + Vec3::Y, target + Vec3::Y, color);
            }
            None => {
                gizmos.ray(position, Vec3::Y * 5.0, Color::srgb(1.0, 0.0, 0.0));
            }
        }
    }
}

fn draw_sensor_volumes(
    config: Res<DebugGizmosConfig>,
    sensor_config: Res<SensorConfig>,
    vehicles: Query<(&ForwardSensor, &LateralSensor), With<Vehicle>>,
    mut gizmos: Gizmos,
) {
    if !config.show_sensors {
        return;
    }

    for (forward, lateral) in vehicles.iter() {
        let aim = Pose::new(forward.origin(), forward.yaw_degrees());
        let half = aim.right() * sensor_config.forward_width / 2.0;
        let far = aim.forward() * forward.length();
        let near = forward.origin();
        let corners = [near - half, near + half, near + half + far, near - half + far];

        let color = if forward.members.is_empty() {
            Color::srgb(0.3, 0.6, 1.0)
        } else {
            Color::srgb(1.0, 0.3, 0.3)
        };
        for (index, corner) in corners.iter().enumerate() {
            let next = corners[(index + 1) % corners.len()];
            gizmos.line(*corner + Vec3::Y * 0.5, next + Vec3::Y * 0.5, color);
        }

        if lateral.is_enabled() {
            let isometry = Isometry3d::new(
                lateral.origin() + Vec3::Y * 0.5,
                Quat::from_rotation_x(std::f32::consts::FRAC_PI_2),
            );
            gizmos.circle(isometry, sensor_config.lateral_radius, Color::srgb(1.0, 1.0, 0.0));
        }
    }
}

/// Cross markers on every waypoint that has not been destroyed.
fn draw_waypoints(
    config: Res<DebugGizmosConfig>,
    graph: Res<WaypointGraph>,
    surfaces: Query<(Entity, &RoadSurface)>,
    mut gizmos: Gizmos,
) {
    if !config.show_waypoints {
        return;
    }

    let colors = [
        Color::srgb(0.0, 1.0, 0.0),
        Color::srgb(1.0, 1.0, 0.0),
        Color::srgb(1.0, 0.0, 1.0),
    ];
    let size = 0.5;

    for (entity, surface) in surfaces.iter() {
        for group in 0..surface.groups.len() {
            let color = colors[group % colors.len()];
            for pos in graph.group(entity, group).iter().flatten() {
                let pos = *pos + Vec3::Y * 0.2;
                gizmos.line(pos + Vec3::X * size, pos - Vec3::X * size, color);
                gizmos.line(pos + Vec3::Z * size, pos - Vec3::Z * size, color);
            }
        }
    }
}
