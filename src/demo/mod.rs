//! Self-contained demo scene: a small road grid full of autonomous cars.

use bevy::prelude::*;
use bevy::transform::TransformSystem;

pub mod camera;
pub mod scene;
pub mod wheels;

pub use camera::{FollowCamera, FollowCameraConfig};
pub use scene::{grid_layout, RoadLayout};
pub use wheels::WheelVisual;

pub struct DemoPlugin;

impl Plugin for DemoPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DemoSceneConfig>()
            .init_resource::<FollowCameraConfig>()
            .add_systems(
                Startup,
                (
                    scene::spawn_road_network,
                    scene::spawn_cars,
                    camera::setup_camera,
                ),
            )
            .add_systems(Update, (simulation_controls, camera::cycle_follow_target))
            .add_systems(
                PostUpdate,
                (camera::follow_target, wheels::animate_wheels)
                    .before(TransformSystem::TransformPropagate),
            );
    }
}

/// Layout and population of the demo scene.
#[derive(Resource, Clone, Debug)]
pub struct DemoSceneConfig {
    /// Distance from the grid center to the outer ring's centerline.
    pub half_size: f32,
    pub road_width: f32,
    /// Side of the square Cross/CrossT surfaces.
    pub junction_size: f32,
    /// Radius of the corner bends.
    pub corner_radius: f32,
    /// Distance from the road centerline to the middle of each traffic lane.
    pub lane_offset: f32,
    /// Waypoints per bend side.
    pub bend_points: usize,
    pub car_count: usize,
    pub car_length: f32,
    pub car_width: f32,
    pub car_height: f32,
    pub seed: u64,
}

impl Default for DemoSceneConfig {
    fn default() -> Self {
        Self {
            half_size: 60.0,
            road_width: 8.0,
            junction_size: 16.0,
            corner_radius: 15.0,
            lane_offset: 2.0,
            bend_points: 6,
            car_count: 12,
            car_length: 4.2,
            car_width: 1.7,
            car_height: 1.3,
            seed: 99999,
        }
    }
}

/// Keyboard controls for simulation speed and pause.
fn simulation_controls(keyboard: Res<ButtonInput<KeyCode>>, mut time: ResMut<Time<Virtual>>) {
    // Space: Toggle pause
    if keyboard.just_pressed(KeyCode::Space) {
        if time.is_paused() {
            time.unpause();
            info!("Simulation RESUMED ({}x speed)", time.relative_speed());
        } else {
            time.pause();
            info!("Simulation PAUSED");
        }
    }

    // Number keys for speed presets
    for (key, speed) in [
        (KeyCode::Digit1, 1.0),
        (KeyCode::Digit2, 2.0),
        (KeyCode::Digit3, 3.0),
        (KeyCode::Digit4, 4.0),
    ] {
        if keyboard.just_pressed(key) {
            time.set_relative_speed(speed);
            info!("Simulation speed: {speed}x");
        }
    }
}
