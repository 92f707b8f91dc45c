//! autodrive demo - a road grid of self-driving cars.
//!
//! Space pauses, 1-4 set the simulation speed, Tab follows the next car and
//! Escape returns to the overview. T/Y/U toggle target, sensor and waypoint
//! gizmos.

use bevy::prelude::*;

use autodrive::debug::DebugGizmosPlugin;
use autodrive::demo::DemoPlugin;
use autodrive::kinematics::KinematicsPlugin;
use autodrive::AutodrivePlugin;

fn main() {
    // Force Vulkan backend on Windows (DX12 causes crashes on some systems)
    #[cfg(target_os = "windows")]
    std::env::set_var("WGPU_BACKEND", "vulkan");
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "autodrive".into(),
                resolution: (1280., 720.).into(),
                ..default()
            }),
            ..default()
        }))
        // Guidance, control and perception
        .add_plugins(AutodrivePlugin)
        // Stand-in wheel physics
        .add_plugins(KinematicsPlugin)
        // Scene, camera and controls
        .add_plugins(DemoPlugin)
        .add_plugins(DebugGizmosPlugin)
        .run();
}
