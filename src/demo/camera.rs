//! Overview camera that can chase one car at a time.

use bevy::prelude::*;

use crate::vehicle::{Pose, Vehicle};

#[derive(Resource)]
pub struct FollowCameraConfig {
    /// Chase position in vehicle space.
    pub offset: Vec3,
    /// How quickly the camera catches up, per second.
    pub smoothing: f32,
}

impl Default for FollowCameraConfig {
    fn default() -> Self {
        Self {
            offset: Vec3::new(0.0, 12.0, -22.0),
            smoothing: 4.0,
        }
    }
}

#[derive(Component)]
pub struct FollowCamera {
    pub target: Option<Entity>,
    /// Overview pose to return to.
    home: Transform,
}

pub(super) fn setup_camera(mut commands: Commands) {
    // Standard isometric angle: ~35.264 degrees (arctan(1/sqrt(2)))
    let iso_angle = 35.264_f32.to_radians();
    let distance = 120.0;
    let home = Transform::from_xyz(distance, distance * iso_angle.tan(), distance)
        .looking_at(Vec3::ZERO, Vec3::Y);

    commands.spawn((Camera3d::default(), home, FollowCamera { target: None, home }));
}

/// Tab cycles through the cars, Escape returns to the overview.
pub(super) fn cycle_follow_target(
    keys: Res<ButtonInput<KeyCode>>,
    vehicles: Query<(Entity, Option<&Name>), With<Vehicle>>,
    mut cameras: Query<&mut FollowCamera>,
) {
    let next = keys.just_pressed(KeyCode::Tab);
    let home = keys.just_pressed(KeyCode::Escape);
    if !next && !home {
        return;
    }

    let mut cars: Vec<(Entity, Option<&Name>)> = vehicles.iter().collect();
    cars.sort_by_key(|(entity, _)| *entity);

    for mut camera in &mut cameras {
        if home {
            camera.target = None;
            info!("Camera: overview");
            continue;
        }

        let position = camera
            .target
            .and_then(|current| cars.iter().position(|(entity, _)| *entity == current));
        let index = position.map_or(0, |index| index + 1);
        camera.target = cars.get(index).map(|(entity, _)| *entity);

        match cars.get(index) {
            Some((_, Some(name))) => info!("Camera: following {name}"),
            Some((entity, None)) => info!("Camera: following {entity}"),
            None => info!("Camera: overview"),
        }
    }
}

pub(super) fn follow_target(
    time: Res<Time>,
    config: Res<FollowCameraConfig>,
    vehicles: Query<&Transform, (With<Vehicle>, Without<FollowCamera>)>,
    mut cameras: Query<(&mut Transform, &mut FollowCamera)>,
) {
    let blend = (config.smoothing * time.delta_secs()).clamp(0.0, 1.0);

    for (mut transform, mut camera) in &mut cameras {
        let goal = match camera.target.map(|target| vehicles.get(target)) {
            None => camera.home,
            Some(Ok(vehicle)) => {
                let pose = Pose::from_transform(vehicle);
                Transform::from_translation(pose.transform_point(config.offset))
                    .looking_at(pose.position, Vec3::Y)
            }
            Some(Err(_)) => {
                // Target despawned.
                camera.target = None;
                camera.home
            }
        };

        transform.translation = transform.translation.lerp(goal.translation, blend);
        transform.rotation = transform.rotation.slerp(goal.rotation, blend);
    }
}
