//! Demo road network: a 2x2 block grid.
//!
//! Four corner bends, a T junction in the middle of every outer side, a
//! cross in the center and twelve straight lanes joining them. Traffic keeps
//! right: every waypoint sits `lane_offset` to the right of the road's
//! centerline for the direction that uses it. Cars start spread over the
//! lanes, each heading for the far end of its lane.

use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::wheels::{wheel_rotation, WheelVisual};
use super::DemoSceneConfig;
use crate::driving::controller::Driver;
use crate::driving::wheels::WheelSet;
use crate::perception::{ForwardSensor, LateralSensor};
use crate::road::{Footprint, RoadSurface, SurfaceTag};
use crate::vehicle::{Pose, Speed, Vehicle, CARS_CONTAINER};

const WHEEL_RADIUS: f32 = 0.35;

const CAR_COLORS: &[(f32, f32, f32)] = &[
    (0.8, 0.1, 0.1),
    (0.1, 0.2, 0.6),
    (0.9, 0.9, 0.9),
    (0.15, 0.15, 0.15),
    (0.5, 0.5, 0.55),
    (0.1, 0.4, 0.2),
    (0.9, 0.6, 0.1),
];

/// Named surfaces and starting poses of the demo network.
#[derive(Debug, Default)]
pub struct RoadLayout {
    pub surfaces: Vec<(String, RoadSurface)>,
    pub spawn_points: Vec<Pose>,
}

/// Junction at a grid node.
struct Node {
    position: Vec3,
    /// Distance from the node to where its lanes begin.
    reach: f32,
}

pub fn grid_layout(config: &DemoSceneConfig) -> RoadLayout {
    let h = config.half_size;
    let junction_reach = config.junction_size / 2.0;
    let corner = |sx: f32, sz: f32| Node {
        position: Vec3::new(sx * h, 0.0, sz * h),
        reach: config.corner_radius,
    };
    let junction = |x: f32, z: f32| Node {
        position: Vec3::new(x, 0.0, z),
        reach: junction_reach,
    };

    let corners = [
        (-1.0, -1.0),
        (1.0, -1.0),
        (1.0, 1.0),
        (-1.0, 1.0),
    ];
    let south = junction(0.0, -h);
    let east = junction(h, 0.0);
    let north = junction(0.0, h);
    let west = junction(-h, 0.0);
    let center = junction(0.0, 0.0);

    let mut layout = RoadLayout::default();
    let mut centerlines = Vec::new();

    // Outer ring, counter-clockwise from the south-west corner.
    let ring = [
        (corner(-1.0, -1.0), &south),
        (corner(1.0, -1.0), &south),
        (corner(1.0, -1.0), &east),
        (corner(1.0, 1.0), &east),
        (corner(1.0, 1.0), &north),
        (corner(-1.0, 1.0), &north),
        (corner(-1.0, 1.0), &west),
        (corner(-1.0, -1.0), &west),
    ];
    let spokes = [&south, &east, &north, &west].map(|spoke| (spoke, &center));
    let ring_lanes = ring.iter().map(|(from, to)| (from, *to));
    for (from, to) in ring_lanes.chain(spokes) {
        let (name, surface, centerline) = lane(from, to, config);
        layout.surfaces.push((name, surface));
        centerlines.push(centerline);
    }

    for (sx, sz) in corners {
        layout.surfaces.push(bend(sx, sz, config));
    }

    layout
        .surfaces
        .push(intersection(&south, &[Vec3::NEG_X, Vec3::X, Vec3::Z], config));
    layout
        .surfaces
        .push(intersection(&east, &[Vec3::NEG_Z, Vec3::Z, Vec3::NEG_X], config));
    layout
        .surfaces
        .push(intersection(&north, &[Vec3::X, Vec3::NEG_X, Vec3::NEG_Z], config));
    layout
        .surfaces
        .push(intersection(&west, &[Vec3::Z, Vec3::NEG_Z, Vec3::X], config));
    layout.surfaces.push(intersection(
        &center,
        &[Vec3::NEG_Z, Vec3::X, Vec3::Z, Vec3::NEG_X],
        config,
    ));

    layout.spawn_points = spawn_points(&centerlines, config.car_count, config.lane_offset);
    layout
}

/// Right-hand side of a travel direction, matching [`Pose::right`].
fn right_of(direction: Vec3) -> Vec3 {
    Vec3::new(direction.z, 0.0, -direction.x)
}

/// Lane between two nodes. Each end marker is offset to the right of the
/// direction that drives toward it. Also returns the centerline.
fn lane(
    from: &Node,
    to: &Node,
    config: &DemoSceneConfig,
) -> (String, RoadSurface, (Vec3, Vec3)) {
    let direction = (to.position - from.position).normalize();
    let start = from.position + direction * from.reach;
    let end = to.position - direction * to.reach;
    let length = start.distance(end);

    let size = if direction.x.abs() > 0.5 {
        Vec2::new(length, config.road_width)
    } else {
        Vec2::new(config.road_width, length)
    };
    let mid = (start + end) / 2.0;
    let footprint = Footprint::new(Vec2::new(mid.x, mid.z), size);
    let side = right_of(direction) * config.lane_offset;

    (
        format!("Lane ({:.0}, {:.0})", mid.x, mid.z),
        RoadSurface::lane(footprint, start - side, end + side),
        (start, end),
    )
}

/// Quarter arc in the corner at (sx, sz) * half_size. Side A carries the
/// traffic from the horizontal edge to the vertical one, side B the other
/// way; both are listed from the horizontal edge. Each chain starts a little
/// past the other side's end so the finder can tell the two apart on entry.
fn bend(sx: f32, sz: f32, config: &DemoSceneConfig) -> (String, RoadSurface) {
    let h = config.half_size;
    let r = config.corner_radius;
    let arc_center = Vec3::new(sx * (h - r), 0.0, sz * (h - r));
    let outer = Vec2::new(sx * (h + config.road_width / 2.0), sz * (h + config.road_width / 2.0));
    let inner = Vec2::new(arc_center.x, arc_center.z);
    let footprint = Footprint::new((outer + inner) / 2.0, (outer - inner).abs());

    let chain = |radius: f32, first: f32, last: f32| -> Vec<Vec3> {
        let count = config.bend_points.max(2);
        let (first, last) = (first.to_radians(), last.to_radians());
        (0..count)
            .map(|i| {
                let t = first + (last - first) * i as f32 / (count - 1) as f32;
                arc_center + Vec3::new(sx * t.sin(), 0.0, sz * t.cos()) * radius
            })
            .collect()
    };
    // Right of the A direction is the outer edge when sx and sz differ in sign.
    let outward = -sx * sz * config.lane_offset;
    let side_a = chain(r + outward, 25.0, 87.0);
    let side_b = chain(r - outward, 3.0, 65.0);

    (
        format!("Bend ({sx:+.0}, {sz:+.0})"),
        RoadSurface::bend(footprint, &side_a, &side_b),
    )
}

/// Cross or CrossT with one entrance, turn point and exit per arm.
/// Entrances sit on the inbound side of their arm, turns and exits on the
/// outbound side.
fn intersection(node: &Node, arms: &[Vec3], config: &DemoSceneConfig) -> (String, RoadSurface) {
    let reach = config.junction_size / 2.0;
    let offset = config.lane_offset;
    let entrances: Vec<Vec3> = arms
        .iter()
        .map(|arm| node.position + *arm * (reach - 2.0) + right_of(-*arm) * offset)
        .collect();
    let turns: Vec<Vec3> = arms
        .iter()
        .map(|arm| node.position + *arm * 2.0 + right_of(*arm) * offset)
        .collect();
    // Just past the footprint so cars leave before reaching it.
    let exits: Vec<Vec3> = arms
        .iter()
        .map(|arm| node.position + *arm * (reach + 1.0) + right_of(*arm) * offset)
        .collect();

    let tag = if arms.len() >= 4 {
        SurfaceTag::Cross
    } else {
        SurfaceTag::CrossT
    };
    let size = Vec2::splat(config.junction_size);
    let footprint = Footprint::new(Vec2::new(node.position.x, node.position.z), size);

    (
        format!("{tag} ({:.0}, {:.0})", node.position.x, node.position.z),
        RoadSurface::intersection(tag, footprint, &entrances, &turns, &exits),
    )
}

/// Spread cars over the lane centerlines, a little behind each midpoint so
/// the far marker is the one ahead, and move them onto the right-hand side.
fn spawn_points(centerlines: &[(Vec3, Vec3)], count: usize, lane_offset: f32) -> Vec<Pose> {
    if centerlines.is_empty() {
        return Vec::new();
    }

    (0..count)
        .map(|k| {
            let (start, end) = centerlines[k % centerlines.len()];
            let round = k / centerlines.len();
            let fraction = 0.2 + 0.08 * (round % 4) as f32;
            let direction = (end - start).normalize();
            let position = start + (end - start) * fraction + right_of(direction) * lane_offset;
            Pose::new(position, direction.x.atan2(direction.z).to_degrees())
        })
        .collect()
}

pub(super) fn spawn_road_network(
    mut commands: Commands,
    config: Res<DemoSceneConfig>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let layout = grid_layout(&config);

    let asphalt = materials.add(StandardMaterial {
        base_color: Color::srgb(0.22, 0.22, 0.24),
        perceptual_roughness: 0.9,
        ..default()
    });
    let junction_material = materials.add(StandardMaterial {
        base_color: Color::srgb(0.28, 0.28, 0.3),
        perceptual_roughness: 0.9,
        ..default()
    });
    let grass = materials.add(StandardMaterial {
        base_color: Color::srgb(0.25, 0.4, 0.2),
        perceptual_roughness: 1.0,
        ..default()
    });

    let ground_size = config.half_size * 3.0;
    commands.spawn((
        Name::new("Ground"),
        Mesh3d(meshes.add(Plane3d::new(Vec3::Y, Vec2::splat(ground_size)))),
        MeshMaterial3d(grass),
        Transform::from_xyz(0.0, -0.02, 0.0),
    ));

    for (name, surface) in layout.surfaces {
        let footprint = surface.footprint;
        let material = if surface.tag == SurfaceTag::Lane {
            asphalt.clone()
        } else {
            junction_material.clone()
        };
        commands.spawn((
            Name::new(name),
            Mesh3d(meshes.add(Plane3d::new(Vec3::Y, footprint.half_extents))),
            MeshMaterial3d(material),
            Transform::from_xyz(footprint.center.x, 0.0, footprint.center.y),
            surface,
        ));
    }

    commands.spawn((
        DirectionalLight {
            illuminance: 10_000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(40.0, 80.0, 20.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    info!("Spawned demo road network");
}

pub(super) fn spawn_cars(
    mut commands: Commands,
    config: Res<DemoSceneConfig>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let layout = grid_layout(&config);
    let mut rng = StdRng::seed_from_u64(config.seed);

    let body_mesh = meshes.add(Cuboid::new(
        config.car_width,
        config.car_height * 0.6,
        config.car_length,
    ));
    let cabin_mesh = meshes.add(Cuboid::new(
        config.car_width * 0.9,
        config.car_height * 0.4,
        config.car_length * 0.5,
    ));
    let window_material = materials.add(StandardMaterial {
        base_color: Color::srgba(0.1, 0.15, 0.2, 0.8),
        perceptual_roughness: 0.1,
        metallic: 0.3,
        ..default()
    });
    let wheel_mesh = meshes.add(Cylinder::new(WHEEL_RADIUS, 0.25));
    let tyre_material = materials.add(StandardMaterial {
        base_color: Color::srgb(0.05, 0.05, 0.05),
        perceptual_roughness: 0.8,
        ..default()
    });

    // Car roots sit on the road; waypoint distances are measured from them.
    let body_y = config.car_height * 0.3;
    let cabin_y = config.car_height * 0.8;
    let track = config.car_width * 0.9;
    let wheels = WheelSet::four_wheel(track, config.car_length * 0.6, WHEEL_RADIUS);
    // Wheel hubs sit one radius above the contact point.
    let hubs: Vec<Vec3> = wheels
        .iter()
        .map(|wheel| wheel.offset + Vec3::Y * wheel.radius)
        .collect();

    let count = layout.spawn_points.len();
    commands
        .spawn((
            Name::new(CARS_CONTAINER),
            Transform::default(),
            Visibility::default(),
        ))
        .with_children(|cars| {
            for (index, pose) in layout.spawn_points.into_iter().enumerate() {
                let (r, g, b) = CAR_COLORS.choose(&mut rng).copied().unwrap_or((0.5, 0.5, 0.5));
                let car_material = materials.add(StandardMaterial {
                    base_color: Color::srgb(r, g, b),
                    perceptual_roughness: 0.4,
                    metallic: 0.6,
                    ..default()
                });

                cars.spawn((
                    Name::new(format!("Car {index}")),
                    Vehicle,
                    Speed::default(),
                    Driver::default(),
                    wheels.clone(),
                    ForwardSensor::default(),
                    LateralSensor::default(),
                    Transform::from_translation(pose.position)
                        .with_rotation(Quat::from_rotation_y(pose.yaw_degrees.to_radians())),
                    Visibility::default(),
                ))
                .with_children(|car| {
                    car.spawn((
                        Mesh3d(body_mesh.clone()),
                        MeshMaterial3d(car_material),
                        Transform::from_xyz(0.0, body_y, 0.0),
                    ));
                    car.spawn((
                        Mesh3d(cabin_mesh.clone()),
                        MeshMaterial3d(window_material.clone()),
                        Transform::from_xyz(0.0, cabin_y, -config.car_length * 0.1),
                    ));
                    for (wheel, hub) in hubs.iter().enumerate() {
                        car.spawn((
                            WheelVisual::new(wheel),
                            Mesh3d(wheel_mesh.clone()),
                            MeshMaterial3d(tyre_material.clone()),
                            Transform::from_translation(*hub)
                                .with_rotation(wheel_rotation(0.0, 0.0)),
                        ));
                    }
                });
            }
        });

    info!("Spawned {count} cars");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driving::target_finder::BendFinder;
    use crate::perception::SensorConfig;
    use crate::road::selection::farthest;
    use crate::road::WaypointGraph;

    fn layout() -> RoadLayout {
        grid_layout(&DemoSceneConfig::default())
    }

    fn count(layout: &RoadLayout, tag: SurfaceTag) -> usize {
        layout
            .surfaces
            .iter()
            .filter(|(_, surface)| surface.tag == tag)
            .count()
    }

    #[test]
    fn grid_has_every_surface_kind() {
        let layout = layout();
        assert_eq!(count(&layout, SurfaceTag::Lane), 12);
        assert_eq!(count(&layout, SurfaceTag::Bend), 4);
        assert_eq!(count(&layout, SurfaceTag::CrossT), 4);
        assert_eq!(count(&layout, SurfaceTag::Cross), 1);
    }

    #[test]
    fn lane_ends_touch_a_junction() {
        let layout = layout();
        let junctions: Vec<&RoadSurface> = layout
            .surfaces
            .iter()
            .map(|(_, surface)| surface)
            .filter(|surface| surface.tag != SurfaceTag::Lane)
            .collect();

        for (name, surface) in layout.surfaces.iter() {
            if surface.tag != SurfaceTag::Lane {
                continue;
            }
            for marker in surface.groups[0].iter().flatten() {
                assert!(
                    junctions.iter().any(|j| j.footprint.contains(*marker)),
                    "{name}: marker {marker} is not on a junction"
                );
            }
        }
    }

    #[test]
    fn junction_groups_are_well_formed() {
        let layout = layout();
        for (name, surface) in layout.surfaces.iter() {
            match surface.tag {
                SurfaceTag::Cross | SurfaceTag::CrossT => {
                    assert_eq!(surface.groups.len(), 3, "{name}");
                    let arms = surface.groups[0].len();
                    assert!(surface.groups.iter().all(|g| g.len() == arms), "{name}");
                    // Entrances and turns lie inside, exits just outside.
                    for entrance in surface.groups[0].iter().flatten() {
                        assert!(surface.footprint.contains(*entrance), "{name}");
                    }
                    for exit in surface.groups[2].iter().flatten() {
                        assert!(!surface.footprint.contains(*exit), "{name}");
                    }
                }
                SurfaceTag::Bend => {
                    assert_eq!(surface.groups.len(), 2, "{name}");
                    for point in surface.groups.iter().flatten().flatten() {
                        assert!(surface.footprint.contains(*point), "{name}: {point}");
                    }
                }
                _ => {}
            }
        }
    }

    #[test]
    fn cars_start_on_a_lane_facing_its_far_end() {
        let layout = layout();
        assert_eq!(layout.spawn_points.len(), DemoSceneConfig::default().car_count);

        for pose in layout.spawn_points.iter() {
            let (_, lane) = layout
                .surfaces
                .iter()
                .find(|(_, surface)| {
                    surface.tag == SurfaceTag::Lane && surface.footprint.contains(pose.position)
                })
                .expect("spawn point off every lane");

            let markers = &lane.groups[0];
            let target = farthest(pose.position, markers)
                .and_then(|index| markers[index])
                .unwrap();
            assert!(pose.forward().dot(target - pose.position) > 0.0);
        }
    }

    #[test]
    fn opposing_traffic_passes_outside_the_forward_volume() {
        let config = DemoSceneConfig::default();
        let sensors = SensorConfig::default();
        let layout = layout();

        for (name, surface) in layout.surfaces.iter() {
            if surface.tag != SurfaceTag::Lane {
                continue;
            }
            let (Some(back), Some(ahead)) = (surface.groups[0][0], surface.groups[0][1]) else {
                panic!("{name}: missing marker");
            };
            let delta = ahead - back;
            let direction = if delta.x.abs() > delta.z.abs() {
                Vec3::X * delta.x.signum()
            } else {
                Vec3::Z * delta.z.signum()
            };
            let across = delta.dot(right_of(direction));
            assert!((across - 2.0 * config.lane_offset).abs() < 1e-3, "{name}");

            // One car on each side, closing on each other at cruising speed.
            let length = delta.dot(direction);
            let yaw = direction.x.atan2(direction.z).to_degrees();
            let outbound = Pose::new(ahead - direction * length * 0.7, yaw);
            let inbound = back + direction * length * 0.6;
            let mut sensor = ForwardSensor::default();
            sensor.update_volume(outbound, 0.0, 12.0, &sensors);
            assert!(
                !sensor.contains(inbound, sensors.forward_width, sensors.vehicle_radius),
                "{name}: oncoming car inside the forward volume"
            );
        }
    }

    #[test]
    fn bend_entry_picks_the_side_of_travel() {
        let layout = layout();
        let (_, bend) = layout
            .surfaces
            .iter()
            .find(|(name, _)| name == "Bend (+1, -1)")
            .unwrap();
        let surface = Entity::from_raw(7);
        let mut graph = WaypointGraph::default();
        graph.insert(surface, bend.groups.clone());

        // Arriving eastbound along the south edge, on its right-hand side.
        let finder = BendFinder::new(surface, Vec3::new(44.0, 0.0, -62.0), &graph);
        assert_eq!(finder.side(), Some(0));
        assert_eq!(finder.index(), 0);
        assert_eq!(finder.step(), 1);

        // Arriving southbound along the east edge.
        let finder = BendFinder::new(surface, Vec3::new(58.0, 0.0, -44.0), &graph);
        assert_eq!(finder.side(), Some(1));
        assert_eq!(finder.index(), bend.groups[1].len() - 1);
        assert_eq!(finder.step(), -1);
    }
}
