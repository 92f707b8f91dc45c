//! Road surfaces and the waypoint graph the drivers steer along.
//!
//! Every drivable surface is an entity carrying a [`RoadSurface`]: a tag that
//! picks the guidance strategy, a footprint used for ground contact, and the
//! waypoint groups authored for it. The groups are mirrored into the
//! [`WaypointGraph`] resource so guidance code can look them up by
//! `(surface, group)` without touching the scene.

use std::collections::HashMap;
use std::fmt;

use bevy::prelude::*;
use smallvec::SmallVec;

pub mod selection;

/// Group indices inside an intersection surface.
pub const ENTRANCES: usize = 0;
pub const TURNS: usize = 1;
pub const EXITS: usize = 2;

/// Group index of the end markers on a lane surface.
pub const LANE_MARKERS: usize = 0;

/// One ordered group of waypoints. `None` marks a destroyed waypoint.
pub type WaypointGroup = SmallVec<[Option<Vec3>; 8]>;

pub struct RoadPlugin;

impl Plugin for RoadPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<WaypointGraph>()
            .add_systems(PreUpdate, index_road_surfaces);
    }
}

/// Kind of road surface, read from the surface's tag.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum SurfaceTag {
    Lane,
    Cross,
    CrossT,
    Bend,
    /// Any tag without a guidance strategy.
    Other(String),
}

impl SurfaceTag {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "Lane" => Self::Lane,
            "Cross" => Self::Cross,
            "CrossT" => Self::CrossT,
            "Bend" => Self::Bend,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Lane => "Lane",
            Self::Cross => "Cross",
            Self::CrossT => "CrossT",
            Self::Bend => "Bend",
            Self::Other(tag) => tag,
        }
    }

    /// Cross and CrossT surfaces.
    pub fn is_intersection(&self) -> bool {
        matches!(self, Self::Cross | Self::CrossT)
    }
}

impl fmt::Display for SurfaceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Axis-aligned rectangle on the ground plane (x/z).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Footprint {
    pub center: Vec2,
    pub half_extents: Vec2,
}

impl Footprint {
    pub fn new(center: Vec2, size: Vec2) -> Self {
        Self {
            center,
            half_extents: size * 0.5,
        }
    }

    pub fn contains(&self, point: Vec3) -> bool {
        let offset = (Vec2::new(point.x, point.z) - self.center).abs();
        offset.x <= self.half_extents.x && offset.y <= self.half_extents.y
    }
}

/// A drivable surface with its authored waypoints.
#[derive(Component, Clone, Debug)]
pub struct RoadSurface {
    pub tag: SurfaceTag,
    pub footprint: Footprint,
    pub groups: SmallVec<[WaypointGroup; 3]>,
}

impl RoadSurface {
    pub fn new(
        tag: SurfaceTag,
        footprint: Footprint,
        groups: impl IntoIterator<Item = WaypointGroup>,
    ) -> Self {
        Self {
            tag,
            footprint,
            groups: groups.into_iter().collect(),
        }
    }

    /// Straight lane with its two end markers.
    pub fn lane(footprint: Footprint, start: Vec3, end: Vec3) -> Self {
        Self::new(
            SurfaceTag::Lane,
            footprint,
            [SmallVec::from_iter([Some(start), Some(end)])],
        )
    }

    /// Cross or CrossT: entrances, turn points and exits share lane indices.
    pub fn intersection(
        tag: SurfaceTag,
        footprint: Footprint,
        entrances: &[Vec3],
        turns: &[Vec3],
        exits: &[Vec3],
    ) -> Self {
        Self::new(
            tag,
            footprint,
            [group_of(entrances), group_of(turns), group_of(exits)],
        )
    }

    /// Bend with two sides, each an ordered chain of waypoints.
    pub fn bend(footprint: Footprint, side_a: &[Vec3], side_b: &[Vec3]) -> Self {
        Self::new(SurfaceTag::Bend, footprint, [group_of(side_a), group_of(side_b)])
    }
}

fn group_of(points: &[Vec3]) -> WaypointGroup {
    points.iter().copied().map(Some).collect()
}

/// Read-only access to the waypoint groups of each surface.
pub trait WaypointLookup {
    /// Waypoints of `group` on `surface`; empty when either is unknown.
    fn group(&self, surface: Entity, group: usize) -> &[Option<Vec3>];

    fn waypoint(&self, surface: Entity, group: usize, index: usize) -> Option<Vec3> {
        self.group(surface, group).get(index).copied().flatten()
    }
}

/// Waypoint groups of every road surface, keyed by surface entity.
#[derive(Resource, Default, Debug)]
pub struct WaypointGraph {
    surfaces: HashMap<Entity, SmallVec<[WaypointGroup; 3]>>,
}

impl WaypointGraph {
    pub fn insert(&mut self, surface: Entity, groups: impl IntoIterator<Item = WaypointGroup>) {
        self.surfaces.insert(surface, groups.into_iter().collect());
    }

    pub fn remove(&mut self, surface: Entity) {
        self.surfaces.remove(&surface);
    }

    /// Mark a waypoint as destroyed. Returns false if it did not exist.
    pub fn destroy_waypoint(&mut self, surface: Entity, group: usize, index: usize) -> bool {
        let Some(slot) = self
            .surfaces
            .get_mut(&surface)
            .and_then(|groups| groups.get_mut(group))
            .and_then(|waypoints| waypoints.get_mut(index))
        else {
            return false;
        };
        slot.take().is_some()
    }

    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }
}

impl WaypointLookup for WaypointGraph {
    fn group(&self, surface: Entity, group: usize) -> &[Option<Vec3>] {
        self.surfaces
            .get(&surface)
            .and_then(|groups| groups.get(group))
            .map(|waypoints| waypoints.as_slice())
            .unwrap_or(&[])
    }
}

/// Mirror added/changed road surfaces into the waypoint graph.
fn index_road_surfaces(
    mut graph: ResMut<WaypointGraph>,
    surfaces: Query<(Entity, &RoadSurface), Changed<RoadSurface>>,
    mut removed: RemovedComponents<RoadSurface>,
) {
    for entity in removed.read() {
        graph.remove(entity);
    }

    let mut indexed = 0usize;
    for (entity, surface) in surfaces.iter() {
        graph.insert(entity, surface.groups.iter().cloned());
        indexed += 1;
    }

    if indexed > 0 {
        debug!(
            "Indexed {} road surfaces ({} total)",
            indexed,
            graph.surface_count()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_parse_known_and_unknown_names() {
        assert_eq!(SurfaceTag::from_tag("Lane"), SurfaceTag::Lane);
        assert_eq!(SurfaceTag::from_tag("CrossT"), SurfaceTag::CrossT);
        assert_eq!(
            SurfaceTag::from_tag("Sidewalk"),
            SurfaceTag::Other("Sidewalk".to_string())
        );
        assert!(SurfaceTag::Cross.is_intersection());
        assert!(SurfaceTag::CrossT.is_intersection());
        assert!(!SurfaceTag::Bend.is_intersection());
        assert_eq!(SurfaceTag::from_tag("Sidewalk").to_string(), "Sidewalk");
    }

    #[test]
    fn footprint_contains_points_on_ground_plane() {
        let footprint = Footprint::new(Vec2::new(10.0, 0.0), Vec2::new(4.0, 20.0));
        assert!(footprint.contains(Vec3::new(11.5, 3.0, 9.0)));
        assert!(!footprint.contains(Vec3::new(12.5, 0.0, 0.0)));
        assert!(!footprint.contains(Vec3::new(10.0, 0.0, -10.5)));
    }

    #[test]
    fn lookup_of_unknown_surface_is_empty() {
        let graph = WaypointGraph::default();
        assert!(graph.group(Entity::from_raw(3), 0).is_empty());
        assert_eq!(graph.waypoint(Entity::from_raw(3), 0, 0), None);
    }

    #[test]
    fn destroyed_waypoints_read_as_none() {
        let surface = Entity::from_raw(1);
        let mut graph = WaypointGraph::default();
        let lane = RoadSurface::lane(
            Footprint::new(Vec2::ZERO, Vec2::new(4.0, 40.0)),
            Vec3::new(0.0, 0.0, -20.0),
            Vec3::new(0.0, 0.0, 20.0),
        );
        graph.insert(surface, lane.groups);

        assert!(graph.destroy_waypoint(surface, LANE_MARKERS, 1));
        assert!(!graph.destroy_waypoint(surface, LANE_MARKERS, 1));
        assert!(!graph.destroy_waypoint(surface, 5, 0));
        assert_eq!(graph.waypoint(surface, LANE_MARKERS, 1), None);
        assert_eq!(graph.group(surface, LANE_MARKERS).len(), 2);
    }
}
