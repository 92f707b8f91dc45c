//! Path-following target selection.
//!
//! A [`TargetFinder`] is built when a vehicle arrives on a new road surface
//! and picks the first waypoint right away. Afterwards `update_target` runs
//! once per frame and moves the target along the surface's waypoints. The
//! finder only stores indices into the waypoint graph; positions are always
//! resolved through a [`WaypointLookup`], so a destroyed waypoint shows up as
//! lost guidance instead of a stale position.

use bevy::prelude::*;
use rand::seq::SliceRandom;
use rand::Rng;
use smallvec::SmallVec;

use crate::error::GuidanceFault;
use crate::road::selection::{farthest, nearest};
use crate::road::{SurfaceTag, WaypointLookup, ENTRANCES, EXITS, LANE_MARKERS, TURNS};

/// Advisory speed while cruising along a lane.
pub const LANE_CRUISE_SPEED: f32 = 12.0;
/// Advisory speed once the end of a lane is close.
pub const LANE_APPROACH_SPEED: f32 = 3.8;
/// Distance to the lane target below which the approach speed applies.
pub const LANE_APPROACH_DISTANCE: f32 = 15.0;
pub const INTERSECTION_SPEED: f32 = 3.0;
pub const BEND_SPEED: f32 = 11.0;
/// Distance at which a waypoint counts as reached.
pub const WAYPOINT_REACHED_DISTANCE: f32 = 0.5;

/// Location of a waypoint inside a surface's groups.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaypointRef {
    pub group: usize,
    pub index: usize,
}

/// Guidance strategy for the surface a vehicle currently occupies.
#[derive(Clone, Debug, PartialEq)]
pub enum TargetFinder {
    Lane(LaneFinder),
    Intersection(IntersectionFinder),
    Bend(BendFinder),
}

impl TargetFinder {
    /// Build the strategy matching `tag` and select its first target.
    pub fn for_surface<L, R>(
        tag: &SurfaceTag,
        surface: Entity,
        position: Vec3,
        waypoints: &L,
        rng: &mut R,
    ) -> Result<Self, GuidanceFault>
    where
        L: WaypointLookup + ?Sized,
        R: Rng + ?Sized,
    {
        match tag {
            SurfaceTag::Lane => Ok(Self::Lane(LaneFinder::new(surface, position, waypoints))),
            SurfaceTag::Cross | SurfaceTag::CrossT => Ok(Self::Intersection(
                IntersectionFinder::new(surface, position, waypoints, rng),
            )),
            SurfaceTag::Bend => Ok(Self::Bend(BendFinder::new(surface, position, waypoints))),
            SurfaceTag::Other(name) => Err(GuidanceFault::UnrecognizedSurfaceTag(name.clone())),
        }
    }

    pub fn update_target<L: WaypointLookup + ?Sized>(&mut self, position: Vec3, waypoints: &L) {
        match self {
            Self::Lane(finder) => finder.update_target(position, waypoints),
            Self::Intersection(finder) => finder.update_target(position, waypoints),
            Self::Bend(finder) => finder.update_target(position, waypoints),
        }
    }

    pub fn surface(&self) -> Entity {
        match self {
            Self::Lane(finder) => finder.surface,
            Self::Intersection(finder) => finder.surface,
            Self::Bend(finder) => finder.surface,
        }
    }

    /// Advisory top speed for this strategy.
    pub fn max_speed(&self) -> f32 {
        match self {
            Self::Lane(finder) => finder.max_speed,
            Self::Intersection(_) => INTERSECTION_SPEED,
            Self::Bend(_) => BEND_SPEED,
        }
    }

    pub fn target_ref(&self) -> Result<WaypointRef, GuidanceFault> {
        match self {
            Self::Lane(finder) => finder.target_ref(),
            Self::Intersection(finder) => finder.target_ref(),
            Self::Bend(finder) => finder.target_ref(),
        }
    }

    /// Current target position.
    pub fn target<L: WaypointLookup + ?Sized>(&self, waypoints: &L) -> Result<Vec3, GuidanceFault> {
        let target = self.target_ref()?;
        waypoints
            .waypoint(self.surface(), target.group, target.index)
            .ok_or(GuidanceFault::MissingGuidance)
    }
}

/// Straight lane: head for the farther end marker.
#[derive(Clone, Debug, PartialEq)]
pub struct LaneFinder {
    surface: Entity,
    target: Option<usize>,
    max_speed: f32,
}

impl LaneFinder {
    pub fn new<L: WaypointLookup + ?Sized>(surface: Entity, position: Vec3, waypoints: &L) -> Self {
        Self {
            surface,
            target: farthest(position, waypoints.group(surface, LANE_MARKERS)),
            max_speed: LANE_CRUISE_SPEED,
        }
    }

    /// Drops to the approach speed near the target. Never reverts.
    pub fn update_target<L: WaypointLookup + ?Sized>(&mut self, position: Vec3, waypoints: &L) {
        let Some(index) = self.target else {
            return;
        };
        let Some(target) = waypoints.waypoint(self.surface, LANE_MARKERS, index) else {
            return;
        };
        if position.distance(target) < LANE_APPROACH_DISTANCE {
            self.max_speed = LANE_APPROACH_SPEED;
        }
    }

    fn target_ref(&self) -> Result<WaypointRef, GuidanceFault> {
        self.target
            .map(|index| WaypointRef {
                group: LANE_MARKERS,
                index,
            })
            .ok_or(GuidanceFault::EmptyWaypointGroup {
                surface: self.surface,
                group: LANE_MARKERS,
            })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntersectionStage {
    Entrance,
    Turn,
    Exit,
}

/// Cross/CrossT: enter at the nearest entrance, then follow one lane's turn
/// point and exit.
#[derive(Clone, Debug, PartialEq)]
pub struct IntersectionFinder {
    surface: Entity,
    entrance: Option<usize>,
    /// Shared index into the turn and exit groups.
    lane: Option<usize>,
    stage: IntersectionStage,
}

impl IntersectionFinder {
    pub fn new<L, R>(surface: Entity, position: Vec3, waypoints: &L, rng: &mut R) -> Self
    where
        L: WaypointLookup + ?Sized,
        R: Rng + ?Sized,
    {
        let entrances = waypoints.group(surface, ENTRANCES);
        let entrance = nearest(position, entrances);
        let lane = entrance.and_then(|entrance| {
            let others: SmallVec<[usize; 8]> =
                (0..entrances.len()).filter(|&i| i != entrance).collect();
            others.choose(rng).copied()
        });

        Self {
            surface,
            entrance,
            lane,
            stage: IntersectionStage::Entrance,
        }
    }

    pub fn lane(&self) -> Option<usize> {
        self.lane
    }

    pub fn stage(&self) -> IntersectionStage {
        self.stage
    }

    /// Entrance, then turn, then exit; the exit is terminal.
    pub fn update_target<L: WaypointLookup + ?Sized>(&mut self, position: Vec3, waypoints: &L) {
        let Ok(target) = self.target_ref() else {
            return;
        };
        let Some(point) = waypoints.waypoint(self.surface, target.group, target.index) else {
            return;
        };
        if position.distance(point) >= WAYPOINT_REACHED_DISTANCE || self.lane.is_none() {
            return;
        }

        self.stage = match self.stage {
            IntersectionStage::Entrance => IntersectionStage::Turn,
            IntersectionStage::Turn | IntersectionStage::Exit => IntersectionStage::Exit,
        };
    }

    fn target_ref(&self) -> Result<WaypointRef, GuidanceFault> {
        let target = match self.stage {
            IntersectionStage::Entrance => self.entrance.map(|index| (ENTRANCES, index)),
            IntersectionStage::Turn => self.lane.map(|index| (TURNS, index)),
            IntersectionStage::Exit => self.lane.map(|index| (EXITS, index)),
        };
        target
            .map(|(group, index)| WaypointRef { group, index })
            .ok_or(GuidanceFault::EmptyWaypointGroup {
                surface: self.surface,
                group: ENTRANCES,
            })
    }
}

/// Bend: walk one side's chain from the junction the vehicle arrived at.
#[derive(Clone, Debug, PartialEq)]
pub struct BendFinder {
    surface: Entity,
    side: Option<usize>,
    index: usize,
    step: isize,
}

impl BendFinder {
    pub fn new<L: WaypointLookup + ?Sized>(surface: Entity, position: Vec3, waypoints: &L) -> Self {
        // (side, index, step) for each end of both sides.
        let mut junctions: SmallVec<[(usize, usize, isize); 4]> = SmallVec::new();
        let mut points: SmallVec<[Option<Vec3>; 4]> = SmallVec::new();
        for side in 0..2 {
            let chain = waypoints.group(surface, side);
            let last = chain.len().saturating_sub(1);
            junctions.push((side, 0, 1));
            points.push(chain.first().copied().flatten());
            junctions.push((side, last, -1));
            points.push(chain.last().copied().flatten());
        }

        // The closest end belongs to the opposite direction of travel.
        if let Some(wrong_side) = nearest(position, &points) {
            points[wrong_side] = None;
        }

        match nearest(position, &points).map(|chosen| junctions[chosen]) {
            Some((side, index, step)) => Self {
                surface,
                side: Some(side),
                index,
                step,
            },
            None => Self {
                surface,
                side: None,
                index: 0,
                step: 1,
            },
        }
    }

    pub fn side(&self) -> Option<usize> {
        self.side
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn step(&self) -> isize {
        self.step
    }

    /// Advance along the chain; the target freezes at either end.
    pub fn update_target<L: WaypointLookup + ?Sized>(&mut self, position: Vec3, waypoints: &L) {
        let Some(side) = self.side else {
            return;
        };
        let chain = waypoints.group(self.surface, side);
        let Some(point) = chain.get(self.index).copied().flatten() else {
            return;
        };
        if position.distance(point) >= WAYPOINT_REACHED_DISTANCE {
            return;
        }

        let next = self.index as isize + self.step;
        if next >= 0 && (next as usize) < chain.len() {
            self.index = next as usize;
        }
    }

    fn target_ref(&self) -> Result<WaypointRef, GuidanceFault> {
        self.side
            .map(|group| WaypointRef {
                group,
                index: self.index,
            })
            .ok_or(GuidanceFault::EmptyWaypointGroup {
                surface: self.surface,
                group: 0,
            })
    }
}
