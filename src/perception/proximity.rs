//! Trigger-volume membership.

use bevy::prelude::*;
use smallvec::SmallVec;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SensorKind {
    Forward,
    Lateral,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProximityPhase {
    Enter,
    Exit,
}

/// Another entity entered or left one of a vehicle's sensor volumes.
#[derive(Event, Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProximityEvent {
    /// Vehicle owning the sensor.
    pub observer: Entity,
    pub sensor: SensorKind,
    pub other: Entity,
    pub phase: ProximityPhase,
}

/// Entities currently inside a sensor volume, each at most once.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProximitySet {
    members: SmallVec<[Entity; 8]>,
}

impl ProximitySet {
    /// Returns false if `entity` was already a member.
    pub fn insert(&mut self, entity: Entity) -> bool {
        if self.contains(entity) {
            return false;
        }
        self.members.push(entity);
        true
    }

    pub fn remove(&mut self, entity: Entity) -> bool {
        let Some(index) = self.members.iter().position(|&member| member == entity) else {
            return false;
        };
        self.members.remove(index);
        true
    }

    pub fn apply(&mut self, phase: ProximityPhase, entity: Entity) -> bool {
        match phase {
            ProximityPhase::Enter => self.insert(entity),
            ProximityPhase::Exit => self.remove(entity),
        }
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.members.contains(&entity)
    }

    /// Drop members for which `keep` is false, e.g. despawned cars.
    pub fn retain(&mut self, mut keep: impl FnMut(Entity) -> bool) {
        self.members.retain(|member| keep(*member));
    }

    pub fn clear(&mut self) {
        self.members.clear();
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members in the order they entered.
    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.members.iter().copied()
    }
}
