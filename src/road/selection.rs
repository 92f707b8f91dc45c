//! Nearest/farthest waypoint selection.
//!
//! Destroyed waypoints (`None`) are never selected. Comparisons are strict,
//! so on an exact tie the earlier waypoint is kept.

use bevy::prelude::*;

/// Index of the farthest waypoint from `from`.
pub fn farthest(from: Vec3, candidates: &[Option<Vec3>]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (index, point) in candidates.iter().enumerate() {
        let Some(point) = point else {
            continue;
        };
        let distance = from.distance(*point);
        if best.map_or(true, |(_, best_distance)| distance > best_distance) {
            best = Some((index, distance));
        }
    }
    best.map(|(index, _)| index)
}

/// Index of the nearest waypoint to `from`.
pub fn nearest(from: Vec3, candidates: &[Option<Vec3>]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (index, point) in candidates.iter().enumerate() {
        let Some(point) = point else {
            continue;
        };
        let distance = from.distance(*point);
        if best.map_or(true, |(_, best_distance)| distance < best_distance) {
            best = Some((index, distance));
        }
    }
    best.map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn farthest_skips_destroyed_and_keeps_first_on_tie() {
        let candidates = [
            None,
            Some(Vec3::new(0.0, 0.0, 10.0)),
            Some(Vec3::new(0.0, 0.0, -10.0)),
            Some(Vec3::new(0.0, 0.0, 3.0)),
        ];
        assert_eq!(farthest(Vec3::ZERO, &candidates), Some(1));
    }

    #[test]
    fn nearest_skips_destroyed_and_keeps_first_on_tie() {
        let candidates = [
            Some(Vec3::new(8.0, 0.0, 0.0)),
            None,
            Some(Vec3::new(2.0, 0.0, 0.0)),
            Some(Vec3::new(-2.0, 0.0, 0.0)),
        ];
        assert_eq!(nearest(Vec3::ZERO, &candidates), Some(2));
    }

    #[test]
    fn all_destroyed_selects_nothing() {
        assert_eq!(farthest(Vec3::ZERO, &[None, None]), None);
        assert_eq!(nearest(Vec3::ZERO, &[None]), None);
        assert_eq!(nearest(Vec3::ZERO, &[]), None);
    }
}
