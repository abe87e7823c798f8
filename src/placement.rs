//! Where each entity's plume rises from.
//!
//! Entities are spread over the globe on a golden-angle spiral. An entity's
//! spherical coordinate is computed once, the first time it is seen, and then
//! frozen for the rest of the session: adding more entities later never moves
//! an existing plume.
//!
//! Individual particles spawn around their entity's point with a little
//! angular and Cartesian jitter, so a plume has some width.

use glam::Vec3;
use rand::Rng;
use std::collections::HashMap;
use std::f32::consts::TAU;
use std::sync::Arc;

/// The golden ratio, `(1 + √5) / 2`.
pub const GOLDEN_RATIO: f32 = 1.618_034;

/// Angular jitter, in radians, applied to `phi` and `theta` of each spawn.
pub const SPREAD_ANGLE: f32 = 0.2;

/// Cartesian jitter applied to each spawn before normalizing.
pub const POSITION_JITTER: f32 = 0.1;

/// Seconds of offset between neighbouring entities' height oscillations.
pub const HEIGHT_PHASE_STEP: f64 = 0.1;

/// An entity's fixed spherical coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Polar angle from +Z, in `[0, π]`.
    pub phi: f32,
    /// Azimuth.
    pub theta: f32,
}

impl Placement {
    /// Point `index` (1-based) of a golden-angle spiral over `tracked` points.
    pub fn golden_spiral(index: usize, tracked: usize) -> Self {
        let i = index as f32;
        let theta = TAU * i / GOLDEN_RATIO;
        let phi = (1.0 - 2.0 * (i / (tracked + 1) as f32)).clamp(-1.0, 1.0).acos();
        Self { phi, theta }
    }

    /// Cartesian point at `radius`.
    pub fn to_cartesian(&self, radius: f32) -> Vec3 {
        spherical_to_cartesian(self.phi, self.theta, radius)
    }
}

/// Convert spherical `(phi, theta, radius)` to Cartesian, with +Z as the pole.
#[inline]
pub fn spherical_to_cartesian(phi: f32, theta: f32, radius: f32) -> Vec3 {
    Vec3::new(
        radius * phi.sin() * theta.cos(),
        radius * phi.sin() * theta.sin(),
        radius * phi.cos(),
    )
}

/// Session-long cache of entity placements, keyed by entity id.
#[derive(Debug, Clone, Default)]
pub struct PlacementCache {
    placements: HashMap<Arc<str>, Placement>,
}

impl PlacementCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Place every id not seen before.
    ///
    /// Ids are numbered by their position in `ids` (1-based) on a spiral over
    /// `ids.len()` points. Ids that already have a placement keep it.
    ///
    /// Returns the number of new placements.
    pub fn assign<'a, I>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = &'a Arc<str>>,
        I::IntoIter: ExactSizeIterator,
    {
        let ids = ids.into_iter();
        let tracked = ids.len();
        let mut added = 0;

        for (index, id) in ids.enumerate() {
            if self.placements.contains_key(id) {
                continue;
            }
            let placement = Placement::golden_spiral(index + 1, tracked);
            self.placements.insert(id.clone(), placement);
            added += 1;
        }

        added
    }

    /// Placement of `id`, if assigned.
    pub fn get(&self, id: &str) -> Option<Placement> {
        self.placements.get(id).copied()
    }

    /// Whether `id` has a placement.
    pub fn contains(&self, id: &str) -> bool {
        self.placements.contains_key(id)
    }

    /// Number of placed entities.
    pub fn len(&self) -> usize {
        self.placements.len()
    }

    /// Whether nothing has been placed.
    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }
}

/// Jittered emission point around `placement`, on the earth's surface.
///
/// Each particle gets its own point: the entity's spot is perturbed in angle
/// and then in Cartesian space before being projected back onto the surface.
/// The particle starts here and keeps it as its anchor.
pub fn spawn_point<R: Rng>(placement: Placement, earth_radius: f32, rng: &mut R) -> Vec3 {
    let phi = placement.phi + (rng.gen::<f32>() - 0.5) * SPREAD_ANGLE;
    let theta = placement.theta + (rng.gen::<f32>() - 0.5) * SPREAD_ANGLE;
    let surface = spherical_to_cartesian(phi, theta, earth_radius);

    // Jitter is applied to the surface point itself, so the anchor is the
    // jittered direction rather than the entity's exact spiral point.
    let jitter = Vec3::new(
        (rng.gen::<f32>() - 0.5) * POSITION_JITTER,
        (rng.gen::<f32>() - 0.5) * POSITION_JITTER,
        (rng.gen::<f32>() - 0.5) * POSITION_JITTER,
    );
    let direction = (surface + jitter)
        .try_normalize()
        .unwrap_or_else(|| placement.to_cartesian(1.0));

    direction * earth_radius
}

/// Cruise height for a particle of the entity at `entity_index`, spawned at `now`.
///
/// Heights oscillate slowly around `base_height`, and each entity is offset in
/// phase so neighbouring plumes don't rise in lockstep.
pub fn cruise_height(base_height: f32, entity_index: usize, now: f64, variation: f32) -> f32 {
    let phase = entity_index as f64 * HEIGHT_PHASE_STEP;
    let time_factor = (now - phase).max(0.0) as f32;
    base_height + (time_factor * 0.5).sin() * variation
}
