//! Particle storage.
//!
//! A [`ParticleField`] is a struct-of-arrays: every per-particle attribute
//! lives in its own `Vec`, and a particle's identity is its slot index. The
//! field is owned by the [`ParticleSystem`](crate::ParticleSystem) and borrowed
//! mutably by each pass of a frame (activation, then physics), so there is
//! never more than one writer.
//!
//! # Slot states
//!
//! | State | Meaning |
//! |-------|---------|
//! | `Vacant` | No entity owns the slot yet |
//! | `Pending` | Seeded at its anchor, invisible, waiting for activation |
//! | `Active` | Visible and advancing every frame |
//! | `Expired` | Outlived `max_age`; invisible, re-seeded on the next regeneration |
//!
//! # Regeneration
//!
//! When the entity set or the total emissions change, a new field is allocated
//! and [`ParticleField::carry_forward`] copies every active particle's state
//! into it at the same index before it replaces the old one. In-flight
//! particles never jump.

use crate::config::SimConfig;
use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use rand::Rng;
use std::sync::Arc;

/// Lifecycle state of one particle slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SlotState {
    /// Not owned by any entity.
    #[default]
    Vacant,
    /// Seeded, waiting for the scheduler.
    Pending,
    /// Visible and simulated.
    Active,
    /// Past its lifetime.
    Expired,
}

/// Opacity given to a particle when it is activated.
pub const FRESH_OPACITY: f32 = 0.8;

/// Scale of the random velocity every slot starts with.
pub const BASE_VELOCITY: f32 = 0.01;

/// Per-particle attributes stored as parallel arrays.
#[derive(Debug, Clone, Default)]
pub struct ParticleField {
    pub(crate) states: Vec<SlotState>,
    pub(crate) positions: Vec<Vec3>,
    pub(crate) velocities: Vec<Vec3>,
    pub(crate) colors: Vec<Vec3>,
    pub(crate) opacities: Vec<f32>,
    pub(crate) ages: Vec<f32>,
    pub(crate) heights: Vec<f32>,
    pub(crate) initial_heights: Vec<f32>,
    pub(crate) start_times: Vec<f64>,
    pub(crate) emission_points: Vec<Vec3>,
    pub(crate) owners: Vec<Option<Arc<str>>>,
}

/// Allocate a field large enough for `total_tons` of emissions.
///
/// The field holds `ceil(total_tons / tons_per_particle)` vacant slots at the
/// origin, white, with `earth_radius` heights and a small random velocity
/// scaled by `particle_speed`. Zero or negative emissions give an empty field.
pub fn allocate<R: Rng>(total_tons: f64, config: &SimConfig, rng: &mut R) -> ParticleField {
    let count = config.particles_for(total_tons);
    let base_velocity = BASE_VELOCITY * config.particle_speed;

    let velocities = (0..count)
        .map(|_| {
            Vec3::new(
                (rng.gen::<f32>() - 0.5) * base_velocity,
                (rng.gen::<f32>() - 0.5) * base_velocity,
                (rng.gen::<f32>() - 0.5) * base_velocity,
            )
        })
        .collect();

    ParticleField {
        states: vec![SlotState::Vacant; count],
        positions: vec![Vec3::ZERO; count],
        velocities,
        colors: vec![Vec3::ONE; count],
        opacities: vec![0.0; count],
        ages: vec![0.0; count],
        heights: vec![config.earth_radius; count],
        initial_heights: vec![config.earth_radius; count],
        start_times: vec![0.0; count],
        emission_points: vec![Vec3::ZERO; count],
        owners: vec![None; count],
    }
}

impl ParticleField {
    /// Create an empty field.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether the field has no slots.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// State of slot `index`.
    #[inline]
    pub fn state(&self, index: usize) -> SlotState {
        self.states[index]
    }

    /// All slot states.
    #[inline]
    pub fn states(&self) -> &[SlotState] {
        &self.states
    }

    /// Positions, one per slot.
    #[inline]
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Velocities, one per slot.
    #[inline]
    pub fn velocities(&self) -> &[Vec3] {
        &self.velocities
    }

    /// RGB colors, one per slot.
    #[inline]
    pub fn colors(&self) -> &[Vec3] {
        &self.colors
    }

    /// Opacities, one per slot.
    #[inline]
    pub fn opacities(&self) -> &[f32] {
        &self.opacities
    }

    /// Seconds since activation, updated by the physics pass.
    #[inline]
    pub fn ages(&self) -> &[f32] {
        &self.ages
    }

    /// Cruise heights, one per slot.
    #[inline]
    pub fn heights(&self) -> &[f32] {
        &self.heights
    }

    /// Surface anchors before rotation, one per slot.
    #[inline]
    pub fn emission_points(&self) -> &[Vec3] {
        &self.emission_points
    }

    /// Owning entity id of slot `index`, if any.
    #[inline]
    pub fn owner(&self, index: usize) -> Option<&str> {
        self.owners[index].as_deref()
    }

    /// Overwrite the stored position of slot `index`.
    ///
    /// Meant for renderers and tests that need to inject state; the physics
    /// pass heals non-finite positions on the next step.
    pub fn set_position(&mut self, index: usize, position: Vec3) {
        self.positions[index] = position;
    }

    /// Number of slots in `state`.
    pub fn count(&self, state: SlotState) -> usize {
        self.states.iter().filter(|s| **s == state).count()
    }

    /// Number of active particles.
    pub fn active_count(&self) -> usize {
        self.count(SlotState::Active)
    }

    /// Copy every active particle from `previous` into the same index of `self`.
    ///
    /// The whole particle is copied, not just what's visible: position, color,
    /// opacity and height keep the particle looking the same, and velocity,
    /// anchor and activation time keep it moving the same. Slots past the end
    /// of `self` are dropped. Expired and pending slots are left to be
    /// re-seeded.
    ///
    /// Returns the number of particles carried.
    pub fn carry_forward(&mut self, previous: &ParticleField) -> usize {
        let shared = self.len().min(previous.len());
        let mut carried = 0;

        for i in 0..shared {
            if previous.states[i] != SlotState::Active {
                continue;
            }
            self.states[i] = SlotState::Active;
            self.positions[i] = previous.positions[i];
            self.velocities[i] = previous.velocities[i];
            self.colors[i] = previous.colors[i];
            self.opacities[i] = previous.opacities[i];
            self.ages[i] = previous.ages[i];
            self.heights[i] = previous.heights[i];
            self.initial_heights[i] = previous.initial_heights[i];
            self.start_times[i] = previous.start_times[i];
            self.emission_points[i] = previous.emission_points[i];
            self.owners[i] = previous.owners[i].clone();
            carried += 1;
        }

        carried
    }

    /// Pack every slot into renderer vertices.
    ///
    /// Inactive slots are included with their stored opacity (zero for
    /// pending and expired particles) so vertex indices match slot indices.
    pub fn vertices(&self, particle_size: f32) -> Vec<ParticleVertex> {
        (0..self.len())
            .map(|i| ParticleVertex {
                position: self.positions[i].to_array(),
                opacity: self.opacities[i],
                color: self.colors[i].to_array(),
                size: particle_size,
            })
            .collect()
    }

    /// Vertices as raw bytes, ready for a vertex buffer upload.
    pub fn vertex_bytes(&self, particle_size: f32) -> Vec<u8> {
        bytemuck::cast_slice(&self.vertices(particle_size)).to_vec()
    }
}

/// One particle as seen by a point renderer.
///
/// Layout is 32 bytes, `vec3 position, f32 opacity, vec3 color, f32 size`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ParticleVertex {
    /// World position.
    pub position: [f32; 3],
    /// Alpha, zero for invisible slots.
    pub opacity: f32,
    /// RGB, 0-1.
    pub color: [f32; 3],
    /// Point size.
    pub size: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(7)
    }

    #[test]
    fn test_allocate_count() {
        let config = SimConfig::default();
        let field = allocate(1_000_000.0, &config, &mut rng());
        assert_eq!(field.len(), 20);

        let field = allocate(1_000_001.0, &config, &mut rng());
        assert_eq!(field.len(), 21);
    }

    #[test]
    fn test_allocate_zero_is_empty() {
        let config = SimConfig::default();
        let field = allocate(0.0, &config, &mut rng());
        assert!(field.is_empty());
        assert!(field.vertices(0.01).is_empty());
        assert_eq!(field.active_count(), 0);
    }

    #[test]
    fn test_allocate_initial_values() {
        let config = SimConfig::default().with_particle_speed(2.0);
        let field = allocate(500_000.0, &config, &mut rng());

        for i in 0..field.len() {
            assert_eq!(field.state(i), SlotState::Vacant);
            assert_eq!(field.positions()[i], Vec3::ZERO);
            assert_eq!(field.colors()[i], Vec3::ONE);
            assert_eq!(field.heights()[i], config.earth_radius);
            assert_eq!(field.opacities()[i], 0.0);
            // (u - 0.5) * 0.01 * 2.0 stays within +-0.01
            assert!(field.velocities()[i].abs().max_element() <= 0.01);
        }
    }

    #[test]
    fn test_carry_forward_copies_active_only() {
        let config = SimConfig::default();
        let mut old = allocate(200_000.0, &config, &mut rng());
        old.states[1] = SlotState::Active;
        old.positions[1] = Vec3::new(1.2, 0.3, -0.4);
        old.colors[1] = Vec3::new(0.9, 0.5, 0.1);
        old.opacities[1] = FRESH_OPACITY;
        old.heights[1] = 1.35;
        old.states[2] = SlotState::Pending;
        old.positions[2] = Vec3::X;

        let mut new = allocate(400_000.0, &config, &mut rng());
        let carried = new.carry_forward(&old);

        assert_eq!(carried, 1);
        assert_eq!(new.state(1), SlotState::Active);
        assert_eq!(new.positions()[1], old.positions()[1]);
        assert_eq!(new.colors()[1], old.colors()[1]);
        assert_eq!(new.opacities()[1], old.opacities()[1]);
        assert_eq!(new.heights()[1], old.heights()[1]);
        assert_eq!(new.velocities()[1], old.velocities()[1]);

        assert_eq!(new.state(2), SlotState::Vacant);
        assert_eq!(new.positions()[2], Vec3::ZERO);
    }

    #[test]
    fn test_carry_forward_into_smaller_field() {
        let config = SimConfig::default();
        let mut old = allocate(200_000.0, &config, &mut rng());
        old.states.fill(SlotState::Active);

        let mut new = allocate(100_000.0, &config, &mut rng());
        assert_eq!(new.carry_forward(&old), 2);
        assert_eq!(new.active_count(), 2);
    }

    #[test]
    fn test_vertex_layout() {
        assert_eq!(std::mem::size_of::<ParticleVertex>(), 32);

        let config = SimConfig::default();
        let mut field = allocate(100_000.0, &config, &mut rng());
        field.positions[0] = Vec3::new(1.0, 2.0, 3.0);
        field.opacities[0] = 0.5;

        let bytes = field.vertex_bytes(0.01);
        assert_eq!(bytes.len(), 2 * 32);

        let vertex: ParticleVertex = bytemuck::pod_read_unaligned(&bytes[..32]);
        assert_eq!(vertex.position, [1.0, 2.0, 3.0]);
        assert_eq!(vertex.size, 0.01);

        let vertices = field.vertices(0.01);
        assert_eq!(vertices[0].position, [1.0, 2.0, 3.0]);
        assert_eq!(vertices[0].opacity, 0.5);
        assert_eq!(vertices[1].color, [1.0, 1.0, 1.0]);
    }
}
