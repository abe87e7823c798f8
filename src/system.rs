//! The particle system: owner of all simulation state.
//!
//! [`ParticleSystem`] ties the pieces together. The code that owns the render
//! loop calls [`ParticleSystem::step`] once per frame; everything else (new
//! entities, a new year's total, config changes) is pushed in between frames.
//!
//! # Frame order
//!
//! 1. Advance the clock and the rotation model
//! 2. Activate pending particles within the budget carried across frames
//! 3. Advance every active particle
//! 4. Report the active count if it changed
//!
//! # Regeneration
//!
//! Changing the entity set or the total emissions rebuilds the particle field.
//! The new field is fully built (active particles carried forward, then new and
//! pending particles seeded) before it replaces the old one.

use crate::clock::SimClock;
use crate::color::color_for;
use crate::config::SimConfig;
use crate::dataset::EntityRecord;
use crate::error::ConfigError;
use crate::field::{allocate, ParticleField, SlotState};
use crate::physics::{step_field, PhysicsReport};
use crate::placement::{cruise_height, spawn_point, Placement, PlacementCache};
use crate::rotation::RotationModel;
use crate::scheduler::{activate, ActivationPacer};
use glam::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::ops::Range;
use std::sync::Arc;

/// Scale of the random velocity given to a freshly seeded particle.
pub const SEED_VELOCITY: f32 = 0.0002;

/// Callback invoked with the new active particle count.
pub type CountCallback = Box<dyn FnMut(usize) + Send>;

/// What happened during one [`ParticleSystem::step`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameResult {
    /// Simulated time after the step, in seconds.
    pub now: f64,
    /// Seconds simulated by the step.
    pub delta: f32,
    /// Planet rotation angle.
    pub planet_angle: f32,
    /// Atmosphere rotation angle.
    pub atmosphere_angle: f32,
    /// Particles activated this frame.
    pub activated: usize,
    /// Active particles after the step.
    pub active_count: usize,
    /// Particles still waiting for activation.
    pub pending_count: usize,
    /// Particles that expired this frame.
    pub expired: usize,
    /// Particles reset to their anchor after numerical corruption.
    pub recovered: usize,
}

/// CO2 particle plumes over a rotating globe.
pub struct ParticleSystem {
    config: SimConfig,
    clock: SimClock,
    rotation: RotationModel,
    field: ParticleField,
    placements: PlacementCache,
    entities: Vec<EntityRecord>,
    total_emissions: f64,
    rng: SmallRng,
    pacer: ActivationPacer,
    on_count_change: Option<CountCallback>,
    reported_count: usize,
}

impl ParticleSystem {
    /// Create a system with an unseeded random source.
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        Self::with_rng(config, SmallRng::from_entropy())
    }

    /// Create a system whose randomness is reproducible from `seed`.
    pub fn with_seed(config: SimConfig, seed: u64) -> Result<Self, ConfigError> {
        Self::with_rng(config, SmallRng::seed_from_u64(seed))
    }

    fn with_rng(config: SimConfig, rng: SmallRng) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            clock: SimClock::new(),
            rotation: RotationModel::new(),
            field: ParticleField::empty(),
            placements: PlacementCache::new(),
            entities: Vec::new(),
            total_emissions: 0.0,
            rng,
            pacer: ActivationPacer::new(),
            on_count_change: None,
            reported_count: 0,
        })
    }

    /// Use a custom rotation model (e.g. a faster spin).
    pub fn with_rotation(mut self, rotation: RotationModel) -> Self {
        self.rotation = rotation;
        self
    }

    /// Register a callback for active count changes.
    ///
    /// Called whenever the number of active particles differs from the last
    /// reported value, after a step or after the field is rebuilt. For
    /// display only.
    pub fn on_active_count_change<F>(&mut self, callback: F)
    where
        F: FnMut(usize) + Send + 'static,
    {
        self.on_count_change = Some(Box::new(callback));
    }

    // =========================================================================
    // CONFIGURATION
    // =========================================================================

    /// Current configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Replace the configuration. Takes effect on the next step.
    ///
    /// The field is not rebuilt; `tons_per_particle` and `earth_radius`
    /// changes apply at the next regeneration.
    pub fn set_config(&mut self, config: SimConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Change the global speed multiplier. Zero freezes the scene.
    pub fn set_speed_multiplier(&mut self, speed: f32) -> Result<(), ConfigError> {
        if !speed.is_finite() || speed < 0.0 {
            return Err(ConfigError::InvalidSpeedMultiplier(speed));
        }
        self.config.speed_multiplier = speed;
        Ok(())
    }

    // =========================================================================
    // ENTITIES
    // =========================================================================

    /// Size the field for `total_tons` of emissions and regenerate.
    pub fn set_total_emissions(&mut self, total_tons: f64) {
        self.total_emissions = total_tons.max(0.0);
        self.regenerate();
    }

    /// Replace the active entity list and regenerate.
    ///
    /// New entities are placed on the globe; known entities keep their place.
    pub fn set_active_entities(&mut self, entities: Vec<EntityRecord>) {
        self.entities = entities;
        self.assign_placements();
        self.regenerate();
    }

    /// Append one entity to the active list and regenerate.
    pub fn push_entity(&mut self, entity: EntityRecord) {
        self.entities.push(entity);
        self.assign_placements();
        self.regenerate();
    }

    /// Drop every entity and particle.
    ///
    /// Placements, time and rotation are kept, so an entity that comes back
    /// later rises from the same spot.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.total_emissions = 0.0;
        self.field = ParticleField::empty();
        self.pacer.reset();
        self.report_count();
    }

    fn assign_placements(&mut self) {
        let ids: Vec<&Arc<str>> = self.entities.iter().map(|e| &e.id).collect();
        let added = self.placements.assign(ids);
        if added > 0 {
            log::debug!("placed {added} new entities ({} total)", self.placements.len());
        }
    }

    /// Slot range owned by each active entity, in entity order.
    ///
    /// Ranges are contiguous and never overlap; they may extend past the end
    /// of the field when the total is smaller than the sum of its parts.
    pub fn slot_ranges(&self) -> Vec<Range<usize>> {
        let mut start = 0;
        self.entities
            .iter()
            .map(|entity| {
                let count = self.config.particles_for(entity.emissions_tons);
                let range = start..start + count;
                start += count;
                range
            })
            .collect()
    }

    /// Rebuild the field, carrying active particles forward.
    fn regenerate(&mut self) {
        let now = self.clock.elapsed();
        let mut next = allocate(self.total_emissions, &self.config, &mut self.rng);
        let carried = next.carry_forward(&self.field);
        let ranges = self.slot_ranges();
        let mut seeded = 0;

        for (entity_index, (entity, range)) in self.entities.iter().zip(ranges).enumerate() {
            let Some(placement) = self.placements.get(&entity.id) else {
                log::warn!("no placement for active entity {}, skipping its particles", entity.id);
                continue;
            };

            let end = range.end.min(next.len());
            if end < range.end {
                log::warn!(
                    "{} needs slots {}..{} but the field only has {}",
                    entity.id,
                    range.start,
                    range.end,
                    next.len()
                );
            }

            let seed = Seed {
                owner: &entity.id,
                placement,
                color: color_for(&entity.id),
                height: cruise_height(
                    self.config.base_height,
                    entity_index,
                    now,
                    self.config.height_variation,
                ),
                now,
            };

            for index in range.start..end {
                if next.states[index] == SlotState::Active {
                    continue;
                }
                seed_slot(&mut next, index, &seed, &self.config, &mut self.rng);
                seeded += 1;
            }
        }

        log::debug!(
            "regenerated field: {} slots, {carried} carried, {seeded} seeded, {} entities",
            next.len(),
            self.entities.len()
        );
        self.field = next;
        self.report_count();
    }

    // =========================================================================
    // FRAME
    // =========================================================================

    /// Advance the simulation by `delta` seconds.
    ///
    /// A paused system only counts the frame.
    pub fn step(&mut self, delta: f32) -> FrameResult {
        if self.clock.is_paused() {
            self.clock.advance(delta);
            self.report_count();
            return self.frame_result(0, PhysicsReport::default());
        }

        let (now, delta) = self.clock.advance(delta);
        self.rotation.advance(delta);

        let budget = self.pacer.budget(&self.config, delta);
        let activated = activate(&mut self.field, budget, now);
        self.pacer.consume(activated);
        let physics = step_field(&mut self.field, &self.config, &self.rotation, now, &mut self.rng);

        let result = self.frame_result(activated, physics);
        log::trace!(
            "frame {}: +{} active ({} total), {} expired, {} recovered",
            self.clock.frame(),
            result.activated,
            result.active_count,
            result.expired,
            result.recovered
        );
        self.report_count();
        result
    }

    fn frame_result(&self, activated: usize, physics: PhysicsReport) -> FrameResult {
        FrameResult {
            now: self.clock.elapsed(),
            delta: self.clock.delta(),
            planet_angle: self.rotation.planet_angle(),
            atmosphere_angle: self.rotation.atmosphere_angle(),
            activated,
            active_count: self.field.active_count(),
            pending_count: self.field.count(SlotState::Pending),
            expired: physics.expired,
            recovered: physics.recovered,
        }
    }

    fn report_count(&mut self) {
        let count = self.field.active_count();
        if count == self.reported_count {
            return;
        }
        self.reported_count = count;
        if let Some(callback) = self.on_count_change.as_mut() {
            callback(count);
        }
    }

    /// Stop advancing time. Steps still count frames.
    pub fn pause(&mut self) {
        self.clock.pause();
    }

    /// Resume advancing time.
    pub fn resume(&mut self) {
        self.clock.resume();
    }

    /// Whether the system is paused.
    pub fn is_paused(&self) -> bool {
        self.clock.is_paused()
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// Particle storage.
    pub fn field(&self) -> &ParticleField {
        &self.field
    }

    /// Mutable particle storage, for injecting state between frames.
    pub fn field_mut(&mut self) -> &mut ParticleField {
        &mut self.field
    }

    /// Entity placements assigned so far.
    pub fn placements(&self) -> &PlacementCache {
        &self.placements
    }

    /// Rotation state.
    pub fn rotation(&self) -> &RotationModel {
        &self.rotation
    }

    /// Simulated time.
    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// Active entities in reveal order.
    pub fn entities(&self) -> &[EntityRecord] {
        &self.entities
    }

    /// Emissions the field is sized for.
    pub fn total_emissions(&self) -> f64 {
        self.total_emissions
    }

    /// Sum of the active entities' emissions.
    pub fn active_emissions(&self) -> f64 {
        self.entities.iter().map(|e| e.emissions_tons).sum()
    }

    /// Number of active particles.
    pub fn active_count(&self) -> usize {
        self.field.active_count()
    }
}

/// Per-entity values shared by all particles seeded in one regeneration.
struct Seed<'a> {
    owner: &'a Arc<str>,
    placement: Placement,
    color: Vec3,
    height: f32,
    now: f64,
}

fn seed_slot<R: Rng>(
    field: &mut ParticleField,
    index: usize,
    seed: &Seed<'_>,
    config: &SimConfig,
    rng: &mut R,
) {
    let emission_point = spawn_point(seed.placement, config.earth_radius, rng);
    let velocity_scale = SEED_VELOCITY * config.particle_speed;

    field.states[index] = SlotState::Pending;
    field.positions[index] = emission_point;
    field.emission_points[index] = emission_point;
    field.velocities[index] = Vec3::new(
        (rng.gen::<f32>() - 0.5) * velocity_scale,
        (rng.gen::<f32>() - 0.5) * velocity_scale,
        (rng.gen::<f32>() - 0.5) * velocity_scale,
    );
    field.colors[index] = seed.color;
    field.opacities[index] = 0.0;
    field.ages[index] = 0.0;
    field.heights[index] = seed.height;
    field.initial_heights[index] = seed.height;
    field.start_times[index] = seed.now;
    field.owners[index] = Some(seed.owner.clone());
}
