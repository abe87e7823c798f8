//! # Plume - CO2 emission plumes over a rotating globe
//!
//! A particle simulation in which every company's yearly CO2 emissions rise
//! from the surface of a slowly spinning earth as a plume of particles.
//!
//! Plume owns the simulation state and exposes it as plain arrays each frame,
//! so any renderer can draw it. No window or GPU code lives here.
//!
//! ## Quick Start
//!
//! ```ignore
//! use plume::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut system = ParticleSystem::new(SimConfig::default())?;
//!
//!     let dataset = EmissionsDataset::load("companies.json", 2022)?;
//!     system.set_total_emissions(dataset.total_emissions());
//!     system.set_active_entities(dataset.entities().to_vec());
//!
//!     loop {
//!         let frame = system.step(1.0 / 60.0);
//!         let bytes = system.field().vertex_bytes(system.config().particle_size);
//!         // upload `bytes` and draw `system.field().len()` points
//!     }
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Particles
//!
//! One particle stands for [`SimConfig::tons_per_particle`] tons of CO2. The
//! particle field is sized for the year's total emissions, and each entity
//! owns a contiguous run of slots proportional to its own emissions.
//!
//! A slot moves through these states:
//!
//! | State | Meaning |
//! |-------|---------|
//! | [`SlotState::Vacant`] | No entity owns the slot; not drawn |
//! | [`SlotState::Pending`] | Seeded at the surface, waiting for activation |
//! | [`SlotState::Active`] | Visible and moving |
//! | [`SlotState::Expired`] | Reached a finite `max_age`; hidden until reseeded |
//!
//! ### Frames
//!
//! Each [`ParticleSystem::step`] advances the rotation, activates pending
//! particles at `particles_per_second * speed_multiplier` (fractions carry
//! over between frames), then moves every active particle: a random walk,
//! Brownian jitter, damping, a pull toward its cruise height, and the
//! atmosphere's rotation. Particles
//! always stay between the earth's surface and the outer atmosphere shell.
//!
//! ### Placement and color
//!
//! Entities are placed on a golden-angle spiral the first time they are seen
//! and never move afterwards. Their color is derived from a hash of the entity
//! id, so it is the same on every run.
//!
//! ## Modules
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`config`] | [`SimConfig`] with validation and JSON save/load |
//! | [`dataset`] | Company records resolved to [`EmissionsDataset`] per year |
//! | [`system`] | [`ParticleSystem`], the frame loop and regeneration |
//! | [`field`] | [`ParticleField`] storage and [`ParticleVertex`] export |
//! | [`scheduler`] | Rate-limited activation |
//! | [`physics`] | Per-particle motion |
//! | [`placement`] | Golden-spiral placement and spawn jitter |
//! | [`rotation`] | [`RotationModel`] for planet and atmosphere |
//! | [`color`] | Palette families and entity color hashing |
//! | [`reveal`] | Paced reveal of a year's entities |
//! | [`clock`] | [`SimClock`] simulated time |

pub mod clock;
pub mod color;
pub mod config;
pub mod dataset;
pub mod error;
pub mod field;
pub mod physics;
pub mod placement;
pub mod reveal;
pub mod rotation;
pub mod scheduler;
pub mod system;

pub use bytemuck;
pub use clock::SimClock;
pub use color::{color_for, PaletteFamily, ParticleColors};
pub use config::SimConfig;
pub use dataset::{EmissionsDataset, EntityRecord};
pub use error::{ConfigError, DatasetError};
pub use field::{ParticleField, ParticleVertex, SlotState};
pub use glam::Vec3;
pub use placement::{Placement, PlacementCache};
pub use reveal::{RevealEvent, RevealMode, RevealSequence};
pub use rotation::RotationModel;
pub use system::{FrameResult, ParticleSystem};

/// Convenient re-exports for common usage.
///
/// # Usage
///
/// ```ignore
/// use plume::prelude::*;
/// ```
///
/// This imports:
/// - [`ParticleSystem`] and [`SimConfig`] - the simulation and its settings
/// - [`EmissionsDataset`] and [`EntityRecord`] - the data that drives it
/// - [`RevealSequence`] and [`RevealEvent`] - paced entity reveal
/// - [`ParticleField`], [`SlotState`], [`ParticleVertex`] - frame output
/// - [`Vec3`] - glam vector type
pub mod prelude {
    pub use crate::clock::SimClock;
    pub use crate::config::SimConfig;
    pub use crate::dataset::{EmissionsDataset, EntityRecord};
    pub use crate::error::{ConfigError, DatasetError};
    pub use crate::field::{ParticleField, ParticleVertex, SlotState};
    pub use crate::reveal::{RevealEvent, RevealMode, RevealSequence};
    pub use crate::rotation::RotationModel;
    pub use crate::system::{FrameResult, ParticleSystem};
    pub use crate::Vec3;
}
