//! Simulation configuration.
//!
//! [`SimConfig`] holds every scalar knob the simulation reads. The particle
//! system re-reads it on every frame, so changes made through
//! [`ParticleSystem::set_config`](crate::ParticleSystem::set_config) take
//! effect on the next step. Structural knobs (`tons_per_particle`,
//! `earth_radius`) only reshape the field on the next regeneration.
//!
//! # Example
//!
//! ```ignore
//! let config = SimConfig::default()
//!     .with_dispersion_rate(0.05)
//!     .with_particles_per_second(8000.0)
//!     .with_max_age(Some(90.0));
//! config.validate()?;
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_one() -> f32 {
    1.0
}

/// Complete simulation configuration.
///
/// Lengths are in earth radii, times in seconds.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SimConfig {
    /// Radius of the globe surface. Particles never sink below it.
    pub earth_radius: f32,
    /// Inner edge of the atmosphere shell.
    pub min_atmosphere_radius: f32,
    /// Outer edge of the atmosphere shell. Particles never rise past it.
    pub max_atmosphere_radius: f32,
    /// How strongly particles are pulled toward their cruise radius each frame.
    pub dispersion_rate: f32,
    /// Activation rate of pending particles.
    pub particles_per_second: f32,
    /// Tons of CO2 represented by one particle.
    pub tons_per_particle: f64,
    /// Lifetime in seconds; `None` keeps particles alive forever.
    #[serde(default)]
    pub max_age: Option<f32>,
    /// Rendered point size, passed through to vertices.
    pub particle_size: f32,
    /// Amplitude of the time-varying cruise height.
    pub height_variation: f32,
    /// Cruise radius around which heights vary.
    pub base_height: f32,
    /// Multiplier applied to the cruise radius.
    #[serde(default = "default_one")]
    pub rise_speed: f32,
    /// Scales every force on a particle.
    #[serde(default = "default_one")]
    pub particle_speed: f32,
    /// Global animation speed. Zero freezes activation and motion.
    #[serde(default = "default_one")]
    pub speed_multiplier: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            earth_radius: 1.0,
            min_atmosphere_radius: 1.01,
            max_atmosphere_radius: 2.0,
            dispersion_rate: 0.02,
            particles_per_second: 5000.0,
            tons_per_particle: 50_000.0,
            max_age: None,
            particle_size: 0.01,
            height_variation: 0.3,
            base_height: 1.2,
            rise_speed: 1.0,
            particle_speed: 1.0,
            speed_multiplier: 1.0,
        }
    }
}

impl SimConfig {
    /// Set the globe radius.
    pub fn with_earth_radius(mut self, radius: f32) -> Self {
        self.earth_radius = radius;
        self
    }

    /// Set the inner and outer atmosphere radii.
    pub fn with_atmosphere(mut self, min: f32, max: f32) -> Self {
        self.min_atmosphere_radius = min;
        self.max_atmosphere_radius = max;
        self
    }

    /// Set the pull toward the cruise radius.
    pub fn with_dispersion_rate(mut self, rate: f32) -> Self {
        self.dispersion_rate = rate;
        self
    }

    /// Set the activation rate.
    pub fn with_particles_per_second(mut self, rate: f32) -> Self {
        self.particles_per_second = rate;
        self
    }

    /// Set how many tons one particle stands for.
    pub fn with_tons_per_particle(mut self, tons: f64) -> Self {
        self.tons_per_particle = tons;
        self
    }

    /// Set the particle lifetime. `None` disables expiry.
    pub fn with_max_age(mut self, seconds: Option<f32>) -> Self {
        self.max_age = seconds;
        self
    }

    /// Set the cruise height parameters.
    pub fn with_height(mut self, base_height: f32, variation: f32) -> Self {
        self.base_height = base_height;
        self.height_variation = variation;
        self
    }

    /// Set the rise speed multiplier.
    pub fn with_rise_speed(mut self, rise_speed: f32) -> Self {
        self.rise_speed = rise_speed;
        self
    }

    /// Set the particle speed multiplier.
    pub fn with_particle_speed(mut self, speed: f32) -> Self {
        self.particle_speed = speed;
        self
    }

    /// Set the global speed multiplier.
    pub fn with_speed_multiplier(mut self, speed: f32) -> Self {
        self.speed_multiplier = speed;
        self
    }

    /// Particle speed combined with the global speed multiplier.
    ///
    /// Every force in the physics step scales with this value.
    #[inline]
    pub fn effective_speed(&self) -> f32 {
        self.particle_speed * self.speed_multiplier
    }

    /// Number of particles needed to represent `tons` of emissions.
    pub fn particles_for(&self, tons: f64) -> usize {
        if tons <= 0.0 {
            return 0;
        }
        (tons / self.tons_per_particle).ceil() as usize
    }

    /// Check that every knob is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("earth_radius", self.earth_radius as f64),
            ("min_atmosphere_radius", self.min_atmosphere_radius as f64),
            ("max_atmosphere_radius", self.max_atmosphere_radius as f64),
            ("dispersion_rate", self.dispersion_rate as f64),
            ("particles_per_second", self.particles_per_second as f64),
            ("tons_per_particle", self.tons_per_particle),
            ("particle_size", self.particle_size as f64),
            ("height_variation", self.height_variation as f64),
            ("base_height", self.base_height as f64),
            ("rise_speed", self.rise_speed as f64),
            ("particle_speed", self.particle_speed as f64),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NotPositive { name, value });
            }
        }

        if let Some(age) = self.max_age {
            // Infinity is accepted and means the same as `None`.
            if age.is_nan() || age <= 0.0 {
                return Err(ConfigError::NotPositive {
                    name: "max_age",
                    value: age as f64,
                });
            }
        }

        if !self.speed_multiplier.is_finite() || self.speed_multiplier < 0.0 {
            return Err(ConfigError::InvalidSpeedMultiplier(self.speed_multiplier));
        }

        if self.min_atmosphere_radius < self.earth_radius
            || self.max_atmosphere_radius <= self.min_atmosphere_radius
        {
            return Err(ConfigError::InvalidShell {
                earth: self.earth_radius,
                min: self.min_atmosphere_radius,
                max: self.max_atmosphere_radius,
            });
        }

        Ok(())
    }

    /// Finite lifetime in seconds, if expiry is enabled.
    pub fn finite_max_age(&self) -> Option<f32> {
        self.max_age.filter(|age| age.is_finite())
    }

    /// Save the configuration to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load and validate a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }
}
