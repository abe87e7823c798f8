//! Rate-limited particle activation.
//!
//! A large emissions volume is seeded all at once, but shown as a stream: the
//! scheduler reveals `particles_per_second * delta * speed_multiplier` pending
//! particles per frame, in slot order. Fractions of a particle carry over to
//! the next frame, so low rates and short frames still make progress.

use crate::config::SimConfig;
use crate::field::{ParticleField, SlotState, FRESH_OPACITY};

/// Particles per frame of `delta` seconds, before rounding.
///
/// Non-finite and negative rates count as zero.
pub fn activation_rate(config: &SimConfig, delta: f32) -> f32 {
    let rate = config.particles_per_second * delta * config.speed_multiplier;
    if rate.is_finite() && rate > 0.0 {
        rate
    } else {
        0.0
    }
}

/// Accumulates activation budget across frames.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ActivationPacer {
    carry: f32,
}

impl ActivationPacer {
    /// Create a pacer with nothing carried.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add this frame's rate and return the whole particles available.
    pub fn budget(&mut self, config: &SimConfig, delta: f32) -> usize {
        self.carry += activation_rate(config, delta);
        if self.carry.is_finite() && self.carry >= 1.0 {
            self.carry.floor() as usize
        } else {
            0
        }
    }

    /// Spend `activated` particles of the budget.
    ///
    /// Whole particles left over mean there was nothing left to activate;
    /// they are dropped so a later batch of pending slots doesn't appear in
    /// one burst.
    pub fn consume(&mut self, activated: usize) {
        let left = (self.carry - activated as f32).max(0.0);
        self.carry = if left >= 1.0 { left.fract() } else { left };
    }

    /// Fraction of a particle carried into the next frame.
    pub fn carry(&self) -> f32 {
        self.carry
    }

    /// Forget any carried budget.
    pub fn reset(&mut self) {
        self.carry = 0.0;
    }
}

/// Activate up to `budget` pending particles, lowest slot first.
///
/// Each activated particle is stamped with `now` as its start time and given
/// [`FRESH_OPACITY`]. Particles that are already active are never touched.
///
/// Returns the number activated.
pub fn activate(field: &mut ParticleField, budget: usize, now: f64) -> usize {
    if budget == 0 {
        return 0;
    }

    let mut activated = 0;
    for i in 0..field.len() {
        if field.states[i] != SlotState::Pending {
            continue;
        }
        field.states[i] = SlotState::Active;
        field.start_times[i] = now;
        field.ages[i] = 0.0;
        field.opacities[i] = FRESH_OPACITY;

        activated += 1;
        if activated == budget {
            break;
        }
    }

    activated
}
