//! Per-frame particle physics.
//!
//! Each active particle drifts under five terms, all scaled by the effective
//! particle speed (`particle_speed * speed_multiplier`):
//!
//! | Term | Effect |
//! |------|--------|
//! | Random walk | Jitter that calms down as the particle ages |
//! | Brownian | Smaller, age-independent jitter |
//! | Damping | Velocity decay, stronger the farther the particle is from its cruise radius |
//! | Expansion | Slight outward push along the radial direction |
//! | Radial correction | Pull toward the cruise radius, scaled by the dispersion rate |
//!
//! The result is clamped to the atmosphere shell, then carried along with the
//! globe's spin by a rotation blended between the planet and atmosphere angles.
//!
//! Corrupted particles (non-finite position) heal themselves: they are put
//! back on their anchor instead of spreading NaN through the field.

use crate::config::SimConfig;
use crate::field::{ParticleField, SlotState};
use crate::rotation::{rotate, RotationModel};
use glam::Vec3;
use rand::Rng;

/// Random-walk strength per unit speed².
pub const RANDOM_WALK_SCALE: f32 = 0.005;

/// Brownian strength per unit speed².
pub const BROWNIAN_SCALE: f32 = 0.002;

/// Velocity retained per frame at the cruise radius.
pub const BASE_DAMPING: f32 = 0.98;

/// Extra damping per unit of distance from the cruise radius.
pub const DISTANCE_DAMPING: f32 = 0.005;

/// Outward push per unit speed.
pub const EXPANSION_FORCE: f32 = 0.0005;

/// Per-frame cruise radius jitter per unit speed.
pub const TARGET_JITTER: f32 = 0.1;

/// What one physics pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhysicsReport {
    /// Particles advanced this frame.
    pub advanced: usize,
    /// Particles that reached `max_age` this frame.
    pub expired: usize,
    /// Particles reset to their anchor after numerical corruption.
    pub recovered: usize,
}

/// Fraction of its lifetime a particle has lived.
///
/// Always zero when the lifetime is unbounded.
#[inline]
pub fn age_ratio(age: f32, max_age: Option<f32>) -> f32 {
    match max_age {
        Some(max) if max.is_finite() && max > 0.0 => (age / max).clamp(0.0, 1.0),
        _ => 0.0,
    }
}

/// How far a particle has risen toward its initial cruise height, in `[0, 1]`.
#[inline]
pub fn height_ratio(radius: f32, earth_radius: f32, initial_height: f32) -> f32 {
    let span = initial_height - earth_radius;
    if span.abs() <= f32::EPSILON {
        return 1.0;
    }
    let ratio = (radius - earth_radius) / span;
    if ratio.is_finite() {
        ratio.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Rescale `position` so its radius lies in `[inner, outer]`.
///
/// Points already inside the shell are returned unchanged. The origin has no
/// direction and is returned as is.
pub fn clamp_to_shell(position: Vec3, inner: f32, outer: f32) -> Vec3 {
    let radius = position.length();
    if radius == 0.0 || (radius >= inner && radius <= outer) {
        return position;
    }
    position * (radius.clamp(inner, outer) / radius)
}

fn random_vec3<R: Rng>(rng: &mut R, strength: f32) -> Vec3 {
    Vec3::new(
        (rng.gen::<f32>() - 0.5) * strength,
        (rng.gen::<f32>() - 0.5) * strength,
        (rng.gen::<f32>() - 0.5) * strength,
    )
}

/// Advance one particle's position and velocity by one frame.
///
/// `cruise_height` is the particle's target radius (height times rise speed)
/// and `anchor` its emission point, already rotated with the planet. The
/// returned position is inside the atmosphere shell, or equal to `anchor` if
/// the update produced a non-finite result.
pub fn update_position<R: Rng>(
    position: Vec3,
    velocity: &mut Vec3,
    age_ratio: f32,
    cruise_height: f32,
    anchor: Vec3,
    config: &SimConfig,
    rng: &mut R,
) -> Vec3 {
    let current_radius = position.length();
    if current_radius == 0.0 {
        return anchor;
    }

    let direction = position / current_radius;
    let speed = config.effective_speed();
    let speed_sq = speed * speed;

    let random_strength = speed_sq * RANDOM_WALK_SCALE * (1.0 - age_ratio * 0.5);
    let random_walk = random_vec3(rng, random_strength) * speed;
    let brownian = random_vec3(rng, speed_sq * BROWNIAN_SCALE) * speed;

    let target_radius = cruise_height + (rng.gen::<f32>() - 0.5) * TARGET_JITTER * speed;

    *velocity += random_walk + brownian;

    let damping = BASE_DAMPING - (current_radius - target_radius).abs() * DISTANCE_DAMPING * speed;
    *velocity *= damping;
    *velocity += direction * EXPANSION_FORCE * speed;

    let radial = (target_radius - current_radius) * config.dispersion_rate * speed;

    let next = position + direction * radial + *velocity + random_walk + brownian;
    let next = clamp_to_shell(next, config.earth_radius, config.max_atmosphere_radius);

    if !next.is_finite() {
        *velocity = Vec3::ZERO;
        return anchor;
    }
    next
}

/// Advance every active particle in `field` by one frame, in slot order.
///
/// Reads the config and rotation fresh on every call. Particles whose age
/// reaches a finite `max_age` become [`SlotState::Expired`] and go invisible.
pub fn step_field<R: Rng>(
    field: &mut ParticleField,
    config: &SimConfig,
    rotation: &RotationModel,
    now: f64,
    rng: &mut R,
) -> PhysicsReport {
    let mut report = PhysicsReport::default();
    let max_age = config.finite_max_age();
    let planet_angle = rotation.planet_angle();

    for i in 0..field.len() {
        if field.states[i] != SlotState::Active {
            continue;
        }

        if !field.positions[i].is_finite() {
            field.positions[i] = field.emission_points[i];
            if !field.velocities[i].is_finite() {
                field.velocities[i] = Vec3::ZERO;
            }
            report.recovered += 1;
            continue;
        }

        let age = (now - field.start_times[i]).max(0.0) as f32;
        field.ages[i] = age;

        if let Some(max) = max_age {
            if age >= max {
                field.states[i] = SlotState::Expired;
                field.opacities[i] = 0.0;
                report.expired += 1;
                continue;
            }
        }

        let position = field.positions[i];
        let rise = height_ratio(
            position.length(),
            config.earth_radius,
            field.initial_heights[i],
        );
        let anchor = rotate(field.emission_points[i], planet_angle);

        let next = update_position(
            position,
            &mut field.velocities[i],
            age_ratio(age, max_age),
            field.heights[i] * config.rise_speed,
            anchor,
            config,
            rng,
        );

        let rotated = rotate(next, rotation.interpolate_rotation(rise));
        field.positions[i] = clamp_to_shell(rotated, config.earth_radius, config.max_atmosphere_radius);
        report.advanced += 1;
    }

    report
}
