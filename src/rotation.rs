//! Planet and atmosphere rotation.
//!
//! The globe spins about its polar (Y) axis. The atmosphere turns at
//! [`ATMOSPHERE_FACTOR`] of the planet's rate, so the gas shell lags behind the
//! surface almost imperceptibly. Particles blend between the two angles by how
//! far they have risen.

use glam::{Mat3, Vec3};
use std::f32::consts::TAU;

/// Planet rotation rate in radians per second.
pub const ROTATION_RATE: f32 = 0.0001;

/// Atmosphere rotation relative to the planet.
pub const ATMOSPHERE_FACTOR: f32 = 0.99;

/// Largest blend weight toward the atmosphere angle.
pub const MAX_ATMOSPHERE_BLEND: f32 = 0.01;

/// Accumulated planet and atmosphere rotation.
#[derive(Debug, Clone)]
pub struct RotationModel {
    planet_angle: f32,
    atmosphere_angle: f32,
    rate: f32,
}

impl Default for RotationModel {
    fn default() -> Self {
        Self::new()
    }
}

impl RotationModel {
    /// Create a rotation model at angle zero with the default rate.
    pub fn new() -> Self {
        Self::with_rate(ROTATION_RATE)
    }

    /// Create a rotation model spinning at `rate` radians per second.
    pub fn with_rate(rate: f32) -> Self {
        Self {
            planet_angle: 0.0,
            atmosphere_angle: 0.0,
            rate,
        }
    }

    /// Advance both angles by `delta` seconds.
    ///
    /// Returns `(planet_angle, atmosphere_angle)`, both in `[0, 2π)`.
    pub fn advance(&mut self, delta: f32) -> (f32, f32) {
        let step = self.rate * delta;
        self.planet_angle = wrap_angle(self.planet_angle + step);
        self.atmosphere_angle = wrap_angle(self.atmosphere_angle + step * ATMOSPHERE_FACTOR);
        (self.planet_angle, self.atmosphere_angle)
    }

    /// Current planet angle.
    #[inline]
    pub fn planet_angle(&self) -> f32 {
        self.planet_angle
    }

    /// Current atmosphere angle.
    #[inline]
    pub fn atmosphere_angle(&self) -> f32 {
        self.atmosphere_angle
    }

    /// Blend the planet and atmosphere angles for a particle at `height_ratio`.
    ///
    /// Even particles at full height only lean [`MAX_ATMOSPHERE_BLEND`] toward
    /// the atmosphere angle.
    pub fn interpolate_rotation(&self, height_ratio: f32) -> f32 {
        let weight = (height_ratio * MAX_ATMOSPHERE_BLEND).min(MAX_ATMOSPHERE_BLEND);
        let angle = self.planet_angle * (1.0 - weight) + self.atmosphere_angle * weight;
        wrap_angle(angle)
    }
}

/// Rotation about the polar axis by `angle` radians.
#[inline]
pub fn rotation_matrix(angle: f32) -> Mat3 {
    Mat3::from_rotation_y(angle)
}

/// Rotate `point` about the polar axis by `angle` radians.
#[inline]
pub fn rotate(point: Vec3, angle: f32) -> Vec3 {
    rotation_matrix(angle) * point
}

fn wrap_angle(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_advance() {
        let mut rotation = RotationModel::with_rate(1.0);
        let (planet, atmosphere) = rotation.advance(0.5);
        assert!((planet - 0.5).abs() < 1e-6);
        assert!((atmosphere - 0.495).abs() < 1e-6);
    }

    #[test]
    fn test_angles_wrap() {
        let mut rotation = RotationModel::with_rate(1.0);
        for _ in 0..100 {
            let (planet, atmosphere) = rotation.advance(0.37);
            assert!((0.0..TAU).contains(&planet));
            assert!((0.0..TAU).contains(&atmosphere));
        }
    }

    #[test]
    fn test_interpolate_rotation_is_capped() {
        let mut rotation = RotationModel::with_rate(1.0);
        rotation.advance(2.0);

        let ground = rotation.interpolate_rotation(0.0);
        assert_eq!(ground, rotation.planet_angle());

        let high = rotation.interpolate_rotation(1.0);
        let higher = rotation.interpolate_rotation(50.0);
        assert_eq!(high, higher);

        let expected = rotation.planet_angle() * 0.99 + rotation.atmosphere_angle() * 0.01;
        assert!((high - expected).abs() < 1e-6);
    }

    #[test]
    fn test_rotate_about_polar_axis() {
        let rotated = rotate(Vec3::X, FRAC_PI_2);
        assert!((rotated - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-6);

        // Points on the axis don't move
        let pole = rotate(Vec3::Y * 2.0, 1.234);
        assert!((pole - Vec3::Y * 2.0).length() < 1e-6);
    }

    #[test]
    fn test_default_rate_is_slow() {
        let mut rotation = RotationModel::new();
        let (planet, _) = rotation.advance(1.0);
        assert!((planet - ROTATION_RATE).abs() < 1e-9);
    }
}
