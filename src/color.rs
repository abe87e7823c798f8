//! Per-entity particle colors.
//!
//! Every entity id hashes to one of four palette families. Each family is a
//! five-stop scale interpolated in LCh space, and one fixed point on that scale
//! gives the entity's color. The mapping is a pure function of the id, so an
//! entity keeps its color across frames, regenerations and runs.
//!
//! The fresh/dispersed pair returned by [`colors_for`] is the same color twice.
//! Particles don't fade between tones over their lifetime.

use glam::Vec3;

/// Palette families particles are tinted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteFamily {
    /// Light apricot to deep brown.
    Orange,
    /// Sky to navy.
    Blue,
    /// Lime to olive.
    Green,
    /// Blush to wine.
    Pink,
}

impl PaletteFamily {
    /// All families in hash order.
    pub const ALL: [PaletteFamily; 4] = [
        PaletteFamily::Orange,
        PaletteFamily::Blue,
        PaletteFamily::Green,
        PaletteFamily::Pink,
    ];

    /// The five color stops of this family, light to dark, as `0xRRGGBB`.
    pub fn stops(&self) -> [u32; 5] {
        match self {
            PaletteFamily::Orange => [0xFDC381, 0xF6993A, 0xC26B0B, 0x7D4100, 0x6B3700],
            PaletteFamily::Blue => [0xA7D5FD, 0x69ACE9, 0x2E729E, 0x16415D, 0x13364E],
            PaletteFamily::Green => [0xDEFD86, 0xBCF51D, 0x7CA605, 0x495D12, 0x3D4B16],
            PaletteFamily::Pink => [0xF0ADC1, 0xF080A1, 0xAD516C, 0x7C2E45, 0x73263D],
        }
    }

    /// Sample the family's scale at `t` in `[0, 1]`, interpolating in LCh.
    pub fn sample(&self, t: f32) -> Vec3 {
        let stops = self.stops();
        let segments = (stops.len() - 1) as f32;
        let scaled = t.clamp(0.0, 1.0) * segments;
        let index = (scaled.floor() as usize).min(stops.len() - 2);
        let f = scaled - index as f32;

        let a = srgb_to_lch(hex_to_rgb(stops[index]));
        let b = srgb_to_lch(hex_to_rgb(stops[index + 1]));
        lch_to_srgb(lerp_lch(a, b, f))
    }
}

/// Point on a family's scale used for particle color.
pub const SCALE_POSITION: f32 = 0.2;

/// Fresh and dispersed tones for one entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleColors {
    /// Tone of a newly emitted particle.
    pub fresh: Vec3,
    /// Tone of a dispersed particle.
    pub dispersed: Vec3,
}

/// Rolling hash of an entity id over its UTF-16 code units.
///
/// Each step computes `c + ((h << 5) - h)` where the shift wraps to 32 bits
/// but the running value does not, so ids hash identically to the web
/// frontend that assigns the same colors.
pub fn hash_entity_id(id: &str) -> i64 {
    id.encode_utf16().fold(0i64, |acc, unit| {
        let shifted = (acc as i32).wrapping_shl(5) as i64;
        unit as i64 + (shifted - acc)
    })
}

/// Palette family for an entity id.
pub fn family_for(id: &str) -> PaletteFamily {
    let index = (hash_entity_id(id).unsigned_abs() % PaletteFamily::ALL.len() as u64) as usize;
    PaletteFamily::ALL[index]
}

/// Particle color for an entity id.
pub fn color_for(id: &str) -> Vec3 {
    family_for(id).sample(SCALE_POSITION)
}

/// Fresh and dispersed tones for an entity id.
pub fn colors_for(id: &str) -> ParticleColors {
    let color = color_for(id);
    ParticleColors {
        fresh: color,
        dispersed: color,
    }
}

/// Render an RGB color (channels 0-1) as `#rrggbb`.
pub fn to_hex(color: Vec3) -> String {
    let [r, g, b] = color
        .clamp(Vec3::ZERO, Vec3::ONE)
        .to_array()
        .map(|c| (c * 255.0).round() as u8);
    format!("#{:02x}{:02x}{:02x}", r, g, b)
}

/// Convert `0xRRGGBB` to RGB channels in 0-1.
pub fn hex_to_rgb(hex: u32) -> Vec3 {
    Vec3::new(
        ((hex >> 16) & 0xFF) as f32 / 255.0,
        ((hex >> 8) & 0xFF) as f32 / 255.0,
        (hex & 0xFF) as f32 / 255.0,
    )
}

// ========== LCh conversion ==========
//
// sRGB -> linear RGB -> XYZ (D65) -> CIE Lab -> LCh, and back.

const WHITE_X: f32 = 0.950_47;
const WHITE_Y: f32 = 1.0;
const WHITE_Z: f32 = 1.088_83;

const LAB_T0: f32 = 4.0 / 29.0;
const LAB_T1: f32 = 6.0 / 29.0;
const LAB_T2: f32 = 3.0 * LAB_T1 * LAB_T1;
const LAB_T3: f32 = LAB_T1 * LAB_T1 * LAB_T1;

/// Color in cylindrical Lab: lightness, chroma, hue in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Lch {
    l: f32,
    c: f32,
    h: f32,
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

fn xyz_to_lab_f(t: f32) -> f32 {
    if t > LAB_T3 {
        t.cbrt()
    } else {
        t / LAB_T2 + LAB_T0
    }
}

fn lab_to_xyz_f(t: f32) -> f32 {
    if t > LAB_T1 {
        t * t * t
    } else {
        LAB_T2 * (t - LAB_T0)
    }
}

fn srgb_to_lch(rgb: Vec3) -> Lch {
    let r = srgb_to_linear(rgb.x);
    let g = srgb_to_linear(rgb.y);
    let b = srgb_to_linear(rgb.z);

    let x = (0.412_456_4 * r + 0.357_576_1 * g + 0.180_437_5 * b) / WHITE_X;
    let y = (0.212_672_9 * r + 0.715_152_2 * g + 0.072_175 * b) / WHITE_Y;
    let z = (0.019_333_9 * r + 0.119_192 * g + 0.950_304_1 * b) / WHITE_Z;

    let fx = xyz_to_lab_f(x);
    let fy = xyz_to_lab_f(y);
    let fz = xyz_to_lab_f(z);

    let l = 116.0 * fy - 16.0;
    let a = 500.0 * (fx - fy);
    let b = 200.0 * (fy - fz);

    let c = (a * a + b * b).sqrt();
    let h = b.atan2(a).to_degrees().rem_euclid(360.0);
    Lch { l, c, h }
}

fn lch_to_srgb(lch: Lch) -> Vec3 {
    let hue = lch.h.to_radians();
    let a = lch.c * hue.cos();
    let b = lch.c * hue.sin();

    let fy = (lch.l + 16.0) / 116.0;
    let fx = fy + a / 500.0;
    let fz = fy - b / 200.0;

    let x = WHITE_X * lab_to_xyz_f(fx);
    let y = WHITE_Y * lab_to_xyz_f(fy);
    let z = WHITE_Z * lab_to_xyz_f(fz);

    let r = 3.240_454_2 * x - 1.537_138_5 * y - 0.498_531_4 * z;
    let g = -0.969_266 * x + 1.876_010_8 * y + 0.041_556 * z;
    let b = 0.055_643_4 * x - 0.204_025_9 * y + 1.057_225_2 * z;

    Vec3::new(linear_to_srgb(r), linear_to_srgb(g), linear_to_srgb(b))
        .clamp(Vec3::ZERO, Vec3::ONE)
}

/// Interpolate along the shorter hue arc.
fn lerp_lch(a: Lch, b: Lch, f: f32) -> Lch {
    let mut dh = b.h - a.h;
    if dh > 180.0 {
        dh -= 360.0;
    } else if dh < -180.0 {
        dh += 360.0;
    }

    Lch {
        l: a.l + (b.l - a.l) * f,
        c: a.c + (b.c - a.c) * f,
        h: (a.h + dh * f).rem_euclid(360.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_matches_known_values() {
        assert_eq!(hash_entity_id(""), 0);
        // "a" = 97
        assert_eq!(hash_entity_id("a"), 97);
        // "ab" = 98 + (97 * 32 - 97)
        assert_eq!(hash_entity_id("ab"), 98 + 97 * 31);
    }

    #[test]
    fn test_hash_wraps_like_int32_shift() {
        // Long ids overflow the 32-bit shift without panicking
        let id = "Q".repeat(64);
        let first = hash_entity_id(&id);
        let second = hash_entity_id(&id);
        assert_eq!(first, second);
    }

    #[test]
    fn test_color_is_deterministic() {
        for id in ["Q312", "Q95", "Q2283", "Q37156", "Q1418"] {
            assert_eq!(color_for(id), color_for(id));
            assert_eq!(to_hex(color_for(id)), to_hex(color_for(id)));
        }
    }

    #[test]
    fn test_fresh_equals_dispersed() {
        let colors = colors_for("Q312");
        assert_eq!(colors.fresh, colors.dispersed);
    }

    #[test]
    fn test_color_is_from_selected_family() {
        for id in ["Q1", "Q2", "Q3", "Q4", "Q5", "Q6"] {
            let family = family_for(id);
            assert_eq!(color_for(id), family.sample(SCALE_POSITION));
        }
    }

    #[test]
    fn test_sample_endpoints_match_stops() {
        for family in PaletteFamily::ALL {
            let stops = family.stops();
            let start = family.sample(0.0);
            let end = family.sample(1.0);
            assert!((start - hex_to_rgb(stops[0])).abs().max_element() < 0.01);
            assert!((end - hex_to_rgb(stops[4])).abs().max_element() < 0.01);
        }
    }

    #[test]
    fn test_lch_round_trip() {
        let rgb = hex_to_rgb(0x69ACE9);
        let back = lch_to_srgb(srgb_to_lch(rgb));
        assert!((rgb - back).abs().max_element() < 0.005);
    }

    #[test]
    fn test_orange_family_stays_warm() {
        let color = PaletteFamily::Orange.sample(SCALE_POSITION);
        assert!(color.x > color.z);
    }

    #[test]
    fn test_to_hex() {
        assert_eq!(to_hex(Vec3::new(1.0, 0.0, 0.0)), "#ff0000");
        assert_eq!(to_hex(hex_to_rgb(0xFDC381)), "#fdc381");
    }
}
