//! Small math helpers shared by the scene modules.

use glam::Vec3;

/// Stable hash of a particle index into [0, 1).
///
/// Integer mixing only, so the same `(index, salt)` yields the same value on
/// every run and platform.
pub fn hash01(index: u32, salt: u32) -> f32 {
    let mut x = index.wrapping_mul(0x9E37_79B9) ^ salt.wrapping_mul(0x85EB_CA6B);
    x ^= x >> 16;
    x = x.wrapping_mul(0x7FEB_352D);
    x ^= x >> 15;
    x = x.wrapping_mul(0x846C_A68B);
    x ^= x >> 16;
    // top 24 bits keep the result exactly representable and < 1.0
    (x >> 8) as f32 / (1u32 << 24) as f32
}

/// Fractional part, always in [0, 1) (GLSL `fract`)
pub fn fract(x: f32) -> f32 {
    x - x.floor()
}

pub fn mix(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

pub fn mix3(a: Vec3, b: Vec3, t: f32) -> Vec3 {
    a + (b - a) * t
}

/// Hermite step between two edges (edges may be reversed, as in GLSL)
pub fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// HSV (all components 0..1, hue wraps) to linear RGB
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Vec3 {
    let k = [1.0, 2.0 / 3.0, 1.0 / 3.0];
    let channel = |offset: f32| {
        let p = (fract(h + offset) * 6.0 - 3.0).abs();
        mix(1.0, (p - 1.0).clamp(0.0, 1.0), s) * v
    };
    Vec3::new(channel(k[0]), channel(k[1]), channel(k[2]))
}

/// HSL to RGB, hue wrapping like three.js `Color::setHSL`
pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> Vec3 {
    let h = fract(h);
    let s = s.clamp(0.0, 1.0);
    let l = l.clamp(0.0, 1.0);
    if s == 0.0 {
        return Vec3::splat(l);
    }
    let p = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let q = 2.0 * l - p;
    Vec3::new(
        hue_to_rgb(q, p, h + 1.0 / 3.0),
        hue_to_rgb(q, p, h),
        hue_to_rgb(q, p, h - 1.0 / 3.0),
    )
}

fn hue_to_rgb(p: f32, q: f32, t: f32) -> f32 {
    let t = fract(t);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * 6.0 * (2.0 / 3.0 - t)
    } else {
        p
    }
}

/// Parse `#rrggbb` into 0..1 RGB; `None` unless exactly six hex digits
pub fn parse_hex_color(hex: &str) -> Option<Vec3> {
    let digits = hex.trim().trim_start_matches('#');
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| {
        let pair = digits.get(range)?;
        u8::from_str_radix(pair, 16).ok().map(|v| v as f32 / 255.0)
    };
    Some(Vec3::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_stable_and_in_range() {
        for i in 0..10_000 {
            let a = hash01(i, 1);
            assert!((0.0..1.0).contains(&a), "hash {} out of range", a);
            assert_eq!(a, hash01(i, 1));
        }
        assert_ne!(hash01(7, 1), hash01(7, 2));
    }

    #[test]
    fn test_hash_spreads_values() {
        let mean: f32 = (0..4096).map(|i| hash01(i, 3)).sum::<f32>() / 4096.0;
        assert!((mean - 0.5).abs() < 0.05, "mean was {}", mean);
    }

    #[test]
    fn test_hsv_primaries() {
        assert!((hsv_to_rgb(0.0, 1.0, 1.0) - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-5);
        assert!((hsv_to_rgb(1.0 / 3.0, 1.0, 1.0) - Vec3::new(0.0, 1.0, 0.0)).length() < 1e-5);
        assert!((hsv_to_rgb(0.5, 0.0, 0.5) - Vec3::splat(0.5)).length() < 1e-5);
    }

    #[test]
    fn test_hsl_matches_known_values() {
        assert!((hsl_to_rgb(0.0, 1.0, 0.5) - Vec3::new(1.0, 0.0, 0.0)).length() < 1e-5);
        assert!((hsl_to_rgb(2.0 / 3.0, 1.0, 0.5) - Vec3::new(0.0, 0.0, 1.0)).length() < 1e-5);
        // hue wraps
        assert!((hsl_to_rgb(1.25, 0.8, 0.4) - hsl_to_rgb(0.25, 0.8, 0.4)).length() < 1e-5);
    }

    #[test]
    fn test_smoothstep_reversed_edges() {
        assert_eq!(smoothstep(0.49, 0.43, 0.2), 1.0);
        assert_eq!(smoothstep(0.49, 0.43, 0.6), 0.0);
    }

    #[test]
    fn test_parse_hex_color() {
        let c = parse_hex_color("#ff8000").unwrap();
        assert!((c - Vec3::new(1.0, 128.0 / 255.0, 0.0)).length() < 1e-6);
        assert_eq!(parse_hex_color("70E2FF"), Some(Vec3::new(112.0, 226.0, 255.0) / 255.0));
        assert_eq!(parse_hex_color("nope"), None);
        assert_eq!(parse_hex_color("#12345g"), None);
    }

    #[test]
    fn test_parse_hex_color_multibyte_input() {
        // six bytes, but not six characters
        assert_eq!(parse_hex_color("#ééé"), None);
        assert_eq!(parse_hex_color("#aé€"), None);
        assert_eq!(parse_hex_color("ff€f"), None);
    }
}
