//! Morphing particle cloud: sphere -> torus -> cube -> sphere.
//!
//! Each particle has three fixed hash values that place it on all three
//! shapes; the morph scalar blends between the current pair. Trail copies
//! are the same particles evaluated slightly in the past.

use glam::Vec3;
use std::f32::consts::TAU;

use super::{PointVertex, Scene, SceneFrame, SceneKind, SpriteKind};
use crate::audio::FrequencySnapshot;
use crate::params::MorphLayerParams;
use crate::util::{fract, hash01, hsv_to_rgb, mix, mix3, parse_hex_color};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Sphere,
    Torus,
    Cube,
}

impl Shape {
    /// Shape pair for a morph scalar in [0, 3)
    pub fn pair(morph: f32) -> (Shape, Shape) {
        match morph.floor().rem_euclid(3.0) as u32 {
            0 => (Shape::Sphere, Shape::Torus),
            1 => (Shape::Torus, Shape::Cube),
            _ => (Shape::Cube, Shape::Sphere),
        }
    }
}

/// Per-particle hash values
#[derive(Debug, Clone, Copy)]
struct Seeds {
    r1: f32,
    r2: f32,
    r3: f32,
}

impl Seeds {
    fn of(index: usize) -> Self {
        let i = index as u32;
        Self {
            r1: hash01(i, 1),
            r2: hash01(i, 2),
            r3: hash01(i, 3),
        }
    }
}

/// One morphing layer; several of these make up the aurora scene
pub struct MorphLayer {
    params: MorphLayerParams,
    color_a: Vec3,
    color_b: Vec3,
    glow_color: Vec3,
    ticks: u64,
    morph: f32,
}

impl MorphLayer {
    pub fn new(params: MorphLayerParams) -> Self {
        Self {
            color_a: parse_hex_color(&params.color_a).unwrap_or(Vec3::ONE),
            color_b: parse_hex_color(&params.color_b).unwrap_or(Vec3::ONE),
            glow_color: parse_hex_color(&params.glow_color).unwrap_or(Vec3::ONE),
            morph: params.morph_offset.rem_euclid(3.0),
            ticks: 0,
            params,
        }
    }

    pub fn params(&self) -> &MorphLayerParams {
        &self.params
    }

    /// Current morph scalar in [0, 3)
    pub fn morph(&self) -> f32 {
        self.morph
    }

    /// Advance the morph scalar by one display tick
    pub fn advance(&mut self) {
        self.ticks += 1;
        let raw = self.params.morph_offset as f64 + self.params.morph_speed as f64 * self.ticks as f64;
        self.morph = raw.rem_euclid(3.0) as f32;
    }

    pub fn point_count(&self) -> usize {
        self.params.particle_count * self.params.trail_steps.max(1)
    }

    /// Position of particle `index` on `shape` at time `trail_offset`
    pub fn shape_position(&self, shape: Shape, index: usize, trail_offset: f32) -> Vec3 {
        let p = &self.params;
        let Seeds { r1, r2, r3 } = Seeds::of(index);
        match shape {
            Shape::Sphere => {
                let theta = r1 * TAU;
                let phi = (2.0 * r2 - 1.0).clamp(-1.0, 1.0).acos();
                let r = p.sphere_radius + 0.36 * (trail_offset + r1 * 6.28).sin();
                Vec3::new(
                    r * phi.sin() * theta.cos(),
                    r * phi.sin() * theta.sin(),
                    r * phi.cos(),
                )
            }
            Shape::Torus => {
                let u = r1 * TAU;
                let v = r2 * TAU;
                let major = p.torus_major_radius;
                let minor = p.torus_minor_radius + 0.28 * (trail_offset + r2 * 5.23).sin();
                Vec3::new(
                    (major + minor * v.cos()) * u.cos(),
                    (major + minor * v.cos()) * u.sin(),
                    minor * v.sin(),
                )
            }
            Shape::Cube => Vec3::new(r1 - 0.5, r2 - 0.5, r3 - 0.5) * 2.0 * p.cube_half_extent,
        }
    }

    /// Blended, audio-free position for the current morph scalar
    pub fn base_position(&self, index: usize, trail_offset: f32) -> Vec3 {
        let (from, to) = Shape::pair(self.morph);
        mix3(
            self.shape_position(from, index, trail_offset),
            self.shape_position(to, index, trail_offset),
            fract(self.morph),
        )
    }

    /// Append this layer's points for the current tick
    pub fn emit(&self, snapshot: &FrequencySnapshot, elapsed_s: f32, out: &mut Vec<PointVertex>) {
        let p = &self.params;
        let steps = p.trail_steps.max(1);
        let count = p.particle_count;

        for step in 0..steps {
            let trail_t = 1.0 - step as f32 / steps as f32;
            for index in 0..count {
                let seeds = Seeds::of(index);
                let trail_offset = elapsed_s - step as f32 * p.trail_spacing_s - seeds.r1 * 0.03;
                let freq = snapshot.level_wrapped(index);

                let chaos = chaos(freq, trail_offset, seeds.r1);
                let mut pos = self.base_position(index, trail_offset) * (1.0 + 0.2 * freq * chaos);
                pos += burst_displacement(freq, trail_offset, seeds, p);

                let size = (7.0 + 14.0 * freq + 4.0 * seeds.r3) * (0.92 + 0.15 * (1.0 - trail_t));
                let hue_t = index as f32 / count.max(1) as f32;
                let color = self.color(hue_t, freq, chaos, seeds.r1, elapsed_s);
                let body_alpha = p.alpha_base * trail_t * trail_t;
                let glow_alpha = p.alpha_glow * (0.62 + 0.33 * freq) * trail_t;

                out.push(PointVertex {
                    position: pos.to_array(),
                    size,
                    color: [color.x, color.y, color.z, body_alpha],
                    glow: [self.glow_color.x, self.glow_color.y, self.glow_color.z, glow_alpha],
                });
            }
        }
    }

    fn color(&self, hue_t: f32, freq: f32, chaos: f32, r1: f32, time: f32) -> Vec3 {
        let p = &self.params;
        let hue = fract(hue_t + 0.19 * r1 + 0.13 * freq + 0.28 * (time + hue_t * 8.5 + r1 * 12.0).sin());
        let mapped_hue = p.hue_base + p.hue_range * hue;
        let sat = p.sat_base + p.sat_range * (time * 0.7 + r1 * 10.1).sin().abs();
        let val = p.val_base + p.val_range * freq + 0.07 * (time * 0.7 + r1 * 19.2).sin();
        let rainbow = hsv_to_rgb(mapped_hue, sat, val);

        let base = mix3(self.color_a, self.color_b, 0.38 + 0.56 * freq);
        mix3(base, rainbow, mix(0.74, 0.91, r1)) * (0.93 + 0.19 * chaos)
    }
}

fn chaos(freq: f32, trail_offset: f32, r1: f32) -> f32 {
    1.2 + 2.5 * freq * (trail_offset * 3.0 + r1 * 25.0).sin().abs()
}

/// Extra displacement for loud bins; zero at or below the threshold
fn burst_displacement(freq: f32, trail_offset: f32, seeds: Seeds, params: &MorphLayerParams) -> Vec3 {
    if freq <= params.burst_threshold {
        return Vec3::ZERO;
    }
    Vec3::new(
        (trail_offset * 12.0 + seeds.r1 * 16.0).sin(),
        (trail_offset * 10.0 + seeds.r2 * 15.0).cos(),
        (trail_offset * 7.1 + seeds.r3 * 17.0).sin(),
    ) * freq
        * params.burst_gain
}

/// Standalone single-layer particle cloud
pub struct MorphScene {
    layer: MorphLayer,
}

impl MorphScene {
    pub fn new(params: MorphLayerParams) -> Self {
        Self {
            layer: MorphLayer::new(params),
        }
    }

    pub fn layer(&self) -> &MorphLayer {
        &self.layer
    }
}

impl Scene for MorphScene {
    fn kind(&self) -> SceneKind {
        SceneKind::Morph
    }

    fn update(&mut self, snapshot: &FrequencySnapshot, elapsed_s: f32, frame: &mut SceneFrame) {
        self.layer.advance();
        let points = frame.begin_points(SpriteKind::Bokeh, self.layer.point_count());
        self.layer.emit(snapshot, elapsed_s, points);
    }
}
