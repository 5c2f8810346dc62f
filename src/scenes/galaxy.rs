//! Galaxy spiral: stacked particle layers on rotating spiral arms.

use std::f32::consts::PI;

use super::{PointVertex, Scene, SceneFrame, SceneKind, SpriteKind};
use crate::audio::FrequencySnapshot;
use crate::params::GalaxyParams;
use crate::util::{hash01, hsl_to_rgb};

#[derive(Debug, Clone, Copy)]
struct ArmPoint {
    base_angle: f32,
    base_radius: f32,
    along: f32,
    arm: usize,
}

pub struct GalaxyScene {
    params: GalaxyParams,
    layers: Vec<Vec<ArmPoint>>,
}

impl GalaxyScene {
    pub fn new(params: GalaxyParams) -> Self {
        let layer_count = params.layers;
        let arms = params.arms.max(1);
        let count = params.particles_per_layer;
        let layers = (0..layer_count)
            .map(|l| {
                let lf = l as f32;
                (0..count)
                    .map(|i| {
                        let along = i as f32 / count as f32;
                        let arm = i % arms;
                        let jitter = hash01((l * count + i) as u32, 0x6A1A) - 0.5;
                        ArmPoint {
                            base_angle: along * PI * 8.0
                                + arm as f32 * (PI * 2.0 / arms as f32)
                                + lf * PI / layer_count as f32,
                            base_radius: along * (params.spiral_radius - lf * 0.6) + jitter * 0.5,
                            along,
                            arm,
                        }
                    })
                    .collect()
            })
            .collect();

        Self { params, layers }
    }

    /// Opacity of layer `l`: outer layers are fainter
    pub fn layer_opacity(&self, l: usize) -> f32 {
        0.065 + 0.055 * self.params.layers.saturating_sub(l) as f32
    }
}

fn layered_noise(x: f32, y: f32, z: f32, t: f32) -> f32 {
    (x * 1.3 + t * 0.2).sin() * 0.4
        + (z * 1.7 + t * 0.13).cos() * 0.28
        + ((x + z) * 0.9 - t * 0.33).sin() * 0.18
        + (y * 1.8 + t * 0.42).sin() * 0.13
}

impl Scene for GalaxyScene {
    fn kind(&self) -> SceneKind {
        SceneKind::Galaxy
    }

    fn update(&mut self, snapshot: &FrequencySnapshot, elapsed_s: f32, frame: &mut SceneFrame) {
        let t = elapsed_s;
        for (l, layer) in self.layers.iter().enumerate() {
            let lf = l as f32;
            let opacity = self.layer_opacity(l);
            let points = frame.begin_points(SpriteKind::Soft, layer.len());

            for (i, point) in layer.iter().enumerate() {
                let level = snapshot.level_at_fraction(point.along);
                let phase = t * (0.14 + 0.03 * lf) + point.arm as f32 * 0.17;
                let spiral = point.base_radius + level * (0.8 + 0.8 * (phase + i as f32 * 0.11).sin());
                let n = layered_noise(point.base_angle, spiral, point.along * 2.1, t + lf * 3.7);
                let reach = spiral + n * 0.8;

                let hue = 0.58 + 0.16 * point.along + 0.20 * (point.along * 5.3 + lf * 1.7 + t * 0.11).sin();
                let color = hsl_to_rgb(
                    hue,
                    0.92 - 0.19 * point.along + 0.16 * level,
                    0.61 + 0.32 * level.powf(1.4) + 0.12 * lf,
                );

                points.push(PointVertex {
                    position: [
                        (point.base_angle + phase).cos() * reach,
                        n * (0.55 + lf * 0.13) + level * 0.6,
                        (point.base_angle + phase).sin() * reach,
                    ],
                    size: (0.16 + lf * 0.05) * (1.0 + 1.7 * level),
                    color: [color.x, color.y, color.z, opacity],
                    glow: [0.0; 4],
                });
            }
        }
    }
}
