//! Tunnel of concentric rings rushing toward the camera, with a handful of
//! glowing particles drifting through it.

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f32::consts::TAU;

use super::{ColorVertex, LineStrip, PointVertex, Scene, SceneFrame, SceneKind, SpriteKind};
use crate::audio::FrequencySnapshot;
use crate::params::TunnelParams;
use crate::util::hsl_to_rgb;

#[derive(Debug, Clone, PartialEq)]
pub struct GlowParticle {
    pub position: Vec3,
    pub size: f32,
    /// World units per tick
    pub speed: f32,
    pub opacity: f32,
    pub hue: f32,
}

pub struct TunnelScene {
    params: TunnelParams,
    particles: Vec<GlowParticle>,
    rng: StdRng,
}

impl TunnelScene {
    pub fn new(params: TunnelParams) -> Self {
        let mut rng = StdRng::seed_from_u64(params.seed);
        let particles = (0..params.particle_count)
            .map(|_| {
                let (x, y) = lateral(&mut rng, params.particle_radius);
                GlowParticle {
                    position: Vec3::new(x, y, -rng.gen::<f32>() * params.depth),
                    size: 0.045 + rng.gen::<f32>() * 0.07,
                    speed: 0.20 + rng.gen::<f32>() * 0.11 + rng.gen::<f32>() * 0.06,
                    opacity: 0.68 + rng.gen::<f32>() * 0.32,
                    hue: 0.55 + rng.gen::<f32>() * 0.28,
                }
            })
            .collect();

        Self {
            params,
            particles,
            rng,
        }
    }

    pub fn particles(&self) -> &[GlowParticle] {
        &self.particles
    }

    /// Depth of ring `ring` at time `t`; cycles through `depth` and repeats
    pub fn ring_z(&self, ring: usize, t: f32) -> f32 {
        let p = &self.params;
        let rings = p.rings.max(1) as f32;
        -((t * p.speed * 1.16 + ring as f32 * (p.depth / rings)).rem_euclid(p.depth)) + p.depth * 0.3
    }

    fn emit_rings(&self, snapshot: &FrequencySnapshot, t: f32, frame: &mut SceneFrame) {
        let p = &self.params;
        let rings = p.rings.max(1) as f32;
        let segments = p.segments.max(1);
        let last_bin = snapshot.len().saturating_sub(1) as f32;

        for r in 0..p.rings {
            let rf = r as f32;
            let nearness = 1.0 - rf / rings;
            let z = self.ring_z(r, t);
            let base_bin = (nearness * last_bin).floor() as usize;
            let base_level = snapshot.level_wrapped(base_bin);
            let twist = (t * 0.44 + rf * 0.08).sin() * p.twist_factor * nearness;
            let opacity = (p.glow_opacity - rf * p.opacity_falloff).max(0.0);

            let mut strip = LineStrip {
                vertices: Vec::with_capacity(segments + 1),
            };
            // closing vertex repeats segment 0
            for i in 0..=segments {
                let idx = i % segments;
                let theta = idx as f32 / segments as f32 * TAU;
                let fraction = idx as f32 / segments as f32;
                let level = snapshot.level_at_fraction(fraction);
                let mixed = (base_level + level) * 0.5;
                let pulse = level * 0.83 + mixed * 0.45;

                let wave = (theta * 3.5 + t * 2.1 + rf * 0.34).sin() * 0.17
                    + (theta * 6.4 - t * 1.2 - rf * 0.54).cos() * 0.12
                    + (theta * 1.1 + t * 0.45 + rf * 0.13).sin() * 0.07 * level;
                let swirl = twist * (theta * 2.0 + t * 0.53).sin();
                let radius = p.radius + rf * 0.01 + wave + pulse + swirl;

                let hue = (0.59 + 0.25 * (mixed + (theta + t * 0.19 + rf * 0.04).sin()) + t * 0.02)
                    .rem_euclid(1.0);
                let color = hsl_to_rgb(
                    hue,
                    0.92 - 0.23 * mixed + 0.17 * level,
                    0.54 + 0.34 * level + 0.12 * nearness,
                );

                strip.vertices.push(ColorVertex {
                    position: [theta.cos() * radius, theta.sin() * radius, z],
                    edge: 0.0,
                    color: [color.x, color.y, color.z, opacity],
                });
            }
            frame.strips.push(strip);
        }
    }

    fn step_particles(&mut self, t: f32) {
        let p = &self.params;
        for (idx, particle) in self.particles.iter_mut().enumerate() {
            particle.position.z += particle.speed;
            particle.size = 0.06
                + ((t + idx as f32) * 1.8).sin().abs() * 0.08
                + self.rng.gen::<f32>() * 0.01;

            if particle.position.z > p.respawn_z {
                let (x, y) = lateral(&mut self.rng, p.particle_radius);
                particle.position = Vec3::new(x, y, -p.depth - 6.0 + self.rng.gen::<f32>() * 6.0);
                particle.size = 0.045 + self.rng.gen::<f32>() * 0.07;
                particle.opacity = 0.68 + self.rng.gen::<f32>() * 0.32;
                particle.hue = 0.52 + self.rng.gen::<f32>() * 0.33;
            }
        }
    }

    fn emit_particles(&self, frame: &mut SceneFrame) {
        let points = frame.begin_points(SpriteKind::Soft, self.particles.len() * 2);
        for particle in &self.particles {
            let halo = hsl_to_rgb(particle.hue, 1.0, 0.58);
            let core = hsl_to_rgb(particle.hue, 1.0, 0.80);
            points.push(PointVertex {
                position: particle.position.to_array(),
                size: particle.size * 2.2,
                color: [halo.x, halo.y, halo.z, particle.opacity * 0.2],
                glow: [0.0; 4],
            });
            points.push(PointVertex {
                position: particle.position.to_array(),
                size: particle.size,
                color: [core.x, core.y, core.z, particle.opacity],
                glow: [0.0; 4],
            });
        }
    }
}

/// Random lateral offset within `radius + 0.7` on each axis
fn lateral(rng: &mut StdRng, radius: f32) -> (f32, f32) {
    let x = (rng.gen::<f32>() - 0.5) * 2.0 * (radius + rng.gen::<f32>() * 0.7);
    let y = (rng.gen::<f32>() - 0.5) * 2.0 * (radius + rng.gen::<f32>() * 0.7);
    (x, y)
}

impl Scene for TunnelScene {
    fn kind(&self) -> SceneKind {
        SceneKind::Tunnel
    }

    fn update(&mut self, snapshot: &FrequencySnapshot, elapsed_s: f32, frame: &mut SceneFrame) {
        self.emit_rings(snapshot, elapsed_s, frame);
        self.step_particles(elapsed_s);
        self.emit_particles(frame);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SessionId;

    fn snap(level: u8) -> FrequencySnapshot {
        FrequencySnapshot::from_bins(SessionId(1), vec![level; 64])
    }

    #[test]
    fn test_ring_and_vertex_counts() {
        let mut scene = TunnelScene::new(TunnelParams::default());
        let mut frame = SceneFrame::default();
        scene.update(&snap(0), 0.0, &mut frame);
        assert_eq!(frame.strips.len(), 22);
        assert!(frame.strips.iter().all(|s| s.vertices.len() == 65));
        // strips close on themselves
        let strip = &frame.strips[0];
        assert_eq!(strip.vertices[0].position, strip.vertices[64].position);
        assert_eq!(frame.point_count(), 40);
    }

    #[test]
    fn test_ring_opacity_falls_off() {
        let mut scene = TunnelScene::new(TunnelParams::default());
        let mut frame = SceneFrame::default();
        scene.update(&snap(50), 1.0, &mut frame);
        assert!((frame.strips[0].vertices[0].color[3] - 0.94).abs() < 1e-6);
        assert!((frame.strips[21].vertices[0].color[3] - (0.94 - 21.0 * 0.035)).abs() < 1e-5);
    }

    #[test]
    fn test_ring_depth_wraps() {
        let scene = TunnelScene::new(TunnelParams::default());
        for step in 0..500 {
            let t = step as f32 * 0.37;
            for ring in 0..22 {
                let z = scene.ring_z(ring, t);
                assert!(z <= 18.0 * 0.3 + 1e-4 && z > -18.0 + 5.4 - 1e-4, "z = {}", z);
            }
        }
    }

    #[test]
    fn test_loud_spectrum_widens_rings() {
        let mut quiet = TunnelScene::new(TunnelParams::default());
        let mut loud = TunnelScene::new(TunnelParams::default());
        let (mut a, mut b) = (SceneFrame::default(), SceneFrame::default());
        quiet.update(&snap(0), 2.0, &mut a);
        loud.update(&snap(255), 2.0, &mut b);
        let radius = |v: &ColorVertex| v.position[0].hypot(v.position[1]);
        assert!(radius(&b.strips[3].vertices[10]) > radius(&a.strips[3].vertices[10]));
    }

    #[test]
    fn test_particles_respawn_at_far_end() {
        let params = TunnelParams::default();
        let bound = params.particle_radius + 0.7;
        let mut scene = TunnelScene::new(params);
        let mut frame = SceneFrame::default();
        let mut respawned = 0;

        for tick in 0..400 {
            let before: Vec<f32> = scene.particles().iter().map(|p| p.position.z).collect();
            frame.clear();
            scene.update(&snap(30), tick as f32 / 60.0, &mut frame);
            for (particle, z_before) in scene.particles().iter().zip(before) {
                assert!(particle.position.x.abs() < bound && particle.position.y.abs() < bound);
                if particle.position.z < z_before {
                    respawned += 1;
                    assert!(
                        (-24.0..-18.0).contains(&particle.position.z),
                        "respawned at z = {}",
                        particle.position.z
                    );
                    assert!((0.52..0.85).contains(&particle.hue));
                }
                assert!(particle.position.z <= 8.0 + 0.37);
            }
        }
        assert!(respawned > 0);
    }

    #[test]
    fn test_same_seed_same_particles() {
        let a = TunnelScene::new(TunnelParams::default());
        let b = TunnelScene::new(TunnelParams::default());
        assert_eq!(a.particles(), b.particles());
    }
}
