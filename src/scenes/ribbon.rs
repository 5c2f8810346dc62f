//! Aurora ribbon: a long strip waving in depth with the spectrum.

use glam::Vec3;

use super::{ColorVertex, Mesh, Scene, SceneFrame, SceneKind};
use crate::audio::FrequencySnapshot;
use crate::params::RibbonParams;
use crate::util::{mix3, smoothstep};

const GRADIENT: [Vec3; 4] = [
    Vec3::new(0.2, 0.88, 1.0),
    Vec3::new(0.5, 0.3, 1.0),
    Vec3::new(1.0, 0.36, 0.96),
    Vec3::new(0.51, 1.0, 0.85),
];

pub struct RibbonScene {
    params: RibbonParams,
    indices: Vec<u32>,
}

impl RibbonScene {
    pub fn new(params: RibbonParams) -> Self {
        let indices = strip_indices(params.segments);
        Self { params, indices }
    }

    /// Normalized magnitude driving segment `segment`
    fn segment_level(&self, snapshot: &FrequencySnapshot, segment: usize) -> f32 {
        let segments = self.params.segments.max(1);
        let bin = segment * snapshot.len() / segments;
        snapshot.level_wrapped(bin)
    }
}

/// Two triangles per segment gap; vertex 2i is the top, 2i+1 the bottom
fn strip_indices(segments: usize) -> Vec<u32> {
    let mut indices = Vec::with_capacity(segments.saturating_sub(1) * 6);
    for i in 0..segments.saturating_sub(1) as u32 {
        indices.extend_from_slice(&[i * 2, i * 2 + 1, i * 2 + 2, i * 2 + 1, i * 2 + 3, i * 2 + 2]);
    }
    indices
}

fn gradient(along: f32, t: f32) -> Vec3 {
    let g = along + 0.13 * (t * 0.19 + along * 11.0).sin();
    let c = mix3(GRADIENT[0], GRADIENT[1], smoothstep(0.0, 0.33, g));
    let c = mix3(c, GRADIENT[2], smoothstep(0.33, 0.67, g));
    mix3(c, GRADIENT[3], smoothstep(0.67, 1.0, g))
}

impl Scene for RibbonScene {
    fn kind(&self) -> SceneKind {
        SceneKind::Ribbon
    }

    fn update(&mut self, snapshot: &FrequencySnapshot, elapsed_s: f32, frame: &mut SceneFrame) {
        let p = &self.params;
        let t = elapsed_s;
        let half = p.segments as f32 / 2.0;
        let mut vertices = Vec::with_capacity(p.segments * 2);

        for segment in 0..p.segments {
            let x = segment as f32;
            let level = self.segment_level(snapshot, segment);
            let base_wave = (t * 1.1 + x * 0.073).sin() * 0.44;
            let level_wave = (t * 1.9 + x * 0.09 + level * 6.0).sin() * 0.23 * level;
            let z = base_wave + level_wave + level * 0.7;
            let half_height = p.width * (1.0 + level * 1.1) * (0.6 + 0.3 * level);

            let color = gradient(x / p.segments as f32, t);
            let alpha = 0.88 * (0.66 + 0.35 * level);
            for edge in [1.0f32, -1.0] {
                vertices.push(ColorVertex {
                    position: [(x - half) * p.segment_spacing, edge * half_height, z],
                    edge,
                    color: [color.x, color.y, color.z, alpha],
                });
            }
        }

        frame.meshes.push(Mesh {
            vertices,
            indices: self.indices.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SessionId;

    #[test]
    fn test_mesh_layout() {
        let mut scene = RibbonScene::new(RibbonParams::default());
        let mut frame = SceneFrame::default();
        let snapshot = FrequencySnapshot::from_bins(SessionId(1), vec![40; 64]);
        scene.update(&snapshot, 0.0, &mut frame);

        let mesh = &frame.meshes[0];
        assert_eq!(mesh.vertices.len(), 360);
        assert_eq!(mesh.indices.len(), 179 * 6);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
        assert_eq!(mesh.vertices[0].edge, 1.0);
        assert_eq!(mesh.vertices[1].edge, -1.0);
    }

    #[test]
    fn test_louder_segments_are_taller_and_forward() {
        let mut scene = RibbonScene::new(RibbonParams::default());
        let mut quiet = SceneFrame::default();
        let mut loud = SceneFrame::default();
        scene.update(&FrequencySnapshot::from_bins(SessionId(1), vec![0; 64]), 1.0, &mut quiet);
        scene.update(&FrequencySnapshot::from_bins(SessionId(1), vec![255; 64]), 1.0, &mut loud);

        let q = &quiet.meshes[0].vertices[20];
        let l = &loud.meshes[0].vertices[20];
        assert!(l.position[1] > q.position[1]);
        assert!(l.color[3] > q.color[3]);
    }

    #[test]
    fn test_segment_sampling_uses_floor_of_fraction() {
        let scene = RibbonScene::new(RibbonParams::default());
        let bins: Vec<u8> = (0..64).map(|i| i as u8).collect();
        let snapshot = FrequencySnapshot::from_bins(SessionId(1), bins);
        // floor(179 / 180 * 64) = 63
        assert_eq!(scene.segment_level(&snapshot, 179), 63.0 / 255.0);
        assert_eq!(scene.segment_level(&snapshot, 0), 0.0);
    }

    #[test]
    fn test_gradient_endpoints() {
        assert!((gradient(0.0, 0.0) - GRADIENT[0]).length() < 1e-6);
        assert!(gradient(0.5, 3.0).is_finite());
    }
}
