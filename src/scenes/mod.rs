//! Scene modules: turn one frequency snapshot per tick into geometry.
//!
//! Scenes recompute everything from scratch on every update and write into a
//! [`SceneFrame`] the renderer uploads as-is. Snapshot indices always wrap, so
//! any snapshot length (including zero) is safe.

mod aurora;
mod galaxy;
mod morph;
mod ribbon;
mod scheduler;
mod tunnel;

use bytemuck::{Pod, Zeroable};
use serde::Deserialize;

use crate::audio::FrequencySnapshot;
use crate::params::SceneParams;

pub use aurora::AuroraScene;
pub use galaxy::GalaxyScene;
pub use morph::{MorphLayer, MorphScene, Shape};
pub use ribbon::RibbonScene;
pub use scheduler::FrameScheduler;
pub use tunnel::{GlowParticle, TunnelScene};

/// Point sprite instance
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct PointVertex {
    pub position: [f32; 3],
    /// Pixels for bokeh sprites, world units for soft sprites
    pub size: f32,
    /// Body color and alpha
    pub color: [f32; 4],
    /// Glow tint and glow alpha (bokeh sprites only)
    pub glow: [f32; 4],
}

/// Vertex of a line strip or mesh
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct ColorVertex {
    pub position: [f32; 3],
    /// Signed distance across a strip (-1..1); alpha fades toward |edge| = 1.
    /// Zero disables the fade.
    pub edge: f32,
    pub color: [f32; 4],
}

/// How a batch of point sprites is shaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpriteKind {
    /// Screen-sized disc with rays, ring and glow
    Bokeh,
    /// World-sized soft disc
    Soft,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointBatch {
    pub kind: SpriteKind,
    pub points: Vec<PointVertex>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineStrip {
    pub vertices: Vec<ColorVertex>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub vertices: Vec<ColorVertex>,
    pub indices: Vec<u32>,
}

/// Everything a scene draws in one tick (all additive-blended)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneFrame {
    pub points: Vec<PointBatch>,
    pub strips: Vec<LineStrip>,
    pub meshes: Vec<Mesh>,
}

impl SceneFrame {
    pub fn clear(&mut self) {
        self.points.clear();
        self.strips.clear();
        self.meshes.clear();
    }

    /// Start a new point batch and return its point list
    pub fn begin_points(&mut self, kind: SpriteKind, capacity: usize) -> &mut Vec<PointVertex> {
        self.points.push(PointBatch {
            kind,
            points: Vec::with_capacity(capacity),
        });
        let last = self.points.len() - 1;
        &mut self.points[last].points
    }

    pub fn point_count(&self) -> usize {
        self.points.iter().map(|b| b.points.len()).sum()
    }

    pub fn vertex_count(&self) -> usize {
        self.strips.iter().map(|s| s.vertices.len()).sum::<usize>()
            + self.meshes.iter().map(|m| m.vertices.len()).sum::<usize>()
    }

    /// Iterate every emitted position (points, strips, meshes)
    pub fn positions(&self) -> impl Iterator<Item = [f32; 3]> + '_ {
        let points = self.points.iter().flat_map(|b| b.points.iter().map(|p| p.position));
        let strips = self.strips.iter().flat_map(|s| s.vertices.iter().map(|v| v.position));
        let meshes = self.meshes.iter().flat_map(|m| m.vertices.iter().map(|v| v.position));
        points.chain(strips).chain(meshes)
    }
}

/// Selectable scenes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SceneKind {
    /// Single morphing particle cloud
    Morph,
    /// Three layered morph clouds
    #[default]
    Aurora,
    Tunnel,
    Ribbon,
    Galaxy,
}

impl SceneKind {
    pub const ALL: [SceneKind; 5] = [
        SceneKind::Morph,
        SceneKind::Aurora,
        SceneKind::Tunnel,
        SceneKind::Ribbon,
        SceneKind::Galaxy,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SceneKind::Morph => "Particle Cloud Morph",
            SceneKind::Aurora => "Layered Aurora Morph",
            SceneKind::Tunnel => "Tunnel Wave",
            SceneKind::Ribbon => "Aurora Ribbon",
            SceneKind::Galaxy => "Galaxy Spiral",
        }
    }

    /// Build a fresh scene of this kind
    pub fn create(self, params: &SceneParams) -> Box<dyn Scene> {
        match self {
            SceneKind::Morph => Box::new(MorphScene::new(params.morph.clone())),
            SceneKind::Aurora => Box::new(AuroraScene::new(&params.aurora)),
            SceneKind::Tunnel => Box::new(TunnelScene::new(params.tunnel.clone())),
            SceneKind::Ribbon => Box::new(RibbonScene::new(params.ribbon.clone())),
            SceneKind::Galaxy => Box::new(GalaxyScene::new(params.galaxy.clone())),
        }
    }
}

/// A visualization driven by one snapshot per display tick
pub trait Scene {
    fn kind(&self) -> SceneKind;

    /// Advance one tick and write this tick's geometry into `frame`
    ///
    /// `frame` arrives cleared. Must not panic for any snapshot length.
    fn update(&mut self, snapshot: &FrequencySnapshot, elapsed_s: f32, frame: &mut SceneFrame);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SessionId;
    use proptest::prelude::*;

    fn small_params() -> SceneParams {
        let mut params = SceneParams::default();
        params.morph.particle_count = 64;
        for layer in &mut params.aurora.layers {
            layer.particle_count = 32;
        }
        params.galaxy.particles_per_layer = 120;
        params
    }

    #[test]
    fn test_every_kind_builds_and_reports_itself() {
        let params = small_params();
        for kind in SceneKind::ALL {
            assert_eq!(kind.create(&params).kind(), kind);
        }
    }

    #[test]
    fn test_every_scene_handles_empty_snapshot() {
        let params = small_params();
        let empty = FrequencySnapshot::new(SessionId(1), 0);
        for kind in SceneKind::ALL {
            let mut scene = kind.create(&params);
            let mut frame = SceneFrame::default();
            scene.update(&empty, 0.5, &mut frame);
            assert!(frame.point_count() + frame.vertex_count() > 0, "{:?} drew nothing", kind);
            assert!(frame.positions().flatten().all(f32::is_finite));
        }
    }

    #[test]
    fn test_frame_clear_and_batches() {
        let mut frame = SceneFrame::default();
        frame.begin_points(SpriteKind::Soft, 2).push(PointVertex::zeroed());
        frame.strips.push(LineStrip::default());
        assert_eq!(frame.point_count(), 1);
        frame.clear();
        assert_eq!(frame, SceneFrame::default());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_scenes_never_panic_and_stay_finite(
            bins in proptest::collection::vec(any::<u8>(), 0..300),
            elapsed in 0.0f32..600.0,
            ticks in 1usize..4,
        ) {
            let params = small_params();
            let snapshot = FrequencySnapshot::from_bins(SessionId(9), bins);
            for kind in SceneKind::ALL {
                let mut scene = kind.create(&params);
                let mut frame = SceneFrame::default();
                for tick in 0..ticks {
                    frame.clear();
                    scene.update(&snapshot, elapsed + tick as f32 / 60.0, &mut frame);
                }
                prop_assert!(frame.positions().flatten().all(f32::is_finite));
            }
        }
    }
}
