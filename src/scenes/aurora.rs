//! Layered aurora: several morph layers composited additively.

use super::{MorphLayer, Scene, SceneFrame, SceneKind, SpriteKind};
use crate::audio::FrequencySnapshot;
use crate::params::AuroraParams;

pub struct AuroraScene {
    layers: Vec<MorphLayer>,
}

impl AuroraScene {
    pub fn new(params: &AuroraParams) -> Self {
        Self {
            layers: params.layers.iter().cloned().map(MorphLayer::new).collect(),
        }
    }

    pub fn layers(&self) -> &[MorphLayer] {
        &self.layers
    }
}

impl Scene for AuroraScene {
    fn kind(&self) -> SceneKind {
        SceneKind::Aurora
    }

    fn update(&mut self, snapshot: &FrequencySnapshot, elapsed_s: f32, frame: &mut SceneFrame) {
        for layer in &mut self.layers {
            layer.advance();
            let points = frame.begin_points(SpriteKind::Bokeh, layer.point_count());
            layer.emit(snapshot, elapsed_s, points);
        }
    }
}
