//! Frame scheduler: at most one scene is alive and fed per tick.

use tracing::{debug, info};

use super::{Scene, SceneFrame, SceneKind};
use crate::audio::FrequencySnapshot;
use crate::params::SceneParams;

pub struct FrameScheduler {
    params: SceneParams,
    selected: SceneKind,
    active: Option<Box<dyn Scene>>,
    frame: SceneFrame,
    ticks: u64,
}

impl FrameScheduler {
    pub fn new(params: SceneParams, selected: SceneKind) -> Self {
        Self {
            params,
            selected,
            active: None,
            frame: SceneFrame::default(),
            ticks: 0,
        }
    }

    pub fn selected(&self) -> SceneKind {
        self.selected
    }

    /// Kind of the scene currently receiving snapshots
    pub fn active(&self) -> Option<SceneKind> {
        self.active.as_ref().map(|s| s.kind())
    }

    /// Switch scenes; the old one is dropped immediately
    ///
    /// Returns true if the selection changed.
    pub fn select(&mut self, kind: SceneKind) -> bool {
        if kind == self.selected {
            return false;
        }
        info!("Scene: {}", kind.label());
        self.selected = kind;
        self.deactivate();
        true
    }

    /// Drive one display tick
    ///
    /// With a snapshot the selected scene is activated if needed and updated.
    /// Without one it is deactivated and the frame is left empty.
    pub fn tick(&mut self, snapshot: Option<&FrequencySnapshot>, elapsed_s: f32) -> &SceneFrame {
        self.frame.clear();
        let Some(snapshot) = snapshot else {
            self.deactivate();
            return &self.frame;
        };

        let scene = self.active.get_or_insert_with(|| {
            debug!("Activating {:?}", self.selected);
            self.selected.create(&self.params)
        });
        scene.update(snapshot, elapsed_s, &mut self.frame);

        self.ticks += 1;
        if self.ticks % 600 == 0 {
            debug!(
                "{:?}: {} points, {} line/mesh vertices",
                self.selected,
                self.frame.point_count(),
                self.frame.vertex_count()
            );
        }
        &self.frame
    }

    fn deactivate(&mut self) {
        if let Some(scene) = self.active.take() {
            debug!("Deactivating {:?}", scene.kind());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SessionId;

    fn params() -> SceneParams {
        let mut params = SceneParams::default();
        params.morph.particle_count = 16;
        for layer in &mut params.aurora.layers {
            layer.particle_count = 16;
        }
        params.galaxy.particles_per_layer = 32;
        params
    }

    #[test]
    fn test_snapshot_activates_selected_scene() {
        let mut scheduler = FrameScheduler::new(params(), SceneKind::Tunnel);
        assert_eq!(scheduler.active(), None);

        let snap = FrequencySnapshot::from_bins(SessionId(1), vec![30; 64]);
        let frame = scheduler.tick(Some(&snap), 0.1);
        assert_eq!(frame.strips.len(), 22);
        assert_eq!(scheduler.active(), Some(SceneKind::Tunnel));
    }

    #[test]
    fn test_missing_snapshot_deactivates() {
        let mut scheduler = FrameScheduler::new(params(), SceneKind::Ribbon);
        let snap = FrequencySnapshot::from_bins(SessionId(1), vec![30; 64]);
        scheduler.tick(Some(&snap), 0.1);
        let frame = scheduler.tick(None, 0.2);
        assert_eq!(frame, &SceneFrame::default());
        assert_eq!(scheduler.active(), None);
    }

    #[test]
    fn test_select_swaps_scene() {
        let mut scheduler = FrameScheduler::new(params(), SceneKind::Aurora);
        let snap = FrequencySnapshot::from_bins(SessionId(1), vec![30; 64]);
        scheduler.tick(Some(&snap), 0.1);

        assert!(!scheduler.select(SceneKind::Aurora));
        assert_eq!(scheduler.active(), Some(SceneKind::Aurora));

        assert!(scheduler.select(SceneKind::Galaxy));
        assert_eq!(scheduler.active(), None);
        let frame = scheduler.tick(Some(&snap), 0.2);
        assert_eq!(frame.points.len(), 4);
        assert_eq!(scheduler.active(), Some(SceneKind::Galaxy));
    }
}
