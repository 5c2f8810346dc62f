//! Rendering and camera configuration.

use serde::Deserialize;

/// Rendering configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Window width (pixels)
    pub window_width: u32,

    /// Window height (pixels)
    pub window_height: u32,

    /// Vertical field of view (degrees)
    pub fov_degrees: f32,

    /// Near clipping plane (world units)
    pub near_plane: f32,

    /// Far clipping plane (world units)
    pub far_plane: f32,

    /// Camera position restored whenever the scene changes
    pub camera_home: [f32; 3],

    /// Slow automatic orbit around the Y axis (radians per second, 0 = off)
    pub orbit_speed: f32,

    /// Point sprite size in pixels per unit of scene point size
    pub point_pixel_scale: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            window_width: 1280,
            window_height: 720,
            fov_degrees: 60.0,
            near_plane: 0.1,
            far_plane: 200.0,
            camera_home: [0.0, 2.0, 8.0],
            orbit_speed: 0.05,
            point_pixel_scale: 1.0,
        }
    }
}

impl RenderConfig {
    pub fn aspect_ratio(&self) -> f32 {
        self.window_width as f32 / self.window_height.max(1) as f32
    }
}
