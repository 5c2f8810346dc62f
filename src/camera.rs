//! Orbit camera around the scene origin.

use glam::{Mat4, Vec3};

use crate::params::RenderConfig;

/// Camera that circles the origin at its home height and distance
pub struct OrbitCamera {
    home: Vec3,
    orbit_speed: f32,
    /// Time the current orbit started (seconds)
    origin_s: f32,
}

impl OrbitCamera {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            home: Vec3::from_array(config.camera_home),
            orbit_speed: config.orbit_speed,
            origin_s: 0.0,
        }
    }

    /// Return to the home position, starting a fresh orbit at `time_s`
    pub fn reset(&mut self, time_s: f32) {
        self.origin_s = time_s;
    }

    /// Eye position at a point in time; the target is always the origin
    pub fn position(&self, time_s: f32) -> Vec3 {
        let angle = (time_s - self.origin_s).max(0.0) * self.orbit_speed;
        Mat4::from_rotation_y(angle).transform_point3(self.home)
    }

    pub fn view_matrix(&self, time_s: f32) -> Mat4 {
        Mat4::look_at_rh(self.position(time_s), Vec3::ZERO, Vec3::Y)
    }

    /// Create view-projection matrix for rendering
    ///
    /// # Returns
    /// Tuple of (view_proj_matrix, view_matrix)
    pub fn create_view_proj_matrix(
        &self,
        time_s: f32,
        aspect_ratio: f32,
        render_config: &RenderConfig,
    ) -> (Mat4, Mat4) {
        let view = self.view_matrix(time_s);
        let proj = Mat4::perspective_rh(
            render_config.fov_degrees.to_radians(),
            aspect_ratio,
            render_config.near_plane,
            render_config.far_plane,
        );

        (proj * view, view)
    }
}
