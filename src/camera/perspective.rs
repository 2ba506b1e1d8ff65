//! Perspective camera
//!
//! Aspect ratio is written only through [`PerspectiveCamera::set_aspect`] by
//! the surface manager, followed by [`PerspectiveCamera::update_projection_matrix`].

use glam::{Mat4, Vec3};

use crate::config::CameraConfig;

/// Perspective camera looking at a fixed target
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCamera {
    /// Vertical field of view in degrees
    fov_degrees: f32,
    /// Width / height of the surface at the last resize
    aspect: f32,
    near: f32,
    far: f32,
    position: Vec3,
    target: Vec3,
    /// Committed projection, stale until `update_projection_matrix`
    projection: Mat4,
}

impl PerspectiveCamera {
    pub fn new(fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            fov_degrees,
            aspect,
            near,
            far,
            position: Vec3::ZERO,
            target: Vec3::ZERO,
            projection: Mat4::IDENTITY,
        };
        camera.update_projection_matrix();
        camera
    }

    /// Build from config; position is applied once here and never reset
    pub fn from_config(config: &CameraConfig, aspect: f32) -> Self {
        let mut camera = Self::new(config.fov_degrees, aspect, config.near, config.far);
        camera.position = Vec3::from_array(config.position);
        camera
    }

    pub fn fov_degrees(&self) -> f32 {
        self.fov_degrees
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    /// Update aspect ratio on resize
    pub fn set_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    /// Moved only by the orbit controller
    pub(crate) fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Recompute the projection from fov, aspect and clip planes
    pub fn update_projection_matrix(&mut self) {
        self.projection = Mat4::perspective_rh(
            self.fov_degrees.to_radians(),
            self.aspect,
            self.near,
            self.far,
        );
    }

    /// Get the projection matrix
    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    /// Get the view matrix
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    /// Get combined view-projection matrix
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection * self.view_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config() {
        let camera = PerspectiveCamera::from_config(&CameraConfig::default(), 1.0);
        assert_eq!(camera.fov_degrees(), 75.0);
        assert_eq!(camera.position(), Vec3::new(0.0, 0.0, 2.0));
        assert_eq!(camera.target(), Vec3::ZERO);
    }

    #[test]
    fn test_projection_is_committed_explicitly() {
        let mut camera = PerspectiveCamera::new(75.0, 1.0, 0.1, 100.0);
        let before = camera.projection_matrix();

        camera.set_aspect(2.0);
        assert_eq!(camera.projection_matrix(), before);

        camera.update_projection_matrix();
        let expected = Mat4::perspective_rh(75f32.to_radians(), 2.0, 0.1, 100.0);
        assert_eq!(camera.projection_matrix(), expected);
    }

    #[test]
    fn test_origin_projects_to_center() {
        let camera = PerspectiveCamera::from_config(&CameraConfig::default(), 4.0 / 3.0);
        let clip = camera.view_projection_matrix().project_point3(Vec3::ZERO);
        assert!(clip.x.abs() < 1e-6);
        assert!(clip.y.abs() < 1e-6);
    }
}
