//! Camera rig
//!
//! Owns the perspective camera and, when enabled, the orbit controller bound
//! to it and to the host's pointer input.

pub mod orbit;
pub mod perspective;

pub use orbit::{OrbitControls, PointerButton, PointerEvent};
pub use perspective::PerspectiveCamera;

use crate::config::{CameraConfig, OrbitConfig};

/// Camera plus optional orbit controls
pub struct CameraRig {
    camera: PerspectiveCamera,
    controls: Option<OrbitControls>,
}

impl CameraRig {
    /// Create the camera with a provisional aspect; the surface manager sets the real one
    pub fn new(config: &CameraConfig, aspect: f32) -> Self {
        Self {
            camera: PerspectiveCamera::from_config(config, aspect),
            controls: None,
        }
    }

    /// Instantiate the orbit controller once, bound to this camera
    pub fn attach_orbit_controls(&mut self, config: &OrbitConfig) {
        if self.controls.is_none() {
            self.controls = Some(OrbitControls::new(&self.camera, config));
            log::info!("Orbit controls attached");
        }
    }

    /// Forward pointer input to the orbit controller, if any
    pub fn handle_pointer(&mut self, event: PointerEvent, surface_height: u32) {
        if let Some(controls) = &mut self.controls {
            controls.handle_pointer(event, surface_height);
        }
    }

    /// Apply pending orbit motion to the camera
    pub fn update(&mut self) {
        if let Some(controls) = &mut self.controls {
            controls.update(&mut self.camera);
        }
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    /// Read/write target for the surface manager's aspect updates
    pub fn camera_mut(&mut self) -> &mut PerspectiveCamera {
        &mut self.camera
    }

    pub fn controls(&self) -> Option<&OrbitControls> {
        self.controls.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_without_controls_is_ignored() {
        let mut rig = CameraRig::new(&CameraConfig::default(), 1.0);
        rig.handle_pointer(PointerEvent::Down { button: PointerButton::Primary, x: 0.0, y: 0.0 }, 100);
        rig.handle_pointer(PointerEvent::Move { x: 50.0, y: 0.0 }, 100);
        rig.update();
        assert!(rig.controls().is_none());
        assert_eq!(rig.camera().position(), glam::Vec3::new(0.0, 0.0, 2.0));
    }

    #[test]
    fn test_controls_attach_once() {
        let mut rig = CameraRig::new(&CameraConfig::default(), 1.0);
        rig.attach_orbit_controls(&OrbitConfig::default());
        rig.handle_pointer(PointerEvent::Wheel { delta: 2.0 }, 100);
        // A second attach must not discard pending input
        rig.attach_orbit_controls(&OrbitConfig::default());
        rig.update();
        assert!(rig.camera().position().z < 2.0);
    }
}
