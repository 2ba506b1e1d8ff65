//! Surface manager
//!
//! Keeps renderer output size and camera aspect in lockstep with the host
//! container. Sizes are read live from the host on every call.

use crate::camera::PerspectiveCamera;
use crate::render::Renderer;

/// Host windowing collaborator
pub trait Host {
    /// Container size in logical pixels
    fn client_size(&self) -> (u32, u32);

    /// Device pixels per logical pixel
    fn pixel_ratio(&self) -> f64;

    /// Ask for one more frame callback when the host is ready
    fn request_frame(&self);
}

/// Container size and pixel density at one point in time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceDescriptor {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f64,
}

impl SurfaceDescriptor {
    /// Width over height; zero height gives inf or NaN and is passed through
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

/// Pushes host size into renderer and camera together
#[derive(Debug, Default)]
pub struct SurfaceManager {
    last_applied: Option<SurfaceDescriptor>,
}

impl SurfaceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read live container dimensions
    pub fn current_size(&self, host: &dyn Host) -> (u32, u32) {
        host.client_size()
    }

    /// Read the full descriptor from the host
    pub fn describe(&self, host: &dyn Host) -> SurfaceDescriptor {
        let (width, height) = self.current_size(host);
        SurfaceDescriptor {
            width,
            height,
            pixel_ratio: host.pixel_ratio(),
        }
    }

    /// Apply the host's current size to the renderer and the camera
    pub fn apply_size(
        &mut self,
        host: &dyn Host,
        renderer: &mut dyn Renderer,
        camera: &mut PerspectiveCamera,
    ) -> SurfaceDescriptor {
        let surface = self.describe(host);

        renderer.set_pixel_ratio(surface.pixel_ratio);
        renderer.set_size(surface.width, surface.height);
        camera.set_aspect(surface.aspect());
        camera.update_projection_matrix();

        if self.last_applied != Some(surface) {
            log::debug!(
                "Surface resized: {}x{} @{}x",
                surface.width,
                surface.height,
                surface.pixel_ratio
            );
        }
        self.last_applied = Some(surface);
        surface
    }

    /// Descriptor from the most recent `apply_size`
    pub fn last_applied(&self) -> Option<SurfaceDescriptor> {
        self.last_applied
    }
}
