//! Rendering seam
//!
//! The viewport talks to the GPU only through [`Renderer`], so the loop and
//! the surface bookkeeping can run against an in-memory renderer in tests.

pub mod gpu;

pub use gpu::GpuRenderer;

use crate::camera::PerspectiveCamera;
use crate::error::RenderError;
use crate::scene::Scene;

/// Drawing surface plus the draw call
pub trait Renderer {
    /// Device pixels per logical pixel
    fn set_pixel_ratio(&mut self, ratio: f64);

    /// Output size in logical pixels
    fn set_size(&mut self, width: u32, height: u32);

    /// Draw the scene as seen by the camera
    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), RenderError>;
}
