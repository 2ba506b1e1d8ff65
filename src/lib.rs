//! Cube Viewport - interactive 3D viewport demos
//!
//! One viewport lifecycle shared by three variants: a lit rotating cube, a
//! cube with a line outline under orbit controls, and a cube textured with a
//! live webcam feed.

pub mod app;
pub mod camera;
pub mod capture;
pub mod config;
pub mod error;
pub mod render;
pub mod render_loop;
pub mod scene;
pub mod surface;
pub mod viewport;

pub use app::ViewportApp;
pub use config::{Variant, ViewportConfig};
pub use viewport::Viewport;
