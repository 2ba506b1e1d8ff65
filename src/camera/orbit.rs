//! Orbit controls
//!
//! Moves the camera on a sphere around its target. Left-drag rotates, the
//! wheel dollies in and out. Angles follow the usual spherical convention:
//! `theta` is the azimuth around +Y, `phi` the polar angle from +Y.

use std::f32::consts::{PI, TAU};

use glam::Vec3;

use super::perspective::PerspectiveCamera;
use crate::config::OrbitConfig;

/// Keeps phi away from the poles so look-at never degenerates
const POLAR_EPSILON: f32 = 1e-4;
const MIN_DISTANCE: f32 = 0.1;
/// Dolly factor per wheel line at zoom speed 1
const ZOOM_STEP: f32 = 0.95;

/// Pointer and wheel input, in surface pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { button: PointerButton, x: f32, y: f32 },
    Move { x: f32, y: f32 },
    Up { button: PointerButton },
    /// Positive scrolls away from the user (zoom in)
    Wheel { delta: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// Spherical orbit controller bound to one camera
#[derive(Debug, Clone)]
pub struct OrbitControls {
    theta: f32,
    phi: f32,
    distance: f32,
    max_distance: f32,
    rotate_speed: f32,
    zoom_speed: f32,
    damping_factor: f32,

    // Motion not yet applied to the spherical state
    pending_theta: f32,
    pending_phi: f32,
    pending_scale: f32,

    dragging: bool,
    last_pointer: (f32, f32),
}

impl OrbitControls {
    /// Bind to a camera, deriving the initial spherical state from its position
    pub fn new(camera: &PerspectiveCamera, config: &OrbitConfig) -> Self {
        let offset = camera.position() - camera.target();
        let distance = offset.length().max(MIN_DISTANCE);
        let theta = offset.x.atan2(offset.z);
        let phi = (offset.y / distance).clamp(-1.0, 1.0).acos();

        Self {
            theta,
            phi: phi.clamp(POLAR_EPSILON, PI - POLAR_EPSILON),
            distance,
            max_distance: camera.far(),
            rotate_speed: config.rotate_speed,
            zoom_speed: config.zoom_speed,
            damping_factor: config.damping_factor.clamp(0.0, 1.0),
            pending_theta: 0.0,
            pending_phi: 0.0,
            pending_scale: 1.0,
            dragging: false,
            last_pointer: (0.0, 0.0),
        }
    }

    /// Feed one input event; `surface_height` is the current container height
    pub fn handle_pointer(&mut self, event: PointerEvent, surface_height: u32) {
        match event {
            PointerEvent::Down {
                button: PointerButton::Primary,
                x,
                y,
            } => {
                self.dragging = true;
                self.last_pointer = (x, y);
            }
            PointerEvent::Up {
                button: PointerButton::Primary,
            } => {
                self.dragging = false;
            }
            PointerEvent::Move { x, y } => {
                if self.dragging {
                    let delta = (x - self.last_pointer.0, y - self.last_pointer.1);
                    self.last_pointer = (x, y);
                    self.on_mouse_drag(delta, surface_height);
                }
            }
            PointerEvent::Wheel { delta } => self.on_scroll(delta),
            _ => {}
        }
    }

    /// Handle mouse drag for orbit
    pub fn on_mouse_drag(&mut self, delta: (f32, f32), surface_height: u32) {
        // A drag across the full height turns the camera all the way round
        let height = surface_height.max(1) as f32;
        self.pending_theta -= TAU * delta.0 / height * self.rotate_speed;
        self.pending_phi -= TAU * delta.1 / height * self.rotate_speed;
    }

    /// Handle scroll for zoom
    pub fn on_scroll(&mut self, delta: f32) {
        let step = ZOOM_STEP.powf(self.zoom_speed);
        self.pending_scale *= step.powf(delta);
    }

    /// Apply pending motion and reposition the camera; call once per tick
    pub fn update(&mut self, camera: &mut PerspectiveCamera) {
        let (fraction, keep) = if self.damping_factor > 0.0 {
            (self.damping_factor, 1.0 - self.damping_factor)
        } else {
            (1.0, 0.0)
        };

        self.theta = (self.theta + self.pending_theta * fraction) % TAU;
        self.phi = (self.phi + self.pending_phi * fraction).clamp(POLAR_EPSILON, PI - POLAR_EPSILON);
        self.distance = (self.distance * self.pending_scale.powf(fraction))
            .clamp(MIN_DISTANCE, self.max_distance);

        self.pending_theta *= keep;
        self.pending_phi *= keep;
        self.pending_scale = self.pending_scale.powf(keep);

        camera.set_position(camera.target() + self.offset());
    }

    /// Calculate camera offset from spherical coordinates
    fn offset(&self) -> Vec3 {
        let sin_phi = self.phi.sin();
        Vec3::new(
            self.distance * sin_phi * self.theta.sin(),
            self.distance * self.phi.cos(),
            self.distance * sin_phi * self.theta.cos(),
        )
    }

    pub fn theta(&self) -> f32 {
        self.theta
    }

    pub fn phi(&self) -> f32 {
        self.phi
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }
}
