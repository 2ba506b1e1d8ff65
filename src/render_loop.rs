//! Render loop state machine
//!
//! `Idle` until started, then `Running` for the rest of the viewport's life.
//! Each frame ends by asking the host for the next one, unless a stop was
//! requested.

use glam::Vec3;

use crate::scene::{NodeId, Scene};
use crate::surface::Host;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
}

/// Frame scheduling plus the time-driven update
#[derive(Debug)]
pub struct RenderLoop {
    state: LoopState,
    stop_requested: bool,
    /// Applied to the millisecond frame clock
    time_scale: f64,
    animate: bool,
    frames: u64,
    last_time: Option<f64>,
}

impl RenderLoop {
    pub fn new(time_scale: f64, animate: bool) -> Self {
        Self {
            state: LoopState::Idle,
            stop_requested: false,
            time_scale,
            animate,
            frames: 0,
            last_time: None,
        }
    }

    /// Idle -> Running, scheduling the first frame; later calls do nothing
    pub fn start(&mut self, host: &dyn Host) {
        if self.state == LoopState::Idle {
            self.state = LoopState::Running;
            log::info!("Render loop started");
            host.request_frame();
        }
    }

    /// Stop rescheduling after the current frame
    pub fn stop(&mut self) {
        self.stop_requested = true;
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    /// Count one draw at host time `time`
    pub fn record_frame(&mut self, time: f64) {
        self.frames += 1;
        self.last_time = Some(time);
    }

    /// Request the next frame unless stopped
    pub fn schedule_next(&mut self, host: &dyn Host) {
        if self.is_running() && !self.stop_requested {
            host.request_frame();
        }
    }

    /// Rotation angle for host time `time`
    pub fn angle_at(&self, time: f64) -> f32 {
        (time * self.time_scale) as f32
    }

    /// Set time-driven properties from absolute time; missing handles are skipped
    pub fn update(&self, time: f64, scene: &mut Scene, tracked: Option<NodeId>) {
        if !self.animate {
            return;
        }
        let Some(node) = tracked.and_then(|id| scene.node_mut(id)) else {
            return;
        };

        let angle = self.angle_at(time);
        node.transform.rotation = Vec3::new(angle, angle, node.transform.rotation.z);
    }

    pub fn set_animate(&mut self, animate: bool) {
        self.animate = animate;
    }

    pub fn animate(&self) -> bool {
        self.animate
    }

    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    /// Frames drawn so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn last_time(&self) -> Option<f64> {
        self.last_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Color, Geometry, Material, PhongMaterial};
    use crate::surface::tests::FakeHost;
    use std::sync::Arc;

    fn scene_with_cube() -> (Scene, NodeId) {
        let mut scene = Scene::new();
        let id = scene.attach_drawable(
            Arc::new(Geometry::cuboid(1.0, 1.0, 1.0, [1, 1, 1])),
            Material::Phong(PhongMaterial::with_color(Color::WHITE)),
        );
        (scene, id)
    }

    fn rotation(scene: &Scene, id: NodeId) -> Vec3 {
        scene.node(id).unwrap().transform.rotation
    }

    #[test]
    fn test_start_schedules_once() {
        let host = FakeHost::new(800, 600, 1.0);
        let mut render_loop = RenderLoop::new(0.0001, true);
        assert_eq!(render_loop.state(), LoopState::Idle);

        render_loop.start(&host);
        render_loop.start(&host);
        assert_eq!(render_loop.state(), LoopState::Running);
        assert_eq!(host.frame_requests.get(), 1);
    }

    #[test]
    fn test_idle_loop_does_not_reschedule() {
        let host = FakeHost::new(800, 600, 1.0);
        let mut render_loop = RenderLoop::new(0.0001, true);
        render_loop.schedule_next(&host);
        assert_eq!(host.frame_requests.get(), 0);
    }

    #[test]
    fn test_stop_flag_halts_rescheduling() {
        let host = FakeHost::new(800, 600, 1.0);
        let mut render_loop = RenderLoop::new(0.0001, true);
        render_loop.start(&host);
        render_loop.schedule_next(&host);
        render_loop.stop();
        render_loop.schedule_next(&host);
        assert_eq!(host.frame_requests.get(), 2);
    }

    #[test]
    fn test_angle_is_pure_function_of_time() {
        let render_loop = RenderLoop::new(0.0001, true);
        let (mut scene, id) = scene_with_cube();

        render_loop.update(5000.0, &mut scene, Some(id));
        let at_t2 = rotation(&scene, id);
        render_loop.update(1000.0, &mut scene, Some(id));
        let at_t1 = rotation(&scene, id);
        render_loop.update(1000.0, &mut scene, Some(id));
        let at_t1_again = rotation(&scene, id);

        assert_eq!(at_t2.x, (5000.0 * 0.0001) as f32);
        assert_eq!(at_t1.x, (1000.0 * 0.0001) as f32);
        assert_eq!(at_t1.y, at_t1.x);
        assert_eq!(at_t1, at_t1_again);
    }

    #[test]
    fn test_variable_tick_spacing() {
        let render_loop = RenderLoop::new(0.0005, true);
        let (mut scene, id) = scene_with_cube();
        for t in [0.0, 16.0, 17.5, 250.0, 251.0, 10_000.0] {
            render_loop.update(t, &mut scene, Some(id));
            assert_eq!(rotation(&scene, id).y, render_loop.angle_at(t));
        }
    }

    #[test]
    fn test_missing_handle_is_noop() {
        let render_loop = RenderLoop::new(0.0001, true);
        let (mut scene, id) = scene_with_cube();
        render_loop.update(1000.0, &mut scene, None);
        assert_eq!(rotation(&scene, id), Vec3::ZERO);
    }

    #[test]
    fn test_animation_disabled_leaves_model_static() {
        let mut render_loop = RenderLoop::new(0.0005, false);
        let (mut scene, id) = scene_with_cube();
        render_loop.update(1000.0, &mut scene, Some(id));
        assert_eq!(rotation(&scene, id), Vec3::ZERO);

        render_loop.set_animate(true);
        render_loop.update(1000.0, &mut scene, Some(id));
        assert_eq!(rotation(&scene, id).x, render_loop.angle_at(1000.0));
        assert!((rotation(&scene, id).x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_frame_accounting() {
        let mut render_loop = RenderLoop::new(0.0001, true);
        render_loop.record_frame(16.0);
        render_loop.record_frame(33.0);
        assert_eq!(render_loop.frames(), 2);
        assert_eq!(render_loop.last_time(), Some(33.0));
    }
}
