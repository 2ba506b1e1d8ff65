//! Viewport lifecycle
//!
//! Ties the surface manager, camera rig, scene, texture source and render
//! loop together in construction order, and runs one tick per host frame.

use crate::camera::{CameraRig, PerspectiveCamera, PointerEvent};
use crate::capture::{FailureReporter, MediaConstraints, MediaDevices, PendingStream, TextureSource};
use crate::config::ViewportConfig;
use crate::error::{CaptureError, RenderError};
use crate::render::Renderer;
use crate::render_loop::RenderLoop;
use crate::scene::{NodeId, Scene, SceneComposer};
use crate::surface::{Host, SurfaceDescriptor, SurfaceManager};

/// One interactive 3D viewport
pub struct Viewport {
    config: ViewportConfig,
    surface: SurfaceManager,
    rig: CameraRig,
    composer: SceneComposer,
    scene: Scene,
    /// Node whose rotation follows the clock
    tracked: Option<NodeId>,
    texture_source: TextureSource,
    render_loop: RenderLoop,
}

impl Viewport {
    /// Build the viewport and start its render loop
    ///
    /// `devices` is only consulted when capture is enabled; passing `None`
    /// then counts as a host without the capture capability.
    pub fn new(
        config: ViewportConfig,
        host: &dyn Host,
        renderer: &mut dyn Renderer,
        devices: Option<&dyn MediaDevices>,
        reporter: Box<dyn FailureReporter>,
    ) -> Self {
        let mut surface = SurfaceManager::new();
        let initial = surface.describe(host);

        let mut rig = CameraRig::new(&config.camera, initial.aspect());

        let composer = SceneComposer::new(&config);
        let (scene, tracked) = composer.build_static_graph();

        if config.orbit.enabled {
            rig.attach_orbit_controls(&config.orbit);
        }

        let texture_source = if config.capture.enabled {
            let constraints = MediaConstraints::from(&config.capture);
            match devices {
                Some(devices) => TextureSource::acquire(devices, &constraints, reporter),
                None => TextureSource::acquire(&Unavailable, &constraints, reporter),
            }
        } else {
            TextureSource::disabled()
        };

        surface.apply_size(host, renderer, rig.camera_mut());

        let mut render_loop = RenderLoop::new(config.time_scale, config.animate);
        render_loop.start(host);

        log::info!("Viewport ready: {} variant", config.variant.name());

        Self {
            config,
            surface,
            rig,
            composer,
            scene,
            tracked,
            texture_source,
            render_loop,
        }
    }

    /// Re-read the container size and push it to renderer and camera
    pub fn handle_resize(&mut self, host: &dyn Host, renderer: &mut dyn Renderer) -> SurfaceDescriptor {
        self.surface.apply_size(host, renderer, self.rig.camera_mut())
    }

    pub fn handle_pointer(&mut self, event: PointerEvent, host: &dyn Host) {
        let (_, height) = self.surface.current_size(host);
        self.rig.handle_pointer(event, height);
    }

    /// One tick at host time `time` (milliseconds)
    ///
    /// The next frame is scheduled even when the draw fails, so a lost
    /// surface recovers once the caller re-applies the size.
    pub fn frame(
        &mut self,
        time: f64,
        host: &dyn Host,
        renderer: &mut dyn Renderer,
    ) -> Result<(), RenderError> {
        if let Some(texture) = self.texture_source.poll() {
            let id = self.composer.attach_camera_drawable(&mut self.scene, texture);
            self.tracked = Some(id);
        }

        self.rig.update();

        let result = renderer.render(&self.scene, self.rig.camera());
        if result.is_ok() {
            self.render_loop.record_frame(time);
        }

        self.render_loop.update(time, &mut self.scene, self.tracked);
        self.render_loop.schedule_next(host);
        result
    }

    /// Stop rescheduling frames
    pub fn stop(&mut self) {
        self.render_loop.stop();
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        self.rig.camera()
    }

    pub fn rig(&self) -> &CameraRig {
        &self.rig
    }

    pub fn tracked(&self) -> Option<NodeId> {
        self.tracked
    }

    pub fn texture_source(&self) -> &TextureSource {
        &self.texture_source
    }

    pub fn render_loop(&self) -> &RenderLoop {
        &self.render_loop
    }

    pub fn surface(&self) -> Option<SurfaceDescriptor> {
        self.surface.last_applied()
    }
}

/// Stand-in for a host with no capture backend at all
struct Unavailable;

impl MediaDevices for Unavailable {
    fn is_supported(&self) -> bool {
        false
    }

    fn get_user_media(&self, _constraints: &MediaConstraints) -> PendingStream {
        PendingStream::rejected(CaptureError::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::PointerButton;
    use crate::capture::tests::{test_texture, RecordingReporter, ScriptedDevices};
    use crate::capture::{LogReporter, SourceState};
    use crate::config::Variant;
    use crate::scene::NodeKind;
    use crate::surface::tests::{FakeHost, RecordingRenderer};

    fn viewport(
        variant: Variant,
        host: &FakeHost,
        renderer: &mut RecordingRenderer,
        devices: Option<&dyn MediaDevices>,
        reporter: &RecordingReporter,
    ) -> Viewport {
        Viewport::new(
            ViewportConfig::for_variant(variant),
            host,
            renderer,
            devices,
            Box::new(reporter.clone()),
        )
    }

    #[test]
    fn test_startup_aspect_and_first_draw() {
        let host = FakeHost::new(800, 600, 1.0);
        let mut renderer = RecordingRenderer::default();
        let devices = ScriptedDevices::new(true);
        let reporter = RecordingReporter::default();
        let mut viewport = viewport(Variant::Webcam, &host, &mut renderer, Some(&devices), &reporter);

        assert_eq!(viewport.camera().aspect(), 4.0 / 3.0);
        assert_eq!(renderer.size, (800, 600));
        assert_eq!(renderer.pixel_ratio, 1.0);
        assert_eq!(host.frame_requests.get(), 1);

        viewport.frame(16.0, &host, &mut renderer).unwrap();
        assert_eq!(renderer.draws, 1);
        assert_eq!(renderer.textured_per_draw.borrow()[0], 0);
        assert!(viewport.texture_source().is_pending());
        assert_eq!(host.frame_requests.get(), 2);
    }

    #[test]
    fn test_rejected_camera_keeps_rendering() {
        let host = FakeHost::new(800, 600, 1.0);
        let mut renderer = RecordingRenderer::default();
        let devices = ScriptedDevices::new(true);
        let reporter = RecordingReporter::default();
        let mut viewport = viewport(Variant::Webcam, &host, &mut renderer, Some(&devices), &reporter);

        devices.resolve(Err(CaptureError::AccessDenied("denied".to_string())));
        for t in [16.0, 33.0, 50.0] {
            viewport.frame(t, &host, &mut renderer).unwrap();
        }

        assert_eq!(renderer.draws, 3);
        assert!(renderer.textured_per_draw.borrow().iter().all(|&n| n == 0));
        assert_eq!(reporter.reports.borrow().len(), 1);
        assert_eq!(devices.requests.borrow().len(), 1);
        assert!(viewport.tracked().is_none());
    }

    #[test]
    fn test_resolved_camera_attached_within_one_tick() {
        let host = FakeHost::new(800, 600, 1.0);
        let mut renderer = RecordingRenderer::default();
        let devices = ScriptedDevices::new(true);
        let reporter = RecordingReporter::default();
        let mut viewport = viewport(Variant::Webcam, &host, &mut renderer, Some(&devices), &reporter);

        viewport.frame(16.0, &host, &mut renderer).unwrap();
        let texture = test_texture();
        devices.resolve(Ok(texture.clone()));
        viewport.frame(33.0, &host, &mut renderer).unwrap();
        viewport.frame(50.0, &host, &mut renderer).unwrap();

        assert_eq!(*renderer.textured_per_draw.borrow(), vec![0, 1, 1]);
        assert_eq!(viewport.scene().drawables_using(&texture), 1);
        assert!(matches!(viewport.texture_source().state(), SourceState::Resolved(_)));
        assert!(reporter.reports.borrow().is_empty());

        let tracked = viewport.tracked().unwrap();
        let node = viewport.scene().node(tracked).unwrap();
        assert!(matches!(&node.kind, NodeKind::Drawable { .. }));
    }

    #[test]
    fn test_resize_is_idempotent() {
        let host = FakeHost::new(800, 600, 1.0);
        let mut renderer = RecordingRenderer::default();
        let reporter = RecordingReporter::default();
        let mut viewport = viewport(Variant::Basic, &host, &mut renderer, None, &reporter);

        host.size.set((1024, 512));
        host.ratio.set(2.0);
        let first = viewport.handle_resize(&host, &mut renderer);
        let projection = viewport.camera().projection_matrix();
        let second = viewport.handle_resize(&host, &mut renderer);

        assert_eq!(first, second);
        assert_eq!(viewport.camera().projection_matrix(), projection);
        assert_eq!(viewport.camera().aspect(), 2.0);
        assert_eq!(renderer.size, (1024, 512));
        assert_eq!(renderer.pixel_ratio, 2.0);
    }

    #[test]
    fn test_missing_capture_capability_reports_once() {
        let host = FakeHost::new(800, 600, 1.0);
        let mut renderer = RecordingRenderer::default();
        let reporter = RecordingReporter::default();
        let mut viewport = viewport(Variant::Webcam, &host, &mut renderer, None, &reporter);

        viewport.frame(16.0, &host, &mut renderer).unwrap();
        viewport.frame(33.0, &host, &mut renderer).unwrap();

        let reports = reporter.reports.borrow();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].1, CaptureError::Unsupported);
        assert_eq!(renderer.draws, 2);
    }

    #[test]
    fn test_basic_variant_rotates_with_clock() {
        let host = FakeHost::new(800, 600, 1.0);
        let mut renderer = RecordingRenderer::default();
        let reporter = RecordingReporter::default();
        let mut viewport = viewport(Variant::Basic, &host, &mut renderer, None, &reporter);

        viewport.frame(2000.0, &host, &mut renderer).unwrap();
        let tracked = viewport.tracked().unwrap();
        let rotation = viewport.scene().node(tracked).unwrap().transform.rotation;
        let expected = viewport.render_loop().angle_at(2000.0);
        assert_eq!(rotation.x, expected);
        assert_eq!(rotation.y, expected);
        // Basic variant never asks for a camera
        assert!(matches!(viewport.texture_source().state(), SourceState::Disabled));
        assert!(reporter.reports.borrow().is_empty());
    }

    #[test]
    fn test_wireframe_variant_stays_still_and_orbits() {
        let host = FakeHost::new(800, 600, 1.0);
        let mut renderer = RecordingRenderer::default();
        let reporter = RecordingReporter::default();
        let mut viewport = viewport(Variant::Wireframe, &host, &mut renderer, None, &reporter);
        assert!(viewport.rig().controls().is_some());

        let before = viewport.camera().position();
        viewport.handle_pointer(
            PointerEvent::Down {
                button: PointerButton::Primary,
                x: 100.0,
                y: 100.0,
            },
            &host,
        );
        viewport.handle_pointer(PointerEvent::Move { x: 160.0, y: 100.0 }, &host);
        viewport.frame(1000.0, &host, &mut renderer).unwrap();

        assert_ne!(viewport.camera().position(), before);
        let tracked = viewport.tracked().unwrap();
        let rotation = viewport.scene().node(tracked).unwrap().transform.rotation;
        assert_eq!(rotation, glam::Vec3::ZERO);
    }

    #[test]
    fn test_failed_draw_still_reschedules() {
        let host = FakeHost::new(800, 600, 1.0);
        let mut renderer = RecordingRenderer::default();
        let mut viewport = Viewport::new(
            ViewportConfig::for_variant(Variant::Basic),
            &host,
            &mut renderer,
            None,
            Box::new(LogReporter),
        );

        renderer.fail_next = Some(RenderError::SurfaceLost);
        let result = viewport.frame(16.0, &host, &mut renderer);
        assert_eq!(result, Err(RenderError::SurfaceLost));
        assert_eq!(viewport.render_loop().frames(), 0);
        assert_eq!(host.frame_requests.get(), 2);

        viewport.stop();
        viewport.frame(33.0, &host, &mut renderer).unwrap();
        assert_eq!(viewport.render_loop().frames(), 1);
        assert_eq!(host.frame_requests.get(), 2);
    }
}
