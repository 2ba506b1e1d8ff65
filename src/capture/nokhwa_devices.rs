//! Camera capture using the nokhwa crate
//!
//! The camera is opened on a background thread. Opening resolves the pending
//! stream; the same thread then keeps decoding frames into the feed until the
//! last texture handle is dropped.

use std::sync::{Arc, Weak};
use std::time::Duration;

use nokhwa::pixel_format::RgbAFormat;
use nokhwa::utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType, Resolution};
use nokhwa::Camera;

use super::{MediaConstraints, MediaDevices, PendingStream, StreamResolver, VideoFeed, VideoTexture};
use crate::error::CaptureError;

/// Information about an available camera
#[derive(Clone, Debug)]
pub struct CameraInfo {
    pub index: u32,
    pub name: String,
}

/// Native camera backend for the current platform
#[derive(Debug, Default, Clone, Copy)]
pub struct NokhwaDevices;

impl NokhwaDevices {
    pub fn new() -> Self {
        Self
    }

    /// List available cameras
    pub fn list_cameras() -> Vec<CameraInfo> {
        match nokhwa::query(ApiBackend::Auto) {
            Ok(camera_list) => camera_list
                .iter()
                .enumerate()
                .map(|(idx, info)| CameraInfo {
                    index: idx as u32,
                    name: info.human_name().to_string(),
                })
                .collect(),
            Err(e) => {
                log::warn!("Failed to enumerate cameras: {:?}", e);
                Vec::new()
            }
        }
    }
}

impl MediaDevices for NokhwaDevices {
    fn is_supported(&self) -> bool {
        nokhwa::native_api_backend().is_some()
    }

    fn get_user_media(&self, constraints: &MediaConstraints) -> PendingStream {
        let (resolver, pending) = PendingStream::channel();
        let constraints = *constraints;

        let spawned = std::thread::Builder::new()
            .name("camera-capture".to_string())
            .spawn(move || capture_thread(constraints, resolver));

        match spawned {
            Ok(_) => pending,
            Err(e) => PendingStream::rejected(CaptureError::Device(format!(
                "failed to spawn capture thread: {}",
                e
            ))),
        }
    }
}

/// Open the camera, try the resolution hint first and fall back to any format
fn open_camera(constraints: &MediaConstraints) -> Result<Camera, CaptureError> {
    let index = CameraIndex::Index(constraints.device_index);
    let hinted = RequestedFormat::new::<RgbAFormat>(RequestedFormatType::HighestResolution(
        Resolution::new(constraints.width, constraints.height),
    ));

    match Camera::new(index.clone(), hinted) {
        Ok(camera) => Ok(camera),
        Err(e) => {
            log::warn!(
                "Failed to open camera at {}x{}: {:?}",
                constraints.width,
                constraints.height,
                e
            );
            let any = RequestedFormat::new::<RgbAFormat>(RequestedFormatType::None);
            Camera::new(index, any).map_err(|e| classify(e.to_string()))
        }
    }
}

/// Backends report permission problems only through their message text
fn classify(message: String) -> CaptureError {
    let lower = message.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("not authorized") {
        CaptureError::AccessDenied(message)
    } else {
        CaptureError::Device(message)
    }
}

fn capture_thread(constraints: MediaConstraints, resolver: StreamResolver) {
    log::info!("Starting camera capture thread (camera {})", constraints.device_index);

    let mut camera = match open_camera(&constraints) {
        Ok(camera) => camera,
        Err(e) => {
            resolver.resolve(Err(e));
            return;
        }
    };

    if let Err(e) = camera.open_stream() {
        resolver.resolve(Err(classify(e.to_string())));
        return;
    }

    let resolution = camera.resolution();
    log::info!(
        "Camera opened: {} ({}x{})",
        camera.info().human_name(),
        resolution.width(),
        resolution.height()
    );

    let feed = Arc::new(VideoFeed::default());
    let weak = Arc::downgrade(&feed);
    resolver.resolve(Ok(VideoTexture::new(feed, resolution.width(), resolution.height())));

    pump_frames(&mut camera, &weak);

    if let Err(e) = camera.stop_stream() {
        log::warn!("Failed to stop camera stream: {:?}", e);
    }
    log::info!("Camera capture thread stopped");
}

/// Decode frames into the feed while any texture handle is alive
fn pump_frames(camera: &mut Camera, feed: &Weak<VideoFeed>) {
    while let Some(feed) = feed.upgrade() {
        match camera.frame() {
            Ok(frame) => match frame.decode_image::<RgbAFormat>() {
                Ok(image) => {
                    let (width, height) = (image.width(), image.height());
                    feed.publish(image.into_raw(), width, height);
                }
                Err(e) => {
                    log::warn!("Failed to decode frame: {:?}", e);
                }
            },
            Err(e) => {
                log::warn!("Failed to capture frame: {:?}", e);
                drop(feed);
                std::thread::sleep(Duration::from_millis(10));
            }
        }
    }
}
