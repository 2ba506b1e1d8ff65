//! Live camera texture source
//!
//! A camera stream is requested once. The request resolves on a background
//! thread and is picked up by the control thread with a non-blocking poll.
//! Once resolved, frames keep arriving in a shared latest-frame slot that the
//! renderer samples at draw time.

pub mod nokhwa_devices;

pub use nokhwa_devices::NokhwaDevices;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use parking_lot::Mutex;

use crate::config::CaptureConfig;
use crate::error::CaptureError;

/// One decoded RGBA frame
#[derive(Debug)]
pub struct VideoFrame {
    /// RGBA pixel data
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Starts at 1 and increases with every published frame
    pub frame_number: u64,
}

/// Latest-frame slot written by a producer thread and read at draw time
#[derive(Default)]
pub struct VideoFeed {
    /// Triple buffered so the writer never waits on a reader
    slots: [Mutex<Option<Arc<VideoFrame>>>; 3],
    /// Index of the latest complete frame
    latest: AtomicU64,
    frame_count: AtomicU64,
}

impl VideoFeed {
    /// Publish a new frame; returns its frame number
    pub fn publish(&self, data: Vec<u8>, width: u32, height: u32) -> u64 {
        let frame_number = self.frame_count.fetch_add(1, Ordering::AcqRel) + 1;
        let slot = (frame_number % 3) as usize;
        *self.slots[slot].lock() = Some(Arc::new(VideoFrame {
            data,
            width,
            height,
            frame_number,
        }));
        self.latest.store(frame_number, Ordering::Release);
        frame_number
    }

    /// Get the latest published frame
    pub fn latest_frame(&self) -> Option<Arc<VideoFrame>> {
        let idx = self.latest.load(Ordering::Acquire);
        if idx == 0 {
            return None;
        }
        self.slots[(idx % 3) as usize].lock().clone()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count.load(Ordering::Relaxed)
    }
}

/// Handle to a continuously updating pixel source
///
/// Cloning shares the feed. When the last handle is dropped the producer
/// notices and stops.
#[derive(Clone)]
pub struct VideoTexture {
    feed: Arc<VideoFeed>,
    width: u32,
    height: u32,
}

impl VideoTexture {
    /// Wrap a feed with the resolution the device actually negotiated
    pub fn new(feed: Arc<VideoFeed>, width: u32, height: u32) -> Self {
        Self { feed, width, height }
    }

    pub fn latest_frame(&self) -> Option<Arc<VideoFrame>> {
        self.feed.latest_frame()
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Whether both handles read from the same feed
    pub fn same_feed(&self, other: &VideoTexture) -> bool {
        Arc::ptr_eq(&self.feed, &other.feed)
    }

    /// Stable identity for caching GPU resources per feed
    pub fn feed_id(&self) -> usize {
        Arc::as_ptr(&self.feed) as usize
    }
}

impl fmt::Debug for VideoTexture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoTexture")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("frames", &self.feed.frame_count())
            .finish()
    }
}

/// Parameters of a stream request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaConstraints {
    pub device_index: u32,
    /// Resolution hint
    pub width: u32,
    pub height: u32,
}

impl From<&CaptureConfig> for MediaConstraints {
    fn from(config: &CaptureConfig) -> Self {
        Self {
            device_index: config.device_index,
            width: config.width,
            height: config.height,
        }
    }
}

/// Answer to a stream request, delivered exactly once
pub type StreamResult = Result<VideoTexture, CaptureError>;

/// Producer side of a [`PendingStream`]
pub struct StreamResolver {
    tx: Sender<StreamResult>,
}

impl StreamResolver {
    /// Deliver the answer; consumes the resolver so it can only happen once
    pub fn resolve(self, result: StreamResult) {
        // The viewport may already be gone; nothing to do then
        let _ = self.tx.send(result);
    }
}

/// Consumer side of a stream request
pub struct PendingStream {
    rx: Receiver<StreamResult>,
}

impl PendingStream {
    /// Linked resolver/pending pair
    pub fn channel() -> (StreamResolver, PendingStream) {
        let (tx, rx) = crossbeam_channel::bounded(1);
        (StreamResolver { tx }, PendingStream { rx })
    }

    /// A request that has already failed
    pub fn rejected(err: CaptureError) -> Self {
        let (resolver, pending) = Self::channel();
        resolver.resolve(Err(err));
        pending
    }

    /// Non-blocking check; `None` while still pending
    pub fn poll(&self) -> Option<StreamResult> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(CaptureError::Disconnected)),
        }
    }
}

/// Host media capture capability
pub trait MediaDevices {
    /// Whether the host has any capture backend
    fn is_supported(&self) -> bool;

    /// Start an asynchronous stream request
    fn get_user_media(&self, constraints: &MediaConstraints) -> PendingStream;
}

/// Observability sink for capture failures
pub trait FailureReporter {
    fn report(&self, message: &str, cause: &CaptureError);
}

/// Reports failures through the log facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl FailureReporter for LogReporter {
    fn report(&self, message: &str, cause: &CaptureError) {
        log::error!("{}: {}", message, cause);
    }
}

/// Where the one acquisition attempt stands
#[derive(Debug)]
pub enum SourceState {
    /// This viewport never asked for a stream
    Disabled,
    Pending,
    Resolved(VideoTexture),
    Failed(CaptureError),
}

/// Texture source: one acquisition per viewport, no retry
pub struct TextureSource {
    pending: Option<PendingStream>,
    state: SourceState,
    reporter: Box<dyn FailureReporter>,
}

impl TextureSource {
    /// A source that never acquires anything
    pub fn disabled() -> Self {
        Self {
            pending: None,
            state: SourceState::Disabled,
            reporter: Box::new(LogReporter),
        }
    }

    /// Request the stream; capability problems are reported immediately
    pub fn acquire(
        devices: &dyn MediaDevices,
        constraints: &MediaConstraints,
        reporter: Box<dyn FailureReporter>,
    ) -> Self {
        if !devices.is_supported() {
            let err = CaptureError::Unsupported;
            reporter.report("Media capture interface unavailable", &err);
            return Self {
                pending: None,
                state: SourceState::Failed(err),
                reporter,
            };
        }

        log::info!(
            "Requesting camera {} ({}x{})",
            constraints.device_index,
            constraints.width,
            constraints.height
        );

        Self {
            pending: Some(devices.get_user_media(constraints)),
            state: SourceState::Pending,
            reporter,
        }
    }

    /// Check the pending request; returns the texture exactly once, on the tick it resolves
    pub fn poll(&mut self) -> Option<VideoTexture> {
        let result = self.pending.as_ref()?.poll()?;
        self.pending = None;

        match result {
            Ok(texture) => {
                let (width, height) = texture.resolution();
                log::info!("Camera stream ready: {}x{}", width, height);
                self.state = SourceState::Resolved(texture.clone());
                Some(texture)
            }
            Err(err) => {
                self.reporter.report("Cannot access the camera", &err);
                self.state = SourceState::Failed(err);
                None
            }
        }
    }

    pub fn state(&self) -> &SourceState {
        &self.state
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, SourceState::Pending)
    }
}
