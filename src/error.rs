//! Error types shared across the viewport
//!
//! Every failure here is local to one feature path. None of them stop the
//! render loop on their own.

use std::path::PathBuf;

/// Failure to acquire or keep a live camera stream
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CaptureError {
    /// The host has no camera capture backend at all
    #[error("media capture is not supported on this host")]
    Unsupported,
    /// The user or OS refused access to the device
    #[error("camera access denied: {0}")]
    AccessDenied(String),
    /// The device exists but could not be opened or streamed
    #[error("camera device failure: {0}")]
    Device(String),
    /// The acquisition worker went away without answering
    #[error("camera acquisition worker disconnected")]
    Disconnected,
}

/// Failure of a single draw call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("surface lost or outdated")]
    SurfaceLost,
    #[error("out of GPU memory")]
    OutOfMemory,
    #[error("timed out acquiring the next surface texture")]
    Timeout,
    #[error("render failed: {0}")]
    Other(String),
}

impl From<wgpu::SurfaceError> for RenderError {
    fn from(err: wgpu::SurfaceError) -> Self {
        match err {
            wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => RenderError::SurfaceLost,
            wgpu::SurfaceError::OutOfMemory => RenderError::OutOfMemory,
            wgpu::SurfaceError::Timeout => RenderError::Timeout,
            other => RenderError::Other(other.to_string()),
        }
    }
}

/// Failure to load a viewport configuration file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unknown viewport variant '{0}' (expected basic, wireframe or webcam)")]
    UnknownVariant(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_error_mapping() {
        assert_eq!(RenderError::from(wgpu::SurfaceError::Lost), RenderError::SurfaceLost);
        assert_eq!(RenderError::from(wgpu::SurfaceError::Outdated), RenderError::SurfaceLost);
        assert_eq!(RenderError::from(wgpu::SurfaceError::OutOfMemory), RenderError::OutOfMemory);
        assert_eq!(RenderError::from(wgpu::SurfaceError::Timeout), RenderError::Timeout);
    }

    #[test]
    fn test_capture_error_message_keeps_cause() {
        let err = CaptureError::AccessDenied("permission denied".to_string());
        assert_eq!(err.to_string(), "camera access denied: permission denied");
    }
}
