//! Viewport configuration
//!
//! Each demo variant has a preset. A JSON file can override any field; fields
//! missing from the file keep the preset value of the selected variant.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Which demo scene to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// A single lit cube spinning on two axes
    #[default]
    Basic,
    /// A subdivided cube with a yellow edge outline, orbitable
    Wireframe,
    /// A cube painted with the live webcam feed, orbitable
    Webcam,
}

impl Variant {
    /// Name used on the command line and in config files
    pub fn name(&self) -> &'static str {
        match self {
            Variant::Basic => "basic",
            Variant::Wireframe => "wireframe",
            Variant::Webcam => "webcam",
        }
    }

    /// Get all variants for iteration
    pub fn all() -> &'static [Variant] {
        &[Variant::Basic, Variant::Wireframe, Variant::Webcam]
    }
}

impl FromStr for Variant {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Variant::all()
            .iter()
            .copied()
            .find(|v| v.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigError::UnknownVariant(s.to_string()))
    }
}

/// Perspective camera parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Vertical field of view in degrees
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Initial position, set once at startup
    pub position: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            near: 0.1,
            far: 100.0,
            position: [0.0, 0.0, 2.0],
        }
    }
}

/// Directional light aimed at the origin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightConfig {
    /// 0xRRGGBB
    pub color: u32,
    pub intensity: f32,
    pub position: [f32; 3],
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            color: 0xffffff,
            intensity: 1.0,
            position: [-1.0, 2.0, 4.0],
        }
    }
}

/// Shape and paint of the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Box width, height, depth
    pub size: [f32; 3],
    /// Segments along width, height, depth
    pub segments: [u32; 3],
    /// Fill color (ignored when the fill is camera-textured)
    pub fill_color: u32,
    /// Edge outline color; no outline when absent
    pub outline_color: Option<u32>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            size: [1.0, 1.0, 1.0],
            segments: [1, 1, 1],
            fill_color: 0x044a88,
            outline_color: None,
        }
    }
}

/// Orbit controller tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrbitConfig {
    pub enabled: bool,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    /// 0 disables damping; otherwise the fraction of motion applied per tick
    pub damping_factor: f32,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            damping_factor: 0.0,
        }
    }
}

/// Live camera acquisition request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub enabled: bool,
    pub device_index: u32,
    /// Resolution hint; the device may pick something else
    pub width: u32,
    pub height: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            device_index: 0,
            width: 1280,
            height: 720,
        }
    }
}

/// Complete viewport configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub variant: Variant,
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    /// Multisampled rendering
    pub antialias: bool,
    /// 0xRRGGBB
    pub clear_color: u32,
    pub camera: CameraConfig,
    pub light: LightConfig,
    pub model: ModelConfig,
    pub orbit: OrbitConfig,
    pub capture: CaptureConfig,
    /// Factor applied to the millisecond frame clock before it drives rotation
    pub time_scale: f64,
    /// Whether the tracked model rotates with time
    pub animate: bool,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self::for_variant(Variant::default())
    }
}

impl ViewportConfig {
    /// Preset for one demo variant
    pub fn for_variant(variant: Variant) -> Self {
        let base = Self {
            variant,
            window_title: format!("Cube Viewport ({})", variant.name()),
            window_width: 1280,
            window_height: 720,
            antialias: true,
            clear_color: 0x000000,
            camera: CameraConfig::default(),
            light: LightConfig::default(),
            model: ModelConfig::default(),
            orbit: OrbitConfig::default(),
            capture: CaptureConfig::default(),
            time_scale: 0.0001,
            animate: true,
        };

        match variant {
            Variant::Basic => base,
            Variant::Wireframe => Self {
                model: ModelConfig {
                    segments: [2, 2, 2],
                    fill_color: 0x515151,
                    outline_color: Some(0xffff00),
                    ..ModelConfig::default()
                },
                orbit: OrbitConfig {
                    enabled: true,
                    ..OrbitConfig::default()
                },
                time_scale: 0.0005,
                animate: false,
                ..base
            },
            Variant::Webcam => Self {
                orbit: OrbitConfig {
                    enabled: true,
                    ..OrbitConfig::default()
                },
                capture: CaptureConfig {
                    enabled: true,
                    ..CaptureConfig::default()
                },
                time_scale: 0.0005,
                animate: false,
                ..base
            },
        }
    }

    /// Parse a JSON document, filling gaps from the preset of the variant it names
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let variant = match value.get("variant") {
            Some(v) => Variant::deserialize(v)?,
            None => Variant::default(),
        };

        let mut merged = serde_json::to_value(Self::for_variant(variant))?;
        merge_json(&mut merged, value);
        Ok(serde_json::from_value(merged)?)
    }

    /// Load from a JSON file on disk
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }
}

/// Overlay `patch` onto `base`, recursing into objects
fn merge_json(base: &mut serde_json::Value, patch: serde_json::Value) {
    match (base, patch) {
        (serde_json::Value::Object(base), serde_json::Value::Object(patch)) => {
            for (key, value) in patch {
                match base.get_mut(&key) {
                    Some(slot) => merge_json(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_preset() {
        let config = ViewportConfig::for_variant(Variant::Basic);
        assert_eq!(config.camera.fov_degrees, 75.0);
        assert_eq!(config.camera.near, 0.1);
        assert_eq!(config.camera.far, 100.0);
        assert_eq!(config.camera.position, [0.0, 0.0, 2.0]);
        assert_eq!(config.model.fill_color, 0x044a88);
        assert!(config.animate);
        assert!(!config.orbit.enabled);
        assert!(!config.capture.enabled);
    }

    #[test]
    fn test_wireframe_preset() {
        let config = ViewportConfig::for_variant(Variant::Wireframe);
        assert_eq!(config.model.segments, [2, 2, 2]);
        assert_eq!(config.model.outline_color, Some(0xffff00));
        assert!(config.orbit.enabled);
        assert!(!config.animate);
        assert_eq!(config.time_scale, 0.0005);
    }

    #[test]
    fn test_webcam_preset() {
        let config = ViewportConfig::for_variant(Variant::Webcam);
        assert!(config.capture.enabled);
        assert_eq!((config.capture.width, config.capture.height), (1280, 720));
        assert!(config.orbit.enabled);
    }

    #[test]
    fn test_variant_from_str() {
        assert_eq!("webcam".parse::<Variant>().unwrap(), Variant::Webcam);
        assert_eq!("Wireframe".parse::<Variant>().unwrap(), Variant::Wireframe);
        assert!(matches!(
            "sphere".parse::<Variant>(),
            Err(ConfigError::UnknownVariant(name)) if name == "sphere"
        ));
    }

    #[test]
    fn test_partial_json_keeps_variant_preset() {
        let json = r#"{ "variant": "wireframe", "animate": true, "camera": { "fov_degrees": 60.0 } }"#;
        let config = ViewportConfig::from_json(json).unwrap();
        assert_eq!(config.variant, Variant::Wireframe);
        assert!(config.animate);
        assert_eq!(config.camera.fov_degrees, 60.0);
        // untouched fields come from the wireframe preset
        assert_eq!(config.camera.far, 100.0);
        assert_eq!(config.model.outline_color, Some(0xffff00));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            ViewportConfig::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = ViewportConfig::load(Path::new("/nonexistent/viewport.json"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
