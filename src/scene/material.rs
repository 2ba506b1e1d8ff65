//! Paint descriptions applied to geometry at draw time

use crate::capture::VideoTexture;

/// RGB with components in 0..1, usually built from 0xRRGGBB
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color { r: 1.0, g: 1.0, b: 1.0 };
    pub const BLACK: Color = Color { r: 0.0, g: 0.0, b: 0.0 };

    pub fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as f32 / 255.0,
            g: ((hex >> 8) & 0xff) as f32 / 255.0,
            b: (hex & 0xff) as f32 / 255.0,
        }
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    /// Decode sRGB components for shading on an sRGB target
    pub fn to_linear(self) -> Self {
        fn decode(c: f32) -> f32 {
            if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }
        Self {
            r: decode(self.r),
            g: decode(self.g),
            b: decode(self.b),
        }
    }

    pub fn to_wgpu(self) -> wgpu::Color {
        let linear = self.to_linear();
        wgpu::Color {
            r: linear.r as f64,
            g: linear.g as f64,
            b: linear.b as f64,
            a: 1.0,
        }
    }
}

/// Lit surface paint (Blinn-Phong), optionally sampling a live texture
#[derive(Debug, Clone)]
pub struct PhongMaterial {
    pub color: Color,
    pub specular: Color,
    pub shininess: f32,
    pub map: Option<VideoTexture>,
}

impl PhongMaterial {
    pub fn with_color(color: Color) -> Self {
        Self {
            color,
            specular: Color::from_hex(0x111111),
            shininess: 30.0,
            map: None,
        }
    }

    /// White base so the texture shows unmodulated
    pub fn with_map(map: VideoTexture) -> Self {
        Self {
            map: Some(map),
            ..Self::with_color(Color::WHITE)
        }
    }
}

/// Unlit line paint for outlines
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineMaterial {
    pub color: Color,
}

/// Paint for one drawable
#[derive(Debug, Clone)]
pub enum Material {
    Phong(PhongMaterial),
    Line(LineMaterial),
}

impl Material {
    /// The live texture this paint samples, if any
    pub fn texture(&self) -> Option<&VideoTexture> {
        match self {
            Material::Phong(phong) => phong.map.as_ref(),
            Material::Line(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_from_hex() {
        let c = Color::from_hex(0xffff00);
        assert_eq!(c.to_array(), [1.0, 1.0, 0.0]);
        let c = Color::from_hex(0x515151);
        assert!((c.r - 81.0 / 255.0).abs() < 1e-6);
        assert_eq!(c.r, c.g);
        assert_eq!(c.g, c.b);
    }

    #[test]
    fn test_linear_decode_keeps_endpoints() {
        assert_eq!(Color::WHITE.to_linear(), Color::WHITE);
        assert_eq!(Color::BLACK.to_linear(), Color::BLACK);
        let mid = Color::from_hex(0x808080).to_linear();
        assert!(mid.r > 0.2 && mid.r < 0.25);
    }

    #[test]
    fn test_untextured_material() {
        let material = Material::Phong(PhongMaterial::with_color(Color::BLACK));
        assert!(material.texture().is_none());
        let line = Material::Line(LineMaterial { color: Color::WHITE });
        assert!(line.texture().is_none());
    }
}
