use std::sync::Arc;

use thiserror::Error;

use crate::shading::{mix, Vec2};

/// Reasons a pixel buffer cannot become a source image.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SourceImageError {
    #[error("source image must have non-zero dimensions, got {width}x{height}")]
    ZeroSized { width: u32, height: u32 },
    #[error("source image buffer holds {actual} bytes, expected {expected} for {width}x{height} RGBA8")]
    LengthMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// Immutable RGBA8 logo bitmap. Cloning shares the pixel storage.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceImage {
    width: u32,
    height: u32,
    pixels: Arc<[u8]>,
}

impl SourceImage {
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, SourceImageError> {
        if width == 0 || height == 0 {
            return Err(SourceImageError::ZeroSized { width, height });
        }
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(SourceImageError::LengthMismatch {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels: pixels.into(),
        })
    }

    /// Single-colour image, mostly useful for tests and placeholders.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Result<Self, SourceImageError> {
        let count = width as usize * height as usize;
        let pixels = rgba.iter().copied().cycle().take(count * 4).collect();
        Self::from_rgba(width, height, pixels)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    fn red_at(&self, x: u32, y: u32) -> f32 {
        let index = (y as usize * self.width as usize + x as usize) * 4;
        self.pixels[index] as f32 / 255.0
    }

    /// Bilinear red-channel sample with clamp-to-edge addressing; `uv` has its
    /// origin at the top-left texel corner.
    pub fn sample_red(&self, uv: Vec2) -> f32 {
        let fx = uv.x * self.width as f32 - 0.5;
        let fy = uv.y * self.height as f32 - 0.5;
        let x0 = fx.floor();
        let y0 = fy.floor();
        let tx = fx - x0;
        let ty = fy - y0;

        let max_x = self.width as i64 - 1;
        let max_y = self.height as i64 - 1;
        let clamp_x = |v: f32| (v as i64).clamp(0, max_x) as u32;
        let clamp_y = |v: f32| (v as i64).clamp(0, max_y) as u32;
        let (xa, xb) = (clamp_x(x0), clamp_x(x0 + 1.0));
        let (ya, yb) = (clamp_y(y0), clamp_y(y0 + 1.0));

        let top = mix(self.red_at(xa, ya), self.red_at(xb, ya), tx);
        let bottom = mix(self.red_at(xa, yb), self.red_at(xb, yb), tx);
        mix(top, bottom, ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_sized_images() {
        assert_eq!(
            SourceImage::from_rgba(0, 4, Vec::new()),
            Err(SourceImageError::ZeroSized { width: 0, height: 4 })
        );
    }

    #[test]
    fn rejects_short_buffers() {
        let err = SourceImage::from_rgba(2, 2, vec![0; 15]).unwrap_err();
        assert!(matches!(err, SourceImageError::LengthMismatch { expected: 16, actual: 15, .. }));
    }

    #[test]
    fn reports_aspect_ratio() {
        let image = SourceImage::solid(300, 150, [0, 0, 0, 255]).unwrap();
        assert_eq!(image.aspect_ratio(), 2.0);
    }

    #[test]
    fn samples_interpolate_between_texels_and_clamp_outside() {
        let pixels = vec![0, 0, 0, 255, 255, 0, 0, 255];
        let image = SourceImage::from_rgba(2, 1, pixels).unwrap();
        assert_eq!(image.sample_red(Vec2::new(0.25, 0.5)), 0.0);
        assert_eq!(image.sample_red(Vec2::new(0.75, 0.5)), 1.0);
        assert!((image.sample_red(Vec2::new(0.5, 0.5)) - 0.5).abs() < 1e-6);
        assert_eq!(image.sample_red(Vec2::new(-3.0, 0.5)), 0.0);
        assert_eq!(image.sample_red(Vec2::new(4.0, 9.0)), 1.0);
    }
}
