//! RGBA output image.

use glint_math::Vec4;
use std::path::Path;

/// Float RGBA pixels in row-major order, row 0 at the top.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Vec4>,
}

impl ImageBuffer {
    /// Create a new image buffer filled with transparent black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Vec4::ZERO; width as usize * height as usize],
        }
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Get the pixel at (x, y).
    pub fn get(&self, x: u32, y: u32) -> Vec4 {
        self.pixels[self.index(x, y)]
    }

    /// Set the pixel at (x, y).
    pub fn set(&mut self, x: u32, y: u32, color: Vec4) {
        let i = self.index(x, y);
        self.pixels[i] = color;
    }

    /// Convert to 8-bit RGBA, clamping each channel to `[0, 1]`.
    pub fn to_rgba8(&self) -> image::RgbaImage {
        image::RgbaImage::from_fn(self.width, self.height, |x, y| {
            let c = self.get(x, y).clamp(Vec4::ZERO, Vec4::ONE) * 255.0;
            image::Rgba([c.x as u8, c.y as u8, c.z as u8, c.w as u8])
        })
    }

    /// Write the image to `path`; the format follows the file extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), image::ImageError> {
        self.to_rgba8().save(path)
    }
}
