//! Reference height images
//!
//! A reference image steers the generated terrain: after normalization every
//! sample is blended 50/50 with the image's grayscale value at the same cell.

use std::path::Path;

use image::DynamicImage;

use crate::heightfield::HeightField;

/// Read-only grayscale grid sampled during blending.
pub trait ReferenceImage: Sync {
    /// (width, height) in samples
    fn resolution(&self) -> (u32, u32);

    /// Grayscale value in [0, 1] at column `x`, row `y`.
    fn grayscale(&self, x: usize, y: usize) -> f32;
}

/// Grayscale image held in memory, row-major by pixel row.
#[derive(Clone, Debug)]
pub struct GrayscaleImage {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl GrayscaleImage {
    /// Load any format the `image` crate can decode.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, image::ImageError> {
        let img = image::open(path)?;
        Ok(Self::from_dynamic(&img))
    }

    /// Luminance `0.299 r + 0.587 g + 0.114 b` of every pixel.
    pub fn from_dynamic(img: &DynamicImage) -> Self {
        let rgb = img.to_rgb32f();
        let (width, height) = rgb.dimensions();
        let values = rgb
            .pixels()
            .map(|p| (0.299 * p[0] + 0.587 * p[1] + 0.114 * p[2]).clamp(0.0, 1.0))
            .collect();
        Self { width, height, values }
    }

    pub fn from_fn(width: u32, height: u32, f: impl Fn(usize, usize) -> f32) -> Self {
        let mut values = Vec::with_capacity(width as usize * height as usize);
        for y in 0..height as usize {
            for x in 0..width as usize {
                values.push(f(x, y).clamp(0.0, 1.0));
            }
        }
        Self { width, height, values }
    }
}

impl ReferenceImage for GrayscaleImage {
    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn grayscale(&self, x: usize, y: usize) -> f32 {
        self.values[y * self.width as usize + x]
    }
}

/// A generated field can be fed back as the reference for another run.
impl ReferenceImage for HeightField {
    fn resolution(&self) -> (u32, u32) {
        let r = HeightField::resolution(self) as u32;
        (r, r)
    }

    fn grayscale(&self, x: usize, y: usize) -> f32 {
        self.get(x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Luma, Rgb};

    #[test]
    fn test_gray_image_round_trips_luma() {
        let img = ImageBuffer::from_fn(4, 2, |x, y| Luma([(x * 60 + y * 10) as u8]));
        let gray = GrayscaleImage::from_dynamic(&DynamicImage::ImageLuma8(img));
        assert_eq!(gray.resolution(), (4, 2));
        assert!((gray.grayscale(3, 1) - 190.0 / 255.0).abs() < 1e-3);
        assert_eq!(gray.grayscale(0, 0), 0.0);
    }

    #[test]
    fn test_rgb_uses_luminance_weights() {
        let img = ImageBuffer::from_pixel(1, 1, Rgb([255u8, 0, 0]));
        let gray = GrayscaleImage::from_dynamic(&DynamicImage::ImageRgb8(img));
        assert!((gray.grayscale(0, 0) - 0.299).abs() < 1e-3);
    }

    #[test]
    fn test_height_field_as_reference() {
        let field = HeightField::from_fn(3, |x, y| (x + y) as f32 / 4.0);
        assert_eq!(ReferenceImage::resolution(&field), (3, 3));
        assert_eq!(field.grayscale(2, 1), 0.75);
    }
}
