use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use std::io::Cursor;
use std::sync::Arc;

use crate::error::AppError;

/// Decoded pixel grid for a single analysis request.
///
/// Cloning is cheap: the pixel buffer is shared behind an `Arc` so every
/// concurrent algorithm reads the same immutable grid.
#[derive(Clone)]
pub struct ImageSample {
    rgb: Arc<RgbImage>,
}

impl ImageSample {
    /// Decode real width x height x channel data from an encoded buffer.
    pub fn decode(bytes: &[u8]) -> Result<Self, AppError> {
        let image = image::load_from_memory(bytes)?;
        Ok(Self::from_image(image))
    }

    pub fn from_image(image: DynamicImage) -> Self {
        Self::from_rgb(image.to_rgb8())
    }

    pub fn from_rgb(rgb: RgbImage) -> Self {
        Self { rgb: Arc::new(rgb) }
    }

    pub fn width(&self) -> u32 {
        self.rgb.width()
    }

    pub fn height(&self) -> u32 {
        self.rgb.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.rgb.dimensions()
    }

    pub fn pixel_count(&self) -> usize {
        self.rgb.width() as usize * self.rgb.height() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.pixel_count() == 0
    }

    pub fn rgb(&self) -> &RgbImage {
        &self.rgb
    }

    /// Per-pixel brightness on the 0..=255 scale (Rec. 601 luma).
    pub fn brightness(&self) -> Vec<f64> {
        self.rgb
            .pixels()
            .map(|p| {
                let [r, g, b] = p.0;
                luma(r, g, b)
            })
            .collect()
    }

    pub fn to_gray(&self) -> GrayImage {
        image::imageops::grayscale(self.rgb.as_ref())
    }

    /// Re-encode the grid as JPEG for upload to remote providers.
    pub fn encode_jpeg(&self) -> Result<Vec<u8>, image::ImageError> {
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(self.rgb.as_ref().clone()).write_to(&mut buffer, ImageFormat::Jpeg)?;
        Ok(buffer.into_inner())
    }
}

impl std::fmt::Debug for ImageSample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageSample")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

pub fn luma(r: u8, g: u8, b: u8) -> f64 {
    0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    #[test]
    fn cloning_sample_shares_pixel_buffer() {
        let rgb = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(16, 16, Rgb([1, 2, 3]));
        let s1 = ImageSample::from_rgb(rgb);
        let s2 = s1.clone();
        assert!(Arc::ptr_eq(&s1.rgb, &s2.rgb));
    }

    #[test]
    fn decode_keeps_true_dimensions() {
        let rgb = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(37, 21, Rgb([200, 150, 120]));
        let mut png = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(rgb)
            .write_to(&mut png, ImageFormat::Png)
            .unwrap();

        let sample = ImageSample::decode(&png.into_inner()).unwrap();
        assert_eq!(sample.dimensions(), (37, 21));
        assert_eq!(sample.pixel_count(), 37 * 21);
    }

    #[test]
    fn decode_rejects_garbage() {
        let result = ImageSample::decode(&[0x00, 0x01, 0x02, 0x03]);
        assert!(matches!(result, Err(AppError::Decode(_))));
    }

    #[test]
    fn brightness_of_white_is_full_scale() {
        let rgb = ImageBuffer::<Rgb<u8>, Vec<u8>>::from_pixel(2, 2, Rgb([255, 255, 255]));
        let sample = ImageSample::from_rgb(rgb);
        assert!(sample.brightness().iter().all(|b| (*b - 255.0).abs() < 1e-6));
    }
}
