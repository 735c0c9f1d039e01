use super::config::TextureThresholds;
use super::core::{mean_and_std_dev, require_min_size, ImageRegion, SeverityReport, SkinAlgorithm};
use crate::common::ImageSample;
use crate::error::AlgorithmError;
use crate::pipeline::domain::Severity;
use image::GrayImage;
use serde::Serialize;

/// Clockwise from top-left; bit i is set when neighbor i is at least as bright as the center.
const NEIGHBORS: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
];

#[derive(Debug, Clone, Serialize)]
pub struct TextureAnalysis {
    /// 0..=10, higher is smoother.
    pub smoothness: f64,
    /// 0..=10, higher is more uniform.
    pub uniformity: f64,
    /// Shannon entropy of the LBP histogram in bits (0..=8).
    pub lbp_entropy: f64,
    pub rough_regions: Vec<ImageRegion>,
    pub rough_fraction: f64,
    pub roughness: Severity,
}

impl SeverityReport for TextureAnalysis {
    fn severity(&self) -> Severity {
        self.roughness
    }
}

/// Local Binary Pattern texture analyzer
pub struct TextureAnalyzer {
    thresholds: TextureThresholds,
}

impl TextureAnalyzer {
    pub fn new() -> Self {
        Self {
            thresholds: TextureThresholds::default(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: TextureThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// LBP codes for every interior pixel, row-major over a (w-2) x (h-2) grid.
    fn lbp_codes(gray: &GrayImage) -> Vec<u8> {
        let (width, height) = gray.dimensions();
        let mut codes = Vec::with_capacity(((width - 2) * (height - 2)) as usize);

        for y in 1..height - 1 {
            for x in 1..width - 1 {
                let center = gray.get_pixel(x, y).0[0];
                let mut code = 0u8;
                for (bit, (dx, dy)) in NEIGHBORS.iter().enumerate() {
                    let nx = (x as i64 + dx) as u32;
                    let ny = (y as i64 + dy) as u32;
                    if gray.get_pixel(nx, ny).0[0] >= center {
                        code |= 1 << bit;
                    }
                }
                codes.push(code);
            }
        }

        codes
    }

    fn entropy(codes: &[u8]) -> f64 {
        let mut histogram = [0usize; 256];
        for code in codes {
            histogram[*code as usize] += 1;
        }
        let total = codes.len() as f64;
        histogram
            .iter()
            .filter(|count| **count > 0)
            .map(|count| {
                let p = *count as f64 / total;
                -p * p.log2()
            })
            .sum()
    }

    /// Tile the LBP grid and flag tiles whose code variance exceeds the threshold.
    fn rough_tiles(&self, codes: &[u8], grid_w: u32, grid_h: u32) -> (Vec<ImageRegion>, usize) {
        let window = self.thresholds.window_size.min(grid_w).min(grid_h).max(1);
        let mut rough = Vec::new();
        let mut tiles = 0;
        let mut values = Vec::with_capacity((window * window) as usize);

        for ty in (0..=grid_h - window).step_by(window as usize) {
            for tx in (0..=grid_w - window).step_by(window as usize) {
                values.clear();
                for y in ty..ty + window {
                    let row = (y * grid_w) as usize;
                    for x in tx..tx + window {
                        values.push(codes[row + x as usize] as f64);
                    }
                }
                tiles += 1;

                let (_, std_dev) = mean_and_std_dev(&values);
                if std_dev * std_dev > self.thresholds.roughness_variance_threshold {
                    // LBP grid is offset by one pixel from the image
                    rough.push(ImageRegion::new(tx + 1, ty + 1, window, window));
                }
            }
        }

        (rough, tiles)
    }
}

impl Default for TextureAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SkinAlgorithm for TextureAnalyzer {
    type Output = TextureAnalysis;

    fn name(&self) -> &'static str {
        "texture_analyzer"
    }

    fn analyze(&self, sample: &ImageSample) -> Result<TextureAnalysis, AlgorithmError> {
        require_min_size(self.name(), sample, 3)?;
        let (width, height) = sample.dimensions();

        let (_, brightness_std) = mean_and_std_dev(&sample.brightness());
        let smoothness = (10.0 - brightness_std / 10.0).clamp(0.0, 10.0);

        let codes = Self::lbp_codes(&sample.to_gray());
        let lbp_entropy = Self::entropy(&codes);
        let uniformity = (10.0 - lbp_entropy / 8.0 * 10.0).clamp(0.0, 10.0);

        let (rough_regions, tiles) = self.rough_tiles(&codes, width - 2, height - 2);
        let rough_fraction = if tiles == 0 {
            0.0
        } else {
            rough_regions.len() as f64 / tiles as f64
        };

        Ok(TextureAnalysis {
            smoothness,
            uniformity,
            lbp_entropy,
            rough_fraction,
            rough_regions,
            roughness: Severity::from_score(10.0 - (smoothness + uniformity) / 2.0),
        })
    }

    fn confidence(&self, _output: &TextureAnalysis) -> f32 {
        0.75
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, RgbImage};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn uniform_image_is_smooth_and_uniform() {
        let sample = ImageSample::from_rgb(ImageBuffer::from_pixel(100, 100, Rgb([128, 128, 128])));
        let analysis = TextureAnalyzer::new().analyze(&sample).unwrap();
        assert!((analysis.smoothness - 10.0).abs() < 1e-9);
        assert!((analysis.uniformity - 10.0).abs() < 1e-9);
        assert_eq!(analysis.lbp_entropy, 0.0);
        assert!(analysis.rough_regions.is_empty());
        assert_eq!(analysis.roughness, Severity::MIN);
    }

    #[test]
    fn noise_is_rough() {
        let mut rng = StdRng::seed_from_u64(7);
        let rgb: RgbImage = ImageBuffer::from_fn(100, 100, |_, _| {
            let v: u8 = rng.random();
            Rgb([v, v, v])
        });
        let analysis = TextureAnalyzer::new().analyze(&ImageSample::from_rgb(rgb)).unwrap();
        assert!(analysis.lbp_entropy > 6.0);
        assert!(analysis.smoothness < 4.0);
        assert!(analysis.roughness.value() >= 7);
        assert!(analysis.rough_fraction > 0.9);
    }

    #[test]
    fn lbp_code_marks_brighter_neighbors() {
        // only the right-hand neighbor (bit 3) is brighter than the center
        let mut gray = GrayImage::from_pixel(3, 3, image::Luma([10]));
        gray.put_pixel(1, 1, image::Luma([50]));
        gray.put_pixel(2, 1, image::Luma([90]));
        let codes = TextureAnalyzer::lbp_codes(&gray);
        assert_eq!(codes, vec![0b0000_1000]);
    }

    #[test]
    fn tiny_image_fails() {
        let sample = ImageSample::from_rgb(ImageBuffer::from_pixel(2, 2, Rgb([1, 1, 1])));
        let err = TextureAnalyzer::new().analyze(&sample).unwrap_err();
        assert!(matches!(err, AlgorithmError::ImageTooSmall { min: 3, .. }));
    }
}
