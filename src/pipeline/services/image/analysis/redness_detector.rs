use super::blob::find_blobs;
use super::config::RednessThresholds;
use super::core::{require_min_size, ImageRegion, SeverityReport, SkinAlgorithm};
use crate::common::ImageSample;
use crate::error::AlgorithmError;
use crate::pipeline::domain::Severity;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RednessKind {
    /// Small, intense: papule-like inflammation.
    Inflammation,
    /// Large flushed area.
    Diffuse,
    Patch,
}

#[derive(Debug, Clone, Serialize)]
pub struct RedRegion {
    pub bounds: ImageRegion,
    pub pixel_count: usize,
    /// Mean red excess over the other channels, R - (G + B) / 2.
    pub intensity: f64,
    pub kind: RednessKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct RednessAnalysis {
    pub regions: Vec<RedRegion>,
    /// Red area / total area, in [0, 1].
    pub coverage: f64,
    pub inflammation_count: usize,
    pub severity: Severity,
    /// Acne estimate from the inflammation count.
    pub acne_severity: Severity,
}

impl SeverityReport for RednessAnalysis {
    fn severity(&self) -> Severity {
        self.severity
    }
}

/// Red-dominance detector with region classification
pub struct RednessDetector {
    thresholds: RednessThresholds,
}

impl RednessDetector {
    pub fn new() -> Self {
        Self {
            thresholds: RednessThresholds::default(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: RednessThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    fn is_red(&self, r: u8, g: u8, b: u8) -> bool {
        let margin = self.thresholds.dominance_margin as u16;
        r > self.thresholds.min_red && r as u16 > g as u16 + margin && r as u16 > b as u16 + margin
    }

    fn classify(&self, pixel_count: usize, intensity: f64) -> RednessKind {
        if pixel_count >= self.thresholds.diffuse_min_px {
            RednessKind::Diffuse
        } else if pixel_count <= self.thresholds.inflammation_max_px
            && intensity >= self.thresholds.inflammation_min_intensity
        {
            RednessKind::Inflammation
        } else {
            RednessKind::Patch
        }
    }
}

impl Default for RednessDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl SkinAlgorithm for RednessDetector {
    type Output = RednessAnalysis;

    fn name(&self) -> &'static str {
        "redness_detector"
    }

    fn analyze(&self, sample: &ImageSample) -> Result<RednessAnalysis, AlgorithmError> {
        require_min_size(self.name(), sample, 1)?;
        let (width, height) = sample.dimensions();
        let pixels = sample.rgb().as_raw();

        let mask: Vec<bool> = pixels
            .chunks_exact(3)
            .map(|p| self.is_red(p[0], p[1], p[2]))
            .collect();

        let regions: Vec<RedRegion> = find_blobs(&mask, width, height)
            .into_iter()
            .filter(|blob| blob.pixel_count() >= self.thresholds.min_region_px)
            .map(|blob| {
                let excess: f64 = blob
                    .indices
                    .iter()
                    .map(|i| {
                        let p = &pixels[i * 3..i * 3 + 3];
                        p[0] as f64 - (p[1] as f64 + p[2] as f64) / 2.0
                    })
                    .sum();
                let intensity = excess / blob.pixel_count() as f64;
                RedRegion {
                    bounds: blob.bounds,
                    pixel_count: blob.pixel_count(),
                    intensity,
                    kind: self.classify(blob.pixel_count(), intensity),
                }
            })
            .collect();

        let red_area: usize = regions.iter().map(|r| r.pixel_count).sum();
        let coverage = red_area as f64 / sample.pixel_count() as f64;
        let inflammation_count = regions
            .iter()
            .filter(|r| r.kind == RednessKind::Inflammation)
            .count();

        Ok(RednessAnalysis {
            severity: Severity::from_score(coverage * 40.0 + inflammation_count as f64 * 0.5),
            acne_severity: Severity::from_score(1.0 + inflammation_count as f64 / 2.0),
            coverage,
            inflammation_count,
            regions,
        })
    }

    fn confidence(&self, _output: &RednessAnalysis) -> f32 {
        0.7
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    #[test]
    fn uniform_grey_has_no_redness() {
        let sample = ImageSample::from_rgb(ImageBuffer::from_pixel(100, 100, Rgb([128, 128, 128])));
        let analysis = RednessDetector::new().analyze(&sample).unwrap();
        assert!(analysis.regions.is_empty());
        assert_eq!(analysis.coverage, 0.0);
        assert_eq!(analysis.severity, Severity::MIN);
        assert_eq!(analysis.acne_severity, Severity::MIN);
    }

    #[test]
    fn red_test_requires_dominance_over_both_channels() {
        let detector = RednessDetector::new();
        assert!(detector.is_red(200, 100, 100));
        assert!(!detector.is_red(120, 50, 50));
        assert!(!detector.is_red(200, 190, 100));
        assert!(!detector.is_red(200, 100, 185));
    }

    #[test]
    fn small_intense_spots_are_inflammation() {
        // six 3x3 bright-red papules on skin-toned background
        let rgb = ImageBuffer::from_fn(60, 60, |x, y| {
            if x % 10 < 3 && y < 3 {
                Rgb([220, 60, 60])
            } else {
                Rgb([180, 165, 150])
            }
        });
        let analysis = RednessDetector::new().analyze(&ImageSample::from_rgb(rgb)).unwrap();
        assert_eq!(analysis.regions.len(), 6);
        assert_eq!(analysis.inflammation_count, 6);
        assert_eq!(analysis.acne_severity.value(), 4);
        assert!(analysis.severity.value() >= 3);
    }

    #[test]
    fn large_flush_is_diffuse() {
        let rgb = ImageBuffer::from_fn(50, 50, |x, _| {
            if x < 30 {
                Rgb([200, 140, 130])
            } else {
                Rgb([180, 170, 160])
            }
        });
        let analysis = RednessDetector::new().analyze(&ImageSample::from_rgb(rgb)).unwrap();
        assert_eq!(analysis.regions.len(), 1);
        assert_eq!(analysis.regions[0].kind, RednessKind::Diffuse);
        assert!((analysis.coverage - 0.6).abs() < 1e-9);
        assert_eq!(analysis.severity.value(), 10);
    }

    #[test]
    fn tiny_red_specks_are_ignored() {
        let mut rgb = ImageBuffer::from_pixel(20, 20, Rgb([150u8, 150, 150]));
        rgb.put_pixel(5, 5, Rgb([250, 10, 10]));
        rgb.put_pixel(6, 5, Rgb([250, 10, 10]));
        let analysis = RednessDetector::new().analyze(&ImageSample::from_rgb(rgb)).unwrap();
        assert!(analysis.regions.is_empty());
    }
}
