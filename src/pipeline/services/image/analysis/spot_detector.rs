use super::blob::find_blobs;
use super::config::SpotThresholds;
use super::core::{require_min_size, ImageRegion, SeverityReport, SkinAlgorithm};
use crate::common::ImageSample;
use crate::error::AlgorithmError;
use crate::pipeline::domain::Severity;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct DetectedSpot {
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub pixel_count: usize,
    pub bounds: ImageRegion,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpotAnalysis {
    pub spots: Vec<DetectedSpot>,
    /// Percentage of the image covered by accepted blobs.
    pub coverage_percent: f64,
    pub severity: Severity,
}

impl SpotAnalysis {
    pub fn count(&self) -> usize {
        self.spots.len()
    }
}

impl SeverityReport for SpotAnalysis {
    fn severity(&self) -> Severity {
        self.severity
    }
}

/// Dark-spot detector: thresholded greyscale, flood-filled into blobs, kept
/// only when the blob falls inside the accepted size band.
pub struct SpotDetector {
    thresholds: SpotThresholds,
}

impl SpotDetector {
    pub fn new() -> Self {
        Self {
            thresholds: SpotThresholds::default(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: SpotThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }
}

impl Default for SpotDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl SkinAlgorithm for SpotDetector {
    type Output = SpotAnalysis;

    fn name(&self) -> &'static str {
        "spot_detector"
    }

    fn analyze(&self, sample: &ImageSample) -> Result<SpotAnalysis, AlgorithmError> {
        require_min_size(self.name(), sample, 1)?;
        let (width, height) = sample.dimensions();

        let gray = sample.to_gray();
        let mask: Vec<bool> = gray
            .pixels()
            .map(|p| p.0[0] < self.thresholds.darkness_threshold)
            .collect();

        let band = self.thresholds.min_blob_px..=self.thresholds.max_blob_px;
        let spots: Vec<DetectedSpot> = find_blobs(&mask, width, height)
            .into_iter()
            .filter(|blob| band.contains(&blob.pixel_count()))
            .map(|blob| DetectedSpot {
                x: blob.centroid.0,
                y: blob.centroid.1,
                radius: blob.equivalent_radius(),
                pixel_count: blob.pixel_count(),
                bounds: blob.bounds,
            })
            .collect();

        let covered: usize = spots.iter().map(|s| s.pixel_count).sum();
        let coverage_percent = covered as f64 / sample.pixel_count() as f64 * 100.0;

        Ok(SpotAnalysis {
            severity: Severity::from_score(coverage_percent),
            coverage_percent,
            spots,
        })
    }

    fn confidence(&self, _output: &SpotAnalysis) -> f32 {
        0.7
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, RgbImage};

    fn disc(size: u32, cx: i32, cy: i32, radius: i32) -> RgbImage {
        ImageBuffer::from_fn(size, size, |x, y| {
            let dx = x as i32 - cx;
            let dy = y as i32 - cy;
            if dx * dx + dy * dy <= radius * radius {
                Rgb([20, 20, 20])
            } else {
                Rgb([220, 220, 220])
            }
        })
    }

    #[test]
    fn uniform_bright_image_has_no_spots() {
        let sample = ImageSample::from_rgb(ImageBuffer::from_pixel(100, 100, Rgb([230, 230, 230])));
        let analysis = SpotDetector::new().analyze(&sample).unwrap();
        assert_eq!(analysis.count(), 0);
        assert_eq!(analysis.severity, Severity::MIN);
    }

    #[test]
    fn uniform_mid_grey_has_no_spots() {
        let sample = ImageSample::from_rgb(ImageBuffer::from_pixel(100, 100, Rgb([128, 128, 128])));
        let analysis = SpotDetector::new().analyze(&sample).unwrap();
        assert_eq!(analysis.count(), 0);
        assert_eq!(analysis.severity.value(), 1);
    }

    #[test]
    fn dark_disc_is_one_spot_with_matching_radius() {
        for radius in [3, 4, 5] {
            let sample = ImageSample::from_rgb(disc(60, 30, 30, radius));
            let analysis = SpotDetector::new().analyze(&sample).unwrap();
            assert_eq!(analysis.count(), 1, "radius {radius}");
            let spot = &analysis.spots[0];
            assert!(
                (spot.radius - radius as f64).abs() <= 1.0,
                "radius {radius} measured {}",
                spot.radius
            );
            assert!((spot.x - 30.0).abs() < 0.5);
            assert!((spot.y - 30.0).abs() < 0.5);
        }
    }

    #[test]
    fn blobs_outside_size_band_are_rejected() {
        // a 2x2 speck is below the 5px minimum, a 20x20 square is above 100px
        let rgb = ImageBuffer::from_fn(80, 80, |x, y| {
            let speck = (10..12).contains(&x) && (10..12).contains(&y);
            let patch = (40..60).contains(&x) && (40..60).contains(&y);
            if speck || patch {
                Rgb([10, 10, 10])
            } else {
                Rgb([200, 200, 200])
            }
        });
        let analysis = SpotDetector::new().analyze(&ImageSample::from_rgb(rgb)).unwrap();
        assert_eq!(analysis.count(), 0);
    }

    #[test]
    fn coverage_drives_severity() {
        // 100 spots of 3x3 on a 60x60 grid cover 900 / 3600 = 25%
        let rgb = ImageBuffer::from_fn(60, 60, |x, y| {
            if x % 6 < 3 && y % 6 < 3 {
                Rgb([5, 5, 5])
            } else {
                Rgb([210, 210, 210])
            }
        });
        let analysis = SpotDetector::new().analyze(&ImageSample::from_rgb(rgb)).unwrap();
        assert_eq!(analysis.count(), 100);
        assert!((analysis.coverage_percent - 25.0).abs() < 1e-9);
        assert_eq!(analysis.severity, Severity::MAX);
    }

    #[test]
    fn empty_image_fails() {
        let sample = ImageSample::from_rgb(RgbImage::new(0, 0));
        let err = SpotDetector::new().analyze(&sample).unwrap_err();
        assert!(matches!(err, AlgorithmError::EmptyImage { .. }));
    }
}
