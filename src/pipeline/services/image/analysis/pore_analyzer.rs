use super::core::{require_min_size, ImageRegion, SeverityReport, SkinAlgorithm};
use crate::common::ImageSample;
use crate::error::AlgorithmError;
use crate::pipeline::domain::Severity;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct PoreAnalysis {
    pub estimated_count: usize,
    pub average_size_px: f64,
    pub enlarged_regions: Vec<ImageRegion>,
    pub severity: Severity,
    /// Set while the analyzer returns a fixed shape instead of measuring.
    pub placeholder: bool,
}

impl SeverityReport for PoreAnalysis {
    fn severity(&self) -> Severity {
        self.severity
    }
}

/// Pore analyzer.
///
/// Not a real small-blob detector yet: it validates the sample and reports a
/// fixed midpoint result flagged as `placeholder`, with low confidence so the
/// composer and percentile consumers can discount it.
pub struct PoreAnalyzer;

impl PoreAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PoreAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SkinAlgorithm for PoreAnalyzer {
    type Output = PoreAnalysis;

    fn name(&self) -> &'static str {
        "pore_analyzer"
    }

    fn analyze(&self, sample: &ImageSample) -> Result<PoreAnalysis, AlgorithmError> {
        require_min_size(self.name(), sample, 1)?;
        Ok(PoreAnalysis {
            estimated_count: 0,
            average_size_px: 0.0,
            enlarged_regions: Vec::new(),
            severity: Severity::MIDPOINT,
            placeholder: true,
        })
    }

    fn confidence(&self, _output: &PoreAnalysis) -> f32 {
        0.2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, RgbImage};

    #[test]
    fn returns_flagged_midpoint_shape() {
        let sample = ImageSample::from_rgb(ImageBuffer::from_pixel(8, 8, Rgb([90, 60, 50])));
        let analyzer = PoreAnalyzer::new();
        let analysis = analyzer.analyze(&sample).unwrap();
        assert!(analysis.placeholder);
        assert_eq!(analysis.severity, Severity::MIDPOINT);
        assert!(analyzer.confidence(&analysis) < 0.5);
    }

    #[test]
    fn empty_image_fails() {
        let sample = ImageSample::from_rgb(RgbImage::new(0, 4));
        assert!(PoreAnalyzer::new().analyze(&sample).is_err());
    }
}
