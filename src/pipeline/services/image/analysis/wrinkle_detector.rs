use super::core::{require_min_size, ImageRegion, SeverityReport, SkinAlgorithm};
use crate::common::ImageSample;
use crate::error::AlgorithmError;
use crate::pipeline::domain::Severity;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct WrinkleAnalysis {
    pub line_count: usize,
    pub fine_line_count: usize,
    pub regions: Vec<ImageRegion>,
    pub severity: Severity,
    pub placeholder: bool,
}

impl SeverityReport for WrinkleAnalysis {
    fn severity(&self) -> Severity {
        self.severity
    }
}

/// Wrinkle detector. Same placeholder contract as the pore analyzer: fixed
/// midpoint output, flagged, low confidence.
pub struct WrinkleDetector;

impl WrinkleDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WrinkleDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl SkinAlgorithm for WrinkleDetector {
    type Output = WrinkleAnalysis;

    fn name(&self) -> &'static str {
        "wrinkle_detector"
    }

    fn analyze(&self, sample: &ImageSample) -> Result<WrinkleAnalysis, AlgorithmError> {
        require_min_size(self.name(), sample, 1)?;
        Ok(WrinkleAnalysis {
            line_count: 0,
            fine_line_count: 0,
            regions: Vec::new(),
            severity: Severity::MIDPOINT,
            placeholder: true,
        })
    }

    fn confidence(&self, _output: &WrinkleAnalysis) -> f32 {
        0.2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    #[test]
    fn returns_flagged_midpoint_shape() {
        let sample = ImageSample::from_rgb(ImageBuffer::from_pixel(8, 8, Rgb([200, 170, 150])));
        let analysis = WrinkleDetector::new().analyze(&sample).unwrap();
        assert!(analysis.placeholder);
        assert_eq!(analysis.line_count, 0);
        assert_eq!(analysis.severity.value(), 5);
    }
}
