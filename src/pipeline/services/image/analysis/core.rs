use crate::common::ImageSample;
use crate::error::AlgorithmError;
use crate::pipeline::domain::Severity;
use serde::Serialize;
use std::time::Instant;

/// Rectangular region of an image for focused analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImageRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ImageRegion {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn full_image(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn contains_point(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }

    pub fn area(&self) -> u32 {
        self.width * self.height
    }
}

/// Tagged result of a single CV algorithm. Failures carry confidence 0 and never
/// abort sibling algorithms.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AlgorithmOutcome<T> {
    Completed {
        result: T,
        confidence: f32,
        processing_time_us: u64,
    },
    Failed {
        error: String,
        confidence: f32,
    },
}

impl<T> AlgorithmOutcome<T> {
    pub fn completed(result: T, confidence: f32, start_time: Instant) -> Self {
        AlgorithmOutcome::Completed {
            result,
            confidence: confidence.clamp(0.0, 1.0),
            processing_time_us: start_time.elapsed().as_micros() as u64,
        }
    }

    pub fn failed(error: &AlgorithmError) -> Self {
        AlgorithmOutcome::Failed {
            error: error.to_string(),
            confidence: 0.0,
        }
    }

    pub fn result(&self) -> Option<&T> {
        match self {
            AlgorithmOutcome::Completed { result, .. } => Some(result),
            AlgorithmOutcome::Failed { .. } => None,
        }
    }

    pub fn confidence(&self) -> f32 {
        match self {
            AlgorithmOutcome::Completed { confidence, .. } => *confidence,
            AlgorithmOutcome::Failed { .. } => 0.0,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, AlgorithmOutcome::Completed { .. })
    }
}

/// Every algorithm output reports one severity on the 1..=10 scale.
pub trait SeverityReport {
    fn severity(&self) -> Severity;
}

/// Strategy for one deterministic pixel algorithm.
///
/// Implementations read the shared sample and return an owned result; they hold
/// no mutable state, so any number can run against the same sample at once.
pub trait SkinAlgorithm: Send + Sync + 'static {
    type Output: SeverityReport + Send + 'static;

    fn name(&self) -> &'static str;

    fn analyze(&self, sample: &ImageSample) -> Result<Self::Output, AlgorithmError>;

    /// How much the output should be trusted, in [0, 1].
    fn confidence(&self, output: &Self::Output) -> f32;
}

pub(crate) fn require_min_size(
    algorithm: &'static str,
    sample: &ImageSample,
    min: u32,
) -> Result<(), AlgorithmError> {
    if sample.is_empty() {
        return Err(AlgorithmError::EmptyImage { algorithm });
    }
    let (width, height) = sample.dimensions();
    if width < min || height < min {
        return Err(AlgorithmError::ImageTooSmall {
            algorithm,
            width,
            height,
            min,
        });
    }
    Ok(())
}

/// Population mean and standard deviation. Empty input yields zeros.
pub(crate) fn mean_and_std_dev(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    #[test]
    fn failed_outcome_has_zero_confidence() {
        let outcome: AlgorithmOutcome<u8> =
            AlgorithmOutcome::failed(&AlgorithmError::EmptyImage { algorithm: "spots" });
        assert_eq!(outcome.confidence(), 0.0);
        assert!(outcome.result().is_none());
        assert!(!outcome.is_completed());
    }

    #[test]
    fn min_size_check_reports_dimensions() {
        let sample = ImageSample::from_rgb(ImageBuffer::from_pixel(2, 8, Rgb([0u8, 0, 0])));
        let err = require_min_size("texture", &sample, 3).unwrap_err();
        assert_eq!(
            err,
            AlgorithmError::ImageTooSmall {
                algorithm: "texture",
                width: 2,
                height: 8,
                min: 3
            }
        );
    }

    #[test]
    fn std_dev_of_constant_values_is_zero() {
        let (mean, std_dev) = mean_and_std_dev(&[4.0, 4.0, 4.0]);
        assert_eq!(mean, 4.0);
        assert_eq!(std_dev, 0.0);
    }

    #[test]
    fn region_contains_its_corner() {
        let region = ImageRegion::new(10, 10, 5, 5);
        assert!(region.contains_point(10, 10));
        assert!(!region.contains_point(15, 10));
        assert_eq!(region.area(), 25);
    }
}
