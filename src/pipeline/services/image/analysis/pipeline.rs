/// Concurrent CV pipeline with a partial-results model
use super::color_analyzer::{ColorAnalysis, ColorAnalyzer};
use super::config::CvAnalysisConfig;
use super::core::{AlgorithmOutcome, SeverityReport, SkinAlgorithm};
use super::pore_analyzer::{PoreAnalysis, PoreAnalyzer};
use super::redness_detector::{RednessAnalysis, RednessDetector};
use super::spot_detector::{SpotAnalysis, SpotDetector};
use super::texture_analyzer::{TextureAnalysis, TextureAnalyzer};
use super::wrinkle_detector::{WrinkleAnalysis, WrinkleDetector};
use crate::common::ImageSample;
use crate::error::{AlgorithmError, AppError};
use crate::pipeline::domain::{ConcernKind, Severity};
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Outputs of all six algorithms for one sample.
#[derive(Debug, Clone, Serialize)]
pub struct CvAnalysis {
    pub spots: AlgorithmOutcome<SpotAnalysis>,
    pub pores: AlgorithmOutcome<PoreAnalysis>,
    pub wrinkles: AlgorithmOutcome<WrinkleAnalysis>,
    pub texture: AlgorithmOutcome<TextureAnalysis>,
    pub color: AlgorithmOutcome<ColorAnalysis>,
    pub redness: AlgorithmOutcome<RednessAnalysis>,
}

impl CvAnalysis {
    pub const ALGORITHM_COUNT: usize = 6;

    pub fn completed_count(&self) -> usize {
        [
            self.spots.is_completed(),
            self.pores.is_completed(),
            self.wrinkles.is_completed(),
            self.texture.is_completed(),
            self.color.is_completed(),
            self.redness.is_completed(),
        ]
        .iter()
        .filter(|done| **done)
        .count()
    }

    pub fn failures(&self) -> Vec<String> {
        fn failure<T>(outcome: &AlgorithmOutcome<T>) -> Option<String> {
            match outcome {
                AlgorithmOutcome::Failed { error, .. } => Some(error.clone()),
                AlgorithmOutcome::Completed { .. } => None,
            }
        }
        [
            failure(&self.spots),
            failure(&self.pores),
            failure(&self.wrinkles),
            failure(&self.texture),
            failure(&self.color),
            failure(&self.redness),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Severities measured by algorithms that completed, keyed by concern in
    /// canonical order. Failed algorithms contribute nothing.
    pub fn severity_scores(&self) -> IndexMap<ConcernKind, Severity> {
        let mut scores = IndexMap::new();
        if let Some(redness) = self.redness.result() {
            scores.insert(ConcernKind::Acne, redness.acne_severity);
        }
        if let Some(wrinkles) = self.wrinkles.result() {
            scores.insert(ConcernKind::Wrinkles, wrinkles.severity());
            scores.insert(ConcernKind::FineLines, wrinkles.severity());
        }
        if let Some(spots) = self.spots.result() {
            scores.insert(ConcernKind::DarkSpots, spots.severity());
        }
        if let Some(color) = self.color.result() {
            scores.insert(ConcernKind::Hyperpigmentation, color.severity());
        }
        if let Some(redness) = self.redness.result() {
            scores.insert(ConcernKind::Redness, redness.severity());
        }
        if let Some(pores) = self.pores.result() {
            scores.insert(ConcernKind::Pores, pores.severity());
        }
        if let Some(texture) = self.texture.result() {
            scores.insert(ConcernKind::Texture, texture.severity());
        }
        scores
    }

    pub fn redness_severity(&self) -> Severity {
        severity_or_midpoint(&self.redness)
    }

    pub fn pore_severity(&self) -> Severity {
        severity_or_midpoint(&self.pores)
    }

    pub fn texture_roughness(&self) -> Severity {
        severity_or_midpoint(&self.texture)
    }

    /// Mean confidence across all six algorithms; failures count as zero.
    pub fn mean_confidence(&self) -> f32 {
        let total = self.spots.confidence()
            + self.pores.confidence()
            + self.wrinkles.confidence()
            + self.texture.confidence()
            + self.color.confidence()
            + self.redness.confidence();
        total / Self::ALGORITHM_COUNT as f32
    }
}

fn severity_or_midpoint<T: SeverityReport>(outcome: &AlgorithmOutcome<T>) -> Severity {
    outcome
        .result()
        .map(|r| r.severity())
        .unwrap_or(Severity::MIDPOINT)
}

/// Runs the six algorithms concurrently against one shared sample.
pub struct CvPipeline {
    spots: Arc<SpotDetector>,
    pores: Arc<PoreAnalyzer>,
    wrinkles: Arc<WrinkleDetector>,
    texture: Arc<TextureAnalyzer>,
    color: Arc<ColorAnalyzer>,
    redness: Arc<RednessDetector>,
}

impl CvPipeline {
    pub fn new(config: CvAnalysisConfig) -> Result<Self, AppError> {
        config
            .validate()
            .map_err(|e| AppError::Config(format!("Invalid CV config: {}", e)))?;

        Ok(Self {
            spots: Arc::new(SpotDetector::new().with_thresholds(config.spots)),
            pores: Arc::new(PoreAnalyzer::new()),
            wrinkles: Arc::new(WrinkleDetector::new()),
            texture: Arc::new(TextureAnalyzer::new().with_thresholds(config.texture)),
            color: Arc::new(ColorAnalyzer::new().with_thresholds(config.color)),
            redness: Arc::new(RednessDetector::new().with_thresholds(config.redness)),
        })
    }

    /// Run every algorithm. Individual failures are recorded in the outcome;
    /// only a sample on which every algorithm failed is an error.
    pub async fn process(&self, sample: &ImageSample) -> Result<CvAnalysis, AppError> {
        let start_time = Instant::now();

        let (spots, pores, wrinkles, texture, color, redness) = tokio::join!(
            run_algorithm(self.spots.clone(), sample.clone()),
            run_algorithm(self.pores.clone(), sample.clone()),
            run_algorithm(self.wrinkles.clone(), sample.clone()),
            run_algorithm(self.texture.clone(), sample.clone()),
            run_algorithm(self.color.clone(), sample.clone()),
            run_algorithm(self.redness.clone(), sample.clone()),
        );

        let analysis = CvAnalysis {
            spots,
            pores,
            wrinkles,
            texture,
            color,
            redness,
        };

        debug!(
            "CV pipeline completed {}/{} algorithms in {}us",
            analysis.completed_count(),
            CvAnalysis::ALGORITHM_COUNT,
            start_time.elapsed().as_micros()
        );

        if analysis.completed_count() == 0 {
            return Err(AppError::CvPipeline(analysis.failures().join("; ")));
        }
        Ok(analysis)
    }
}

impl Default for CvPipeline {
    fn default() -> Self {
        Self {
            spots: Arc::new(SpotDetector::new()),
            pores: Arc::new(PoreAnalyzer::new()),
            wrinkles: Arc::new(WrinkleDetector::new()),
            texture: Arc::new(TextureAnalyzer::new()),
            color: Arc::new(ColorAnalyzer::new()),
            redness: Arc::new(RednessDetector::new()),
        }
    }
}

/// Pixel loops are blocking compute, so each algorithm gets a blocking worker.
async fn run_algorithm<A: SkinAlgorithm>(
    algorithm: Arc<A>,
    sample: ImageSample,
) -> AlgorithmOutcome<A::Output> {
    let name = algorithm.name();
    let joined = tokio::task::spawn_blocking(move || {
        let start_time = Instant::now();
        algorithm.analyze(&sample).map(|output| {
            let confidence = algorithm.confidence(&output);
            AlgorithmOutcome::completed(output, confidence, start_time)
        })
    })
    .await;

    let error = match joined {
        Ok(Ok(outcome)) => return outcome,
        Ok(Err(error)) => error,
        Err(join_error) => AlgorithmError::Worker {
            algorithm: name,
            reason: join_error.to_string(),
        },
    };

    warn!("{} failed: {}", name, error);
    AlgorithmOutcome::failed(&error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, RgbImage};

    #[tokio::test]
    async fn uniform_mid_grey_scenario() {
        let sample = ImageSample::from_rgb(ImageBuffer::from_pixel(100, 100, Rgb([128, 128, 128])));
        let analysis = CvPipeline::default().process(&sample).await.unwrap();

        assert_eq!(analysis.completed_count(), CvAnalysis::ALGORITHM_COUNT);

        let spots = analysis.spots.result().unwrap();
        assert_eq!(spots.count(), 0);
        assert_eq!(spots.severity.value(), 1);

        let redness = analysis.redness.result().unwrap();
        assert!(redness.regions.is_empty());
        assert_eq!(redness.severity.value(), 1);

        let color = analysis.color.result().unwrap();
        assert!((color.evenness - 10.0).abs() < 0.01);
    }

    #[tokio::test]
    async fn every_severity_is_in_range() {
        let rgb: RgbImage = ImageBuffer::from_fn(64, 48, |x, y| {
            Rgb([(x * 4) as u8, (y * 5) as u8, ((x + y) * 2) as u8])
        });
        let analysis = CvPipeline::default()
            .process(&ImageSample::from_rgb(rgb))
            .await
            .unwrap();
        for (_, severity) in analysis.severity_scores() {
            assert!((1..=10).contains(&severity.value()));
        }
    }

    #[tokio::test]
    async fn small_image_yields_partial_results() {
        // 2x2 is too small for the LBP kernel; everything else still runs
        let sample = ImageSample::from_rgb(ImageBuffer::from_pixel(2, 2, Rgb([100, 100, 100])));
        let analysis = CvPipeline::default().process(&sample).await.unwrap();

        assert!(!analysis.texture.is_completed());
        assert_eq!(analysis.texture.confidence(), 0.0);
        assert_eq!(analysis.completed_count(), 5);
        assert!(!analysis.severity_scores().contains_key(&ConcernKind::Texture));
        assert_eq!(analysis.texture_roughness(), Severity::MIDPOINT);
        assert_eq!(analysis.failures().len(), 1);
    }

    #[tokio::test]
    async fn empty_image_fails_whole_pipeline() {
        let sample = ImageSample::from_rgb(RgbImage::new(0, 0));
        let result = CvPipeline::default().process(&sample).await;
        assert!(matches!(result, Err(AppError::CvPipeline(_))));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = CvAnalysisConfig::default();
        config.color.window_size = 0;
        assert!(matches!(CvPipeline::new(config), Err(AppError::Config(_))));
    }
}
