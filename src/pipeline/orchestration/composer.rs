use crate::common::ImageSample;
use crate::config::Configuration;
use crate::error::AppError;
use crate::pipeline::context::{AnalysisPhase, AnalysisTimings};
use crate::pipeline::domain::{CanonicalAnalysis, HybridResult, Provenance};
use crate::pipeline::services::face_validation::{
    FaceValidator, ImageQualityValidator, RemoteFaceValidator,
};
use crate::pipeline::services::fallback::FallbackSynthesizer;
use crate::pipeline::services::normalizer::ResultNormalizer;
use crate::pipeline::services::image::{CvAnalysis, CvAnalysisConfig, CvPipeline};
use crate::pipeline::services::percentile::{CohortStore, InMemoryCohortStore, PercentileEngine};
use crate::pipeline::services::providers::race::DEFAULT_PROVIDER_TIMEOUT;
use crate::pipeline::services::providers::{
    AnalysisMode, ProviderRace, SkinAnalysisProvider, build_providers, http,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// CV concerns at or above this severity are added when a provider missed them.
const CV_CONCERN_MERGE_MIN: u8 = 7;

/// Runs validation, the provider race, the CV pipeline and percentile ranking
/// for one image, and assembles the hybrid result.
pub struct HybridComposer {
    validator: Arc<dyn FaceValidator>,
    race: ProviderRace,
    cv: CvPipeline,
    normalizer: ResultNormalizer,
    fallback: FallbackSynthesizer,
    percentiles: PercentileEngine,
    mode: AnalysisMode,
}

impl HybridComposer {
    pub fn builder() -> HybridComposerBuilder {
        HybridComposerBuilder::new()
    }

    pub fn mode(&self) -> AnalysisMode {
        self.mode
    }

    pub async fn analyze_bytes(&self, bytes: &[u8]) -> Result<HybridResult, AppError> {
        let image = ImageSample::decode(bytes)?;
        self.analyze(&image).await
    }

    #[instrument(skip(self, image), fields(mode = %self.mode, width = image.width(), height = image.height()))]
    pub async fn analyze(&self, image: &ImageSample) -> Result<HybridResult, AppError> {
        let mut timings = AnalysisTimings::new();

        let validation_start = Instant::now();
        self.validator.validate_image(image).await.into_result()?;
        timings.record_phase(AnalysisPhase::Validation, validation_start.elapsed());

        let race = async {
            if !self.mode.uses_providers() {
                return None;
            }
            let start_time = Instant::now();
            let outcome = self.race.race(image, self.mode).await;
            Some((outcome, start_time.elapsed()))
        };
        let cv = async {
            let start_time = Instant::now();
            (self.cv.process(image).await, start_time.elapsed())
        };
        let (race_outcome, (cv_result, cv_elapsed)) = tokio::join!(race, cv);

        timings.record_phase(AnalysisPhase::CvPipeline, cv_elapsed);
        let cv = cv_result?;

        let (analysis, provenance) = match race_outcome {
            Some((Ok(winner), elapsed)) => {
                timings.record_phase(AnalysisPhase::ProviderRace, elapsed);
                // Third-party providers may return sparse analyses.
                let analysis = self.normalizer.conform(winner.analysis);
                let analysis = merge_cv_concerns(analysis, &cv);
                (analysis, Provenance::Provider(winner.provider))
            }
            Some((Err(failure), elapsed)) => {
                timings.record_phase(AnalysisPhase::ProviderRace, elapsed);
                warn!("{}; synthesizing from CV output", failure);
                (self.fallback.synthesize(&cv), Provenance::Local)
            }
            None => {
                debug!("Local-only mode, skipping providers");
                (self.fallback.synthesize(&cv), Provenance::Local)
            }
        };

        let percentile_start = Instant::now();
        let percentiles = self.percentiles.percentiles(&cv.severity_scores()).await;
        timings.record_phase(AnalysisPhase::Percentiles, percentile_start.elapsed());
        timings.finish();

        info!(
            "Analysis by {} finished in {}ms ({}/{} CV algorithms)",
            provenance,
            timings.total().as_millis(),
            cv.completed_count(),
            CvAnalysis::ALGORITHM_COUNT
        );

        Ok(HybridResult {
            analysis_id: Uuid::new_v4(),
            analyzed_at: Utc::now(),
            confidence: analysis.confidence,
            analysis,
            cv,
            percentiles,
            provenance,
            timings,
        })
    }
}

/// Appends severe CV findings the provider did not report.
pub fn merge_cv_concerns(mut analysis: CanonicalAnalysis, cv: &CvAnalysis) -> CanonicalAnalysis {
    for (kind, severity) in cv.severity_scores() {
        if severity.value() >= CV_CONCERN_MERGE_MIN && analysis.concerns.insert(kind) {
            debug!("Added CV-detected {} (severity {})", kind, severity);
        }
    }
    analysis
}

pub struct HybridComposerBuilder {
    validator: Option<Arc<dyn FaceValidator>>,
    providers: Vec<Arc<dyn SkinAnalysisProvider>>,
    provider_timeout: Duration,
    cv_config: CvAnalysisConfig,
    cohort_store: Option<Arc<dyn CohortStore>>,
    min_cohort: Option<usize>,
    mode: AnalysisMode,
}

impl HybridComposerBuilder {
    pub fn new() -> Self {
        Self {
            validator: None,
            providers: Vec::new(),
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            cv_config: CvAnalysisConfig::default(),
            cohort_store: None,
            min_cohort: None,
            mode: AnalysisMode::default(),
        }
    }

    /// Builder populated from configuration: HTTP adapters, the face
    /// validator and the cohort file. An unreadable cohort file is logged and
    /// percentiles use the statistical estimate.
    pub async fn from_configuration(configuration: &Configuration) -> Result<Self, AppError> {
        let client = http::build_client()
            .map_err(|e| AppError::Config(format!("HTTP client: {}", e)))?;

        let validator: Arc<dyn FaceValidator> = match &configuration.face_validator_endpoint {
            Some(endpoint) => Arc::new(RemoteFaceValidator::new(
                client.clone(),
                endpoint.clone(),
                configuration.min_face_confidence,
            )),
            None => Arc::new(
                ImageQualityValidator::new().with_min_confidence(configuration.min_face_confidence),
            ),
        };

        let mut builder = Self::new()
            .validator(validator)
            .providers(build_providers(&configuration.providers, client)?)
            .provider_timeout(configuration.provider_timeout())
            .cv_config(configuration.cv.clone())
            .min_cohort(configuration.min_cohort)
            .mode(configuration.mode);

        if let Some(path) = &configuration.cohort_path {
            match InMemoryCohortStore::load_json(path).await {
                Ok(store) => builder = builder.cohort_store(Arc::new(store)),
                Err(e) => warn!("Cohort store unavailable, using statistical percentiles: {}", e),
            }
        }
        Ok(builder)
    }

    pub fn validator(mut self, validator: Arc<dyn FaceValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn provider(mut self, provider: Arc<dyn SkinAnalysisProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn providers(mut self, providers: Vec<Arc<dyn SkinAnalysisProvider>>) -> Self {
        self.providers.extend(providers);
        self
    }

    // Per-provider timeout, this will override the default of 30s.
    pub fn provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    pub fn cv_config(mut self, cv_config: CvAnalysisConfig) -> Self {
        self.cv_config = cv_config;
        self
    }

    pub fn cohort_store(mut self, store: Arc<dyn CohortStore>) -> Self {
        self.cohort_store = Some(store);
        self
    }

    pub fn min_cohort(mut self, min_cohort: usize) -> Self {
        self.min_cohort = Some(min_cohort);
        self
    }

    pub fn mode(mut self, mode: AnalysisMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn build(self) -> Result<HybridComposer, AppError> {
        let validator = self
            .validator
            .ok_or(AppError::Config("Face validator not set".to_string()))?;

        let mut percentiles = PercentileEngine::new();
        if let Some(store) = self.cohort_store {
            percentiles = percentiles.with_store(store);
        }
        if let Some(min_cohort) = self.min_cohort {
            percentiles = percentiles.with_min_cohort(min_cohort);
        }

        if self.mode.uses_providers() && self.providers.is_empty() {
            warn!("No providers configured; every analysis will be synthesized locally");
        }

        Ok(HybridComposer {
            validator,
            race: ProviderRace::new(self.providers).with_timeout(self.provider_timeout),
            cv: CvPipeline::new(self.cv_config)?,
            normalizer: ResultNormalizer::new(),
            fallback: FallbackSynthesizer::new(),
            percentiles,
            mode: self.mode,
        })
    }
}

impl Default for HybridComposerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
