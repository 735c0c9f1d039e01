pub mod gemini;
pub mod hosted_vision;
pub mod http;
pub mod mode;
pub mod open_inference;
pub mod race;
pub mod service;

use crate::common::ImageSample;
use crate::config::{ProviderKind, ProviderSettings};
use crate::error::{AppError, ProviderError};
use crate::pipeline::domain::CanonicalAnalysis;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

pub use gemini::GeminiProvider;
pub use hosted_vision::HostedVisionProvider;
pub use mode::AnalysisMode;
pub use open_inference::OpenInferenceProvider;
pub use race::{ProviderRace, RaceWinner};

/// Remote skin-analysis back-end. Adapters are interchangeable: each one turns
/// a sample into the canonical schema or fails with its own error.
#[async_trait]
pub trait SkinAnalysisProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Hint for the prefer-fast mode.
    fn is_fast(&self) -> bool {
        false
    }

    async fn analyze(&self, image: &ImageSample) -> Result<CanonicalAnalysis, ProviderError>;
}

/// Build the configured adapters, sharing one HTTP client. Adapters missing a
/// required API key are skipped with a warning.
pub fn build_providers(
    settings: &[ProviderSettings],
    client: reqwest::Client,
) -> Result<Vec<Arc<dyn SkinAnalysisProvider>>, AppError> {
    let mut providers: Vec<Arc<dyn SkinAnalysisProvider>> = Vec::new();

    for entry in settings {
        let Some(api_key) = entry.api_key.clone().filter(|key| !key.is_empty()) else {
            warn!("Skipping {:?} provider: no API key configured", entry.kind);
            continue;
        };

        let provider: Arc<dyn SkinAnalysisProvider> = match entry.kind {
            ProviderKind::Gemini => Arc::new(GeminiProvider::new(client.clone(), api_key, entry)),
            ProviderKind::HostedVision => {
                let endpoint = entry.endpoint.clone().ok_or_else(|| {
                    AppError::Config("hosted_vision provider requires an endpoint".to_string())
                })?;
                Arc::new(HostedVisionProvider::new(client.clone(), api_key, endpoint, entry))
            }
            ProviderKind::OpenInference => {
                Arc::new(OpenInferenceProvider::new(client.clone(), api_key, entry))
            }
        };
        providers.push(provider);
    }

    Ok(providers)
}
