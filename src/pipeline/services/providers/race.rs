use super::SkinAnalysisProvider;
use super::mode::AnalysisMode;
use super::service::{into_provider_error, timed_provider_service};
use crate::common::ImageSample;
use crate::error::{AggregateProviderFailure, ProviderFailure};
use crate::pipeline::domain::CanonicalAnalysis;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::ServiceExt;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

/// First successful provider response.
#[derive(Debug, Clone)]
pub struct RaceWinner {
    pub provider: String,
    pub analysis: CanonicalAnalysis,
    pub elapsed: Duration,
}

/// Runs every provider concurrently and keeps the first success.
#[derive(Clone)]
pub struct ProviderRace {
    providers: Vec<Arc<dyn SkinAnalysisProvider>>,
    timeout: Duration,
}

impl ProviderRace {
    pub fn new(providers: Vec<Arc<dyn SkinAnalysisProvider>>) -> Self {
        Self {
            providers,
            timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn providers(&self) -> &[Arc<dyn SkinAnalysisProvider>] {
        &self.providers
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolves with the first provider to succeed. Requests still in flight
    /// are dropped, which cancels them. Fails only once every provider has.
    #[instrument(skip(self, image), fields(providers = self.providers.len(), mode = %mode))]
    pub async fn race(
        &self,
        image: &ImageSample,
        mode: AnalysisMode,
    ) -> Result<RaceWinner, AggregateProviderFailure> {
        let start_time = Instant::now();
        let timeout = self.timeout;

        let mut in_flight: FuturesUnordered<_> = mode
            .order(&self.providers)
            .into_iter()
            .map(|provider| {
                let name = provider.name().to_string();
                let service = timed_provider_service(provider, timeout);
                let image = image.clone();
                async move {
                    let result = service
                        .oneshot(image)
                        .await
                        .map_err(|error| into_provider_error(&name, timeout, error));
                    (name, result)
                }
            })
            .collect();

        let mut failures = Vec::new();
        while let Some((provider, result)) = in_flight.next().await {
            match result {
                Ok(analysis) => {
                    let elapsed = start_time.elapsed();
                    info!("{} won the race in {}ms", provider, elapsed.as_millis());
                    debug!("Cancelling {} in-flight provider requests", in_flight.len());
                    return Ok(RaceWinner {
                        provider,
                        analysis,
                        elapsed,
                    });
                }
                Err(error) => {
                    warn!("Provider failed: {}", error);
                    failures.push(ProviderFailure { provider, error });
                }
            }
        }

        Err(AggregateProviderFailure { failures })
    }
}
