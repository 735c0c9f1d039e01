use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use super::SkinAnalysisProvider;
use crate::common::ImageSample;
use crate::error::ProviderError;
use crate::pipeline::domain::CanonicalAnalysis;
use futures::Future;
use futures::task::Context;
use futures::task::Poll;
use tower::timeout::TimeoutLayer;
use tower::timeout::error::Elapsed;
use tower::util::BoxService;
use tower::{BoxError, Service, ServiceBuilder};

/// Adapts a provider to a tower service so layers can wrap it.
#[derive(Clone)]
pub struct ProviderService {
    inner: Arc<dyn SkinAnalysisProvider>,
}

impl ProviderService {
    pub fn new(inner: Arc<dyn SkinAnalysisProvider>) -> Self {
        Self { inner }
    }
}

impl Service<ImageSample> for ProviderService {
    type Response = CanonicalAnalysis;
    type Error = ProviderError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ImageSample) -> Self::Future {
        let inner = self.inner.clone();
        Box::pin(async move { inner.analyze(&req).await })
    }
}

/// Provider service bounded by a per-call timeout.
pub fn timed_provider_service(
    provider: Arc<dyn SkinAnalysisProvider>,
    timeout: Duration,
) -> BoxService<ImageSample, CanonicalAnalysis, BoxError> {
    BoxService::new(
        ServiceBuilder::new()
            .layer(TimeoutLayer::new(timeout))
            .service(ProviderService::new(provider)),
    )
}

/// Recover the provider error from the boxed error the timeout layer yields.
pub fn into_provider_error(provider: &str, timeout: Duration, error: BoxError) -> ProviderError {
    if error.is::<Elapsed>() {
        return ProviderError::Timeout {
            provider: provider.to_string(),
            after: timeout,
        };
    }
    match error.downcast::<ProviderError>() {
        Ok(error) => *error,
        Err(other) => ProviderError::Other {
            provider: provider.to_string(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::domain::SkinType;
    use async_trait::async_trait;
    use image::{ImageBuffer, Rgb};
    use tower::ServiceExt;

    struct SleepyProvider {
        delay: Duration,
    }

    #[async_trait]
    impl SkinAnalysisProvider for SleepyProvider {
        fn name(&self) -> &str {
            "sleepy"
        }

        async fn analyze(&self, _image: &ImageSample) -> Result<CanonicalAnalysis, ProviderError> {
            tokio::time::sleep(self.delay).await;
            Ok(CanonicalAnalysis {
                skin_type: SkinType::Dry,
                concerns: Default::default(),
                severity: Default::default(),
                recommendations: vec![],
                confidence: 0.9,
            })
        }
    }

    fn sample() -> ImageSample {
        ImageSample::from_rgb(ImageBuffer::from_pixel(4, 4, Rgb([10, 20, 30])))
    }

    #[tokio::test]
    async fn test_provider_service() {
        let mut service = ProviderService::new(Arc::new(SleepyProvider {
            delay: Duration::from_millis(1),
        }));
        let response = service.call(sample()).await.unwrap();
        assert_eq!(response.skin_type, SkinType::Dry);
    }

    #[tokio::test]
    async fn timeout_maps_to_provider_timeout() {
        let timeout = Duration::from_millis(20);
        let service = timed_provider_service(
            Arc::new(SleepyProvider {
                delay: Duration::from_secs(5),
            }),
            timeout,
        );
        let error = service.oneshot(sample()).await.unwrap_err();
        let error = into_provider_error("sleepy", timeout, error);
        assert!(matches!(error, ProviderError::Timeout { after, .. } if after == timeout));
    }

    #[test]
    fn inner_errors_survive_boxing() {
        let boxed: BoxError = Box::new(ProviderError::malformed("sleepy", "no json"));
        let error = into_provider_error("sleepy", Duration::from_secs(1), boxed);
        assert!(matches!(error, ProviderError::MalformedResponse { .. }));
    }
}
