use super::SkinAnalysisProvider;
use super::http::{encode_base64_jpeg, send_json};
use crate::common::ImageSample;
use crate::config::ProviderSettings;
use crate::error::ProviderError;
use crate::pipeline::domain::CanonicalAnalysis;
use crate::pipeline::services::normalizer::{RawProviderAnalysis, ResultNormalizer};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Value, json};

/// Detections below this score are not reported as concerns.
const DETECTION_THRESHOLD: f64 = 0.5;

#[derive(Debug, Deserialize)]
pub struct HostedVisionResponse {
    #[serde(default, alias = "skinType")]
    pub skin_type: Option<String>,
    #[serde(default)]
    pub detections: Vec<Detection>,
    #[serde(default)]
    pub recommendations: Value,
    #[serde(default)]
    pub confidence: Value,
}

#[derive(Debug, Deserialize)]
pub struct Detection {
    pub label: String,
    /// Detector confidence in [0, 1].
    pub score: f64,
    /// Optional graded severity, 1-10.
    #[serde(default)]
    pub severity: Option<f64>,
}

/// Hosted classification service returning scored detections per label.
pub struct HostedVisionProvider {
    client: reqwest::Client,
    name: String,
    endpoint: String,
    api_key: String,
    fast: bool,
    normalizer: ResultNormalizer,
}

impl HostedVisionProvider {
    pub fn new(
        client: reqwest::Client,
        api_key: String,
        endpoint: String,
        settings: &ProviderSettings,
    ) -> Self {
        Self {
            client,
            name: settings
                .name
                .clone()
                .unwrap_or_else(|| "hosted_vision".to_string()),
            endpoint,
            api_key,
            fast: settings.fast,
            normalizer: ResultNormalizer::new(),
        }
    }
}

pub fn parse_hosted_response(response: HostedVisionResponse) -> RawProviderAnalysis {
    let mut concerns = Vec::new();
    let mut severity = IndexMap::new();

    for detection in response.detections {
        let graded = detection.severity.unwrap_or(detection.score * 10.0);
        if detection.score >= DETECTION_THRESHOLD {
            concerns.push(detection.label.clone());
        }
        severity.insert(detection.label, json!(graded));
    }

    RawProviderAnalysis {
        skin_type: response.skin_type,
        concerns: Value::from(concerns),
        severity,
        recommendations: response.recommendations,
        confidence: response.confidence,
    }
}

#[async_trait]
impl SkinAnalysisProvider for HostedVisionProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_fast(&self) -> bool {
        self.fast
    }

    async fn analyze(&self, image: &ImageSample) -> Result<CanonicalAnalysis, ProviderError> {
        let body = json!({
            "image": encode_base64_jpeg(&self.name, image)?,
            "features": ["skin_analysis"],
        });
        let request = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body);
        let response: HostedVisionResponse = send_json(&self.name, request).await?;
        Ok(self.normalizer.normalize(&parse_hosted_response(response)))
    }
}
