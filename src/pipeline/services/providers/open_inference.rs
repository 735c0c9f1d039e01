use super::SkinAnalysisProvider;
use super::http::{encode_jpeg, send_json};
use crate::common::ImageSample;
use crate::config::ProviderSettings;
use crate::error::ProviderError;
use crate::pipeline::domain::CanonicalAnalysis;
use crate::pipeline::services::normalizer::{RawProviderAnalysis, ResultNormalizer};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Value, json};

const DEFAULT_ENDPOINT: &str = "https://api-inference.huggingface.co";
const DEFAULT_MODEL: &str = "dermnet/skin-condition-classifier";

const LABEL_THRESHOLD: f64 = 0.3;

#[derive(Debug, Clone, Deserialize)]
pub struct ClassificationLabel {
    pub label: String,
    pub score: f64,
}

/// Open inference API serving an image-classification model. Sends raw JPEG
/// bytes and receives a ranked label list.
pub struct OpenInferenceProvider {
    client: reqwest::Client,
    name: String,
    endpoint: String,
    model: String,
    api_key: String,
    fast: bool,
    normalizer: ResultNormalizer,
}

impl OpenInferenceProvider {
    pub fn new(client: reqwest::Client, api_key: String, settings: &ProviderSettings) -> Self {
        Self {
            client,
            name: settings
                .name
                .clone()
                .unwrap_or_else(|| "open_inference".to_string()),
            endpoint: settings
                .endpoint
                .clone()
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            model: settings.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_key,
            fast: settings.fast,
            normalizer: ResultNormalizer::new(),
        }
    }

    fn url(&self) -> String {
        format!("{}/models/{}", self.endpoint.trim_end_matches('/'), self.model)
    }
}

/// Labels are scores in [0, 1]; the top score stands in for confidence. The
/// best "<type> skin" label is taken as the skin type before any concern match.
pub fn parse_classification(
    labels: &[ClassificationLabel],
) -> Result<RawProviderAnalysis, ProviderError> {
    if labels.is_empty() {
        return Err(ProviderError::malformed("open_inference", "no labels returned"));
    }

    let normalizer = ResultNormalizer::new();
    let mut ranked = labels.to_vec();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut raw = RawProviderAnalysis {
        confidence: ranked.first().map(|top| json!(top.score)).unwrap_or_default(),
        recommendations: Value::Null,
        ..Default::default()
    };
    let mut concerns = Vec::new();
    let mut severity = IndexMap::new();

    for label in &ranked {
        if normalizer.skin_type_label(&label.label).is_some() {
            if raw.skin_type.is_none() {
                raw.skin_type = Some(label.label.clone());
            }
        } else if normalizer.normalize_concern(&label.label).is_some() {
            if label.score >= LABEL_THRESHOLD {
                concerns.push(label.label.clone());
            }
            severity.insert(label.label.clone(), json!(label.score * 10.0));
        }
    }
    raw.concerns = Value::from(concerns);
    raw.severity = severity;
    Ok(raw)
}

#[async_trait]
impl SkinAnalysisProvider for OpenInferenceProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_fast(&self) -> bool {
        self.fast
    }

    async fn analyze(&self, image: &ImageSample) -> Result<CanonicalAnalysis, ProviderError> {
        let bytes = encode_jpeg(&self.name, image)?;
        let request = self
            .client
            .post(self.url())
            .bearer_auth(&self.api_key)
            .header(reqwest::header::CONTENT_TYPE, "image/jpeg")
            .body(bytes);
        let labels: Vec<ClassificationLabel> = send_json(&self.name, request).await?;
        let raw = parse_classification(&labels).map_err(|error| match error {
            ProviderError::MalformedResponse { reason, .. } => {
                ProviderError::malformed(&self.name, reason)
            }
            other => other,
        })?;
        Ok(self.normalizer.normalize(&raw))
    }
}
