use super::SkinAnalysisProvider;
use super::http::{encode_base64_jpeg, send_json, strip_code_fence};
use crate::common::ImageSample;
use crate::config::ProviderSettings;
use crate::error::ProviderError;
use crate::pipeline::domain::CanonicalAnalysis;
use crate::pipeline::services::normalizer::{RawProviderAnalysis, ResultNormalizer};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";

const PROMPT: &str = "Analyze the facial skin in this photo. Reply with JSON only: \
{\"skin_type\": one of normal|oily|dry|combination|sensitive, \
\"concerns\": [concern names], \
\"severity\": {concern name: integer 1-10}, \
\"recommendations\": [short care suggestions], \
\"confidence\": number 0-1}. \
Use these concern names: acne, wrinkles, fine_lines, dark_spots, hyperpigmentation, \
redness, pores, texture, dark_circles, dehydration.";

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
}

#[derive(Debug, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
pub struct Part {
    pub text: Option<String>,
}

/// Generative vision model prompted to answer in the canonical JSON shape.
pub struct GeminiProvider {
    client: reqwest::Client,
    name: String,
    endpoint: String,
    model: String,
    api_key: String,
    fast: bool,
    normalizer: ResultNormalizer,
}

impl GeminiProvider {
    pub fn new(client: reqwest::Client, api_key: String, settings: &ProviderSettings) -> Self {
        Self {
            client,
            name: settings.name.clone().unwrap_or_else(|| "gemini".to_string()),
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
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

/// Pull the model's JSON answer out of the candidate text parts.
pub fn parse_generate_response(
    provider: &str,
    response: &GenerateContentResponse,
) -> Result<RawProviderAnalysis, ProviderError> {
    let text: String = response
        .candidates
        .iter()
        .filter_map(|candidate| candidate.content.as_ref())
        .flat_map(|content| content.parts.iter())
        .filter_map(|part| part.text.as_deref())
        .collect();

    if text.trim().is_empty() {
        return Err(ProviderError::malformed(provider, "response contained no text"));
    }

    serde_json::from_str(strip_code_fence(&text))
        .map_err(|e| ProviderError::malformed(provider, format!("answer is not JSON: {}", e)))
}

#[async_trait]
impl SkinAnalysisProvider for GeminiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_fast(&self) -> bool {
        self.fast
    }

    async fn analyze(&self, image: &ImageSample) -> Result<CanonicalAnalysis, ProviderError> {
        let data = encode_base64_jpeg(&self.name, image)?;
        let body = json!({
            "contents": [{
                "parts": [
                    { "text": PROMPT },
                    { "inline_data": { "mime_type": "image/jpeg", "data": data } }
                ]
            }],
            "generationConfig": { "response_mime_type": "application/json" }
        });

        let request = self
            .client
            .post(self.url())
            .query(&[("key", self.api_key.as_str())])
            .json(&body);
        let response: GenerateContentResponse = send_json(&self.name, request).await?;
        let raw = parse_generate_response(&self.name, &response)?;
        Ok(self.normalizer.normalize(&raw))
    }
}
