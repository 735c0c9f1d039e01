//! Request plumbing shared by the HTTP adapters.

use crate::common::ImageSample;
use crate::error::ProviderError;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::de::DeserializeOwned;
use std::time::Duration;

const USER_AGENT: &str = concat!("dermascan/", env!("CARGO_PKG_VERSION"));

/// Shared client for every adapter. The race enforces the per-call timeout;
/// this one only bounds connection setup.
pub fn build_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(10))
        .build()
}

pub fn encode_jpeg(provider: &str, image: &ImageSample) -> Result<Vec<u8>, ProviderError> {
    image.encode_jpeg().map_err(|e| ProviderError::Encode {
        provider: provider.to_string(),
        reason: e.to_string(),
    })
}

pub fn encode_base64_jpeg(provider: &str, image: &ImageSample) -> Result<String, ProviderError> {
    Ok(STANDARD.encode(encode_jpeg(provider, image)?))
}

/// Send the request and decode a JSON body, mapping transport and status
/// failures onto the provider's error.
pub async fn send_json<T: DeserializeOwned>(
    provider: &str,
    request: reqwest::RequestBuilder,
) -> Result<T, ProviderError> {
    let response = request.send().await.map_err(|source| ProviderError::Http {
        provider: provider.to_string(),
        source,
    })?;

    let status = response.status();
    if !status.is_success() {
        tracing::debug!(provider, status = status.as_u16(), "Provider rejected request");
        return Err(ProviderError::Status {
            provider: provider.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.text().await.map_err(|source| ProviderError::Http {
        provider: provider.to_string(),
        source,
    })?;
    serde_json::from_str(&body).map_err(|e| ProviderError::malformed(provider, e.to_string()))
}

/// Drop a surrounding markdown code fence, which language models add around
/// JSON even when asked not to.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    #[test]
    fn strips_fences() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n[]\n```"), "[]");
        assert_eq!(strip_code_fence("  {}  "), "{}");
    }

    #[test]
    fn base64_payload_decodes_to_jpeg() {
        let sample = ImageSample::from_rgb(ImageBuffer::from_pixel(16, 16, Rgb([200, 150, 120])));
        let encoded = encode_base64_jpeg("test", &sample).unwrap();
        let bytes = STANDARD.decode(encoded).unwrap();
        // JPEG SOI marker
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }
}
