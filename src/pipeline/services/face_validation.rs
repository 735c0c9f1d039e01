use crate::common::ImageSample;
use crate::error::ValidationError;
use crate::pipeline::services::providers::http::{encode_base64_jpeg, send_json};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

pub const DEFAULT_MIN_FACE_CONFIDENCE: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceQuality {
    #[serde(alias = "isBlurry")]
    pub is_blurry: bool,
    #[serde(alias = "isDark")]
    pub is_dark: bool,
    pub confidence: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceDetection {
    #[serde(alias = "hasFace")]
    pub has_face: bool,
    #[serde(alias = "faceCount")]
    pub face_count: usize,
    pub quality: FaceQuality,
}

impl FaceDetection {
    /// Precondition checks, first failure wins.
    pub fn check(&self, min_confidence: f32) -> Result<(), ValidationError> {
        if !self.has_face || self.face_count == 0 {
            return Err(ValidationError::NoFace);
        }
        if self.face_count > 1 {
            return Err(ValidationError::MultipleFaces(self.face_count));
        }
        if self.quality.is_blurry {
            return Err(ValidationError::Blurry);
        }
        if self.quality.is_dark {
            return Err(ValidationError::Underexposed);
        }
        if self.quality.confidence < min_confidence {
            return Err(ValidationError::LowConfidence {
                confidence: self.quality.confidence,
                minimum: min_confidence,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageValidation {
    pub is_valid: bool,
    pub reason: Option<ValidationError>,
}

impl ImageValidation {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            reason: None,
        }
    }

    pub fn invalid(reason: ValidationError) -> Self {
        Self {
            is_valid: false,
            reason: Some(reason),
        }
    }

    pub fn into_result(self) -> Result<(), ValidationError> {
        match self.reason {
            Some(reason) => Err(reason),
            None if self.is_valid => Ok(()),
            None => Err(ValidationError::Rejected("image failed validation".to_string())),
        }
    }
}

/// Decides whether a sample is fit for analysis.
#[async_trait]
pub trait FaceValidator: Send + Sync {
    async fn detect_face(&self, image: &ImageSample) -> Result<FaceDetection, ValidationError>;

    fn min_confidence(&self) -> f32 {
        DEFAULT_MIN_FACE_CONFIDENCE
    }

    async fn validate_image(&self, image: &ImageSample) -> ImageValidation {
        let outcome = self
            .detect_face(image)
            .await
            .and_then(|detection| detection.check(self.min_confidence()));
        match outcome {
            Ok(()) => ImageValidation::valid(),
            Err(reason) => ImageValidation::invalid(reason),
        }
    }
}

/// Local blur and exposure gate. It cannot locate faces, so it reports one
/// face and leaves framing to the caller.
#[derive(Debug, Clone)]
pub struct ImageQualityValidator {
    min_sharpness: f64,
    min_brightness: f64,
    min_confidence: f32,
}

impl ImageQualityValidator {
    /// Laplacian variance below this reads as out of focus.
    pub const DEFAULT_MIN_SHARPNESS: f64 = 15.0;
    /// Mean luma below this reads as underexposed.
    pub const DEFAULT_MIN_BRIGHTNESS: f64 = 40.0;

    const FRAMING_CONFIDENCE: f32 = 0.9;

    pub fn new() -> Self {
        Self {
            min_sharpness: Self::DEFAULT_MIN_SHARPNESS,
            min_brightness: Self::DEFAULT_MIN_BRIGHTNESS,
            min_confidence: DEFAULT_MIN_FACE_CONFIDENCE,
        }
    }

    pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    pub fn with_thresholds(mut self, min_sharpness: f64, min_brightness: f64) -> Self {
        self.min_sharpness = min_sharpness;
        self.min_brightness = min_brightness;
        self
    }
}

impl Default for ImageQualityValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Variance of the 4-neighbour Laplacian over interior pixels.
pub fn laplacian_variance(image: &ImageSample) -> f64 {
    let (width, height) = image.dimensions();
    if width < 3 || height < 3 {
        return 0.0;
    }
    let gray = image.to_gray();
    let at = |x: u32, y: u32| gray.get_pixel(x, y)[0] as f64;

    let mut responses = Vec::with_capacity(((width - 2) * (height - 2)) as usize);
    for y in 1..height - 1 {
        for x in 1..width - 1 {
            responses.push(at(x - 1, y) + at(x + 1, y) + at(x, y - 1) + at(x, y + 1) - 4.0 * at(x, y));
        }
    }
    let mean = responses.iter().sum::<f64>() / responses.len() as f64;
    responses.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / responses.len() as f64
}

#[async_trait]
impl FaceValidator for ImageQualityValidator {
    async fn detect_face(&self, image: &ImageSample) -> Result<FaceDetection, ValidationError> {
        if image.is_empty() {
            return Ok(FaceDetection {
                has_face: false,
                face_count: 0,
                quality: FaceQuality {
                    is_blurry: false,
                    is_dark: false,
                    confidence: 0.0,
                },
            });
        }

        let brightness = image.brightness();
        let mean_brightness = brightness.iter().sum::<f64>() / brightness.len() as f64;
        let sharpness = laplacian_variance(image);
        debug!(sharpness, mean_brightness, "Image quality measured");

        Ok(FaceDetection {
            has_face: true,
            face_count: 1,
            quality: FaceQuality {
                is_blurry: sharpness < self.min_sharpness,
                is_dark: mean_brightness < self.min_brightness,
                confidence: Self::FRAMING_CONFIDENCE,
            },
        })
    }

    fn min_confidence(&self) -> f32 {
        self.min_confidence
    }
}

/// Face detection behind an HTTP JSON endpoint.
pub struct RemoteFaceValidator {
    client: reqwest::Client,
    endpoint: String,
    min_confidence: f32,
}

impl RemoteFaceValidator {
    pub fn new(client: reqwest::Client, endpoint: String, min_confidence: f32) -> Self {
        Self {
            client,
            endpoint,
            min_confidence,
        }
    }
}

#[async_trait]
impl FaceValidator for RemoteFaceValidator {
    async fn detect_face(&self, image: &ImageSample) -> Result<FaceDetection, ValidationError> {
        const NAME: &str = "face_validator";
        let encoded = encode_base64_jpeg(NAME, image)
            .map_err(|e| ValidationError::Service(e.to_string()))?;
        let body = json!({ "image": encoded });
        let request = self.client.post(&self.endpoint).json(&body);
        send_json(NAME, request)
            .await
            .map_err(|e| ValidationError::Service(e.to_string()))
    }

    fn min_confidence(&self) -> f32 {
        self.min_confidence
    }
}
