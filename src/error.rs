use std::time::Duration;
use thiserror::Error;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Image could not be decoded: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Image rejected: {0}")]
    Validation(#[from] ValidationError),
    #[error("Every CV algorithm failed: {0}")]
    CvPipeline(String),
    #[error("Configuration Error: {0}")]
    Config(String),
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

// Face validation precondition failures

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("No face detected in the image")]
    NoFace,
    #[error("Expected exactly one face, found {0}")]
    MultipleFaces(usize),
    #[error("The image is too blurry")]
    Blurry,
    #[error("The image is too dark")]
    Underexposed,
    #[error("Face detection confidence {confidence:.2} is below {minimum:.2}")]
    LowConfidence { confidence: f32, minimum: f32 },
    #[error("Face validation service failed: {0}")]
    Service(String),
    #[error("{0}")]
    Rejected(String),
}

// Remote provider errors, recovered by the race

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{provider}: request failed: {source}")]
    Http {
        provider: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{provider}: service returned status {status}")]
    Status { provider: String, status: u16 },
    #[error("{provider}: malformed response: {reason}")]
    MalformedResponse { provider: String, reason: String },
    #[error("{provider}: timed out after {after:?}")]
    Timeout { provider: String, after: Duration },
    #[error("{provider}: not configured: {reason}")]
    NotConfigured { provider: String, reason: String },
    #[error("{provider}: could not encode image: {reason}")]
    Encode { provider: String, reason: String },
    #[error("{provider}: {reason}")]
    Other { provider: String, reason: String },
}

impl ProviderError {
    pub fn malformed(provider: &str, reason: impl Into<String>) -> Self {
        ProviderError::MalformedResponse {
            provider: provider.to_string(),
            reason: reason.into(),
        }
    }
}

/// One provider's failure inside an aggregate race failure.
#[derive(Debug)]
pub struct ProviderFailure {
    pub provider: String,
    pub error: ProviderError,
}

#[derive(Error, Debug)]
#[error("All {} providers failed: [{}]", .failures.len(), summarize(.failures))]
pub struct AggregateProviderFailure {
    pub failures: Vec<ProviderFailure>,
}

fn summarize(failures: &[ProviderFailure]) -> String {
    failures
        .iter()
        .map(|f| f.error.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

// CV algorithm errors, recorded per algorithm

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlgorithmError {
    #[error("{algorithm}: image has no pixels")]
    EmptyImage { algorithm: &'static str },
    #[error("{algorithm}: image {width}x{height} is smaller than the {min}x{min} minimum")]
    ImageTooSmall {
        algorithm: &'static str,
        width: u32,
        height: u32,
        min: u32,
    },
    #[error("{algorithm}: worker failed: {reason}")]
    Worker {
        algorithm: &'static str,
        reason: String,
    },
}

// Cohort store errors, recovered by the statistical approximation

#[derive(Error, Debug)]
pub enum PercentileStoreError {
    #[error("Cohort store unavailable: {0}")]
    Unavailable(String),
    #[error("Failed to read cohort file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse cohort file: {0}")]
    Parse(#[from] serde_json::Error),
}
