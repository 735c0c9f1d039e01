use crate::error::AppError;
use crate::pipeline::services::image::CvAnalysisConfig;
use crate::pipeline::services::providers::AnalysisMode;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "DERMASCAN";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Gemini,
    HostedVision,
    OpenInference,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub fast: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub provider_timeout_secs: u64,
    pub mode: AnalysisMode,
    pub min_cohort: usize,
    pub cohort_path: Option<PathBuf>,
    pub min_face_confidence: f32,
    pub face_validator_endpoint: Option<String>,
    pub log_level: String,
    pub providers: Vec<ProviderSettings>,
    pub cv: CvAnalysisConfig,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            provider_timeout_secs: 30,
            mode: AnalysisMode::Auto,
            min_cohort: 50,
            cohort_path: None,
            min_face_confidence: 0.6,
            face_validator_endpoint: None,
            log_level: "info".to_string(),
            providers: Vec::new(),
            cv: CvAnalysisConfig::default(),
        }
    }
}

impl Configuration {
    /// Defaults, then the optional file, then `DERMASCAN__*` variables
    /// (e.g. `DERMASCAN__MODE=local-only`).
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(true));
        }
        let configuration: Configuration = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        configuration.validate().map_err(AppError::Config)?;
        Ok(configuration)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.provider_timeout_secs == 0 {
            return Err("provider_timeout_secs must be greater than 0".to_string());
        }
        if self.min_cohort == 0 {
            return Err("min_cohort must be greater than 0".to_string());
        }
        if !(0.0..=1.0).contains(&self.min_face_confidence) {
            return Err("min_face_confidence must be between 0.0 and 1.0".to_string());
        }
        if self.log_level.parse::<tracing::Level>().is_err() {
            return Err(format!("log_level '{}' is not a tracing level", self.log_level));
        }
        for provider in &self.providers {
            if matches!(provider.kind, ProviderKind::HostedVision) && provider.endpoint.is_none() {
                return Err("hosted_vision providers require an endpoint".to_string());
            }
        }
        self.cv.validate()
    }
}
