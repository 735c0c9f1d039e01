use super::SkinAnalysisProvider;
use serde::Deserialize;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::warn;

/// How the composer uses remote providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "String")]
pub enum AnalysisMode {
    /// Skip providers; the local synthesis is the result.
    LocalOnly,
    /// Race every provider, fast ones launched first.
    PreferFast,
    #[default]
    Auto,
}

impl AnalysisMode {
    pub fn key(&self) -> &'static str {
        match self {
            AnalysisMode::LocalOnly => "local-only",
            AnalysisMode::PreferFast => "prefer-fast",
            AnalysisMode::Auto => "auto",
        }
    }

    pub fn uses_providers(&self) -> bool {
        !matches!(self, AnalysisMode::LocalOnly)
    }

    /// Launch order for the race.
    pub fn order(
        &self,
        providers: &[Arc<dyn SkinAnalysisProvider>],
    ) -> Vec<Arc<dyn SkinAnalysisProvider>> {
        match self {
            AnalysisMode::LocalOnly => Vec::new(),
            AnalysisMode::Auto => providers.to_vec(),
            AnalysisMode::PreferFast => {
                let (mut fast, slow): (Vec<_>, Vec<_>) =
                    providers.iter().cloned().partition(|p| p.is_fast());
                fast.extend(slow);
                fast
            }
        }
    }
}

impl FromStr for AnalysisMode {
    type Err = Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mode = match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "local-only" | "local" => AnalysisMode::LocalOnly,
            "prefer-fast" | "fast" => AnalysisMode::PreferFast,
            "auto" => AnalysisMode::Auto,
            other => {
                warn!("Unknown analysis mode '{}', using auto", other);
                AnalysisMode::Auto
            }
        };
        Ok(mode)
    }
}

impl From<String> for AnalysisMode {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(mode) => mode,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}
