use super::canonical_analysis::CanonicalAnalysis;
use super::concern::ConcernKind;
use crate::pipeline::context::metrics::AnalysisTimings;
use crate::pipeline::services::image::analysis::CvAnalysis;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use uuid::Uuid;

pub const LOCAL_PROVENANCE: &str = "local";

/// Which subsystem produced the AI-derived portion of a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provenance {
    Provider(String),
    Local,
}

impl Provenance {
    pub fn is_local(&self) -> bool {
        matches!(self, Provenance::Local)
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Provider(name) => f.write_str(name),
            Provenance::Local => f.write_str(LOCAL_PROVENANCE),
        }
    }
}

impl Serialize for Provenance {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PercentileMethod {
    Statistical,
    Cohort,
}

/// "Worse than `value`% of people" for one metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PercentileScore {
    pub value: u8,
    pub method: PercentileMethod,
}

#[derive(Debug, Clone, Serialize)]
pub struct HybridResult {
    pub analysis_id: Uuid,
    pub analyzed_at: DateTime<Utc>,
    pub analysis: CanonicalAnalysis,
    pub cv: CvAnalysis,
    pub percentiles: IndexMap<ConcernKind, PercentileScore>,
    pub provenance: Provenance,
    pub confidence: f32,
    pub timings: AnalysisTimings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provenance_serializes_as_plain_name() {
        let remote = serde_json::to_string(&Provenance::Provider("gemini".to_string())).unwrap();
        let local = serde_json::to_string(&Provenance::Local).unwrap();
        assert_eq!(remote, "\"gemini\"");
        assert_eq!(local, "\"local\"");
    }
}
