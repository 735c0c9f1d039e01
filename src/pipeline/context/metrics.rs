use indexmap::IndexMap;
use serde::Serialize;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisPhase {
    Validation,
    ProviderRace,
    CvPipeline,
    Percentiles,
}

/// Wall-clock timings collected while composing one result
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisTimings {
    #[serde(serialize_with = "serialize_phase_micros")]
    phase_durations: IndexMap<AnalysisPhase, Duration>,
    #[serde(rename = "total_us", serialize_with = "serialize_micros")]
    total: Duration,
    #[serde(skip)]
    started: Instant,
}

impl AnalysisTimings {
    pub fn new() -> Self {
        Self {
            phase_durations: IndexMap::new(),
            total: Duration::ZERO,
            started: Instant::now(),
        }
    }

    pub fn record_phase(&mut self, phase: AnalysisPhase, duration: Duration) {
        *self.phase_durations.entry(phase).or_insert(Duration::ZERO) += duration;
    }

    pub fn phase(&self, phase: AnalysisPhase) -> Option<Duration> {
        self.phase_durations.get(&phase).copied()
    }

    pub fn finish(&mut self) {
        self.total = self.started.elapsed();
    }

    pub fn total(&self) -> Duration {
        self.total
    }
}

impl Default for AnalysisTimings {
    fn default() -> Self {
        Self::new()
    }
}

fn serialize_micros<S: serde::Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(duration.as_micros() as u64)
}

fn serialize_phase_micros<S: serde::Serializer>(
    phases: &IndexMap<AnalysisPhase, Duration>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    use serde::ser::SerializeMap;
    let mut map = serializer.serialize_map(Some(phases.len()))?;
    for (phase, duration) in phases {
        map.serialize_entry(phase, &(duration.as_micros() as u64))?;
    }
    map.end()
}
