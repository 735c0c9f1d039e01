pub mod cohort;
pub mod statistical;

use crate::error::PercentileStoreError;
use crate::pipeline::domain::{ConcernKind, PercentileMethod, PercentileScore, Severity};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

pub use cohort::{CohortRecord, CohortStore, InMemoryCohortStore};
pub use statistical::statistical_percentile;

pub const DEFAULT_MIN_COHORT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricDirection {
    /// Severity-style scores: larger means worse.
    HigherIsWorse,
    /// Quality-style 0-100 scores: larger means better.
    HigherIsBetter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Metric {
    pub concern: ConcernKind,
    pub direction: MetricDirection,
}

impl Metric {
    pub fn new(concern: ConcernKind, direction: MetricDirection) -> Self {
        Self { concern, direction }
    }

    pub fn severity(concern: ConcernKind) -> Self {
        Self::new(concern, MetricDirection::HigherIsWorse)
    }

    /// Score on the 1-10 severity scale the statistical model assumes.
    fn as_severity(&self, score: f64) -> f64 {
        match self.direction {
            MetricDirection::HigherIsWorse => score,
            MetricDirection::HigherIsBetter => 10.0 - score / 10.0,
        }
    }
}

/// Ranks scores against a cohort when one is large enough, else against the
/// assumed population distribution. Higher percentile always means worse.
#[derive(Clone)]
pub struct PercentileEngine {
    store: Option<Arc<dyn CohortStore>>,
    min_cohort: usize,
}

impl PercentileEngine {
    pub fn new() -> Self {
        Self {
            store: None,
            min_cohort: DEFAULT_MIN_COHORT,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn CohortStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_min_cohort(mut self, min_cohort: usize) -> Self {
        self.min_cohort = min_cohort.max(1);
        self
    }

    pub async fn percentile(&self, metric: Metric, score: f64) -> PercentileScore {
        if let Some(store) = &self.store {
            match self.cohort_percentile(store.as_ref(), &metric, score).await {
                Ok(Some(value)) => {
                    return PercentileScore {
                        value,
                        method: PercentileMethod::Cohort,
                    };
                }
                Ok(None) => {}
                Err(e) => warn!(
                    "Cohort lookup for {} failed, using statistical estimate: {}",
                    metric.concern, e
                ),
            }
        }

        PercentileScore {
            value: statistical_percentile(metric.as_severity(score)),
            method: PercentileMethod::Statistical,
        }
    }

    /// Percentile per measured concern, in the map's order.
    pub async fn percentiles(
        &self,
        scores: &IndexMap<ConcernKind, Severity>,
    ) -> IndexMap<ConcernKind, PercentileScore> {
        let mut percentiles = IndexMap::with_capacity(scores.len());
        for (kind, severity) in scores {
            let score = self
                .percentile(Metric::severity(*kind), severity.as_f64())
                .await;
            percentiles.insert(*kind, score);
        }
        percentiles
    }

    async fn cohort_percentile(
        &self,
        store: &dyn CohortStore,
        metric: &Metric,
        score: f64,
    ) -> Result<Option<u8>, PercentileStoreError> {
        let total = store.total_count(metric).await?;
        if total < self.min_cohort {
            return Ok(None);
        }
        let worse = store.count_worse_than(metric, score).await?.min(total);
        let share = (total - worse) as f64 / total as f64 * 100.0;
        Ok(Some(statistical::clamp_percentile(share)))
    }
}

impl Default for PercentileEngine {
    fn default() -> Self {
        Self::new()
    }
}
