use super::{Metric, MetricDirection};
use crate::error::PercentileStoreError;
use crate::pipeline::domain::ConcernKind;
use async_trait::async_trait;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Historical scores for comparison.
#[async_trait]
pub trait CohortStore: Send + Sync {
    /// Records strictly worse than `score` in the metric's direction.
    async fn count_worse_than(&self, metric: &Metric, score: f64) -> Result<usize, PercentileStoreError>;

    async fn total_count(&self, metric: &Metric) -> Result<usize, PercentileStoreError>;
}

/// One historical subject: score per concern.
pub type CohortRecord = IndexMap<ConcernKind, f64>;

/// Immutable store over sorted per-metric score vectors.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCohortStore {
    scores: HashMap<ConcernKind, Vec<f64>>,
}

impl InMemoryCohortStore {
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = CohortRecord>,
    {
        let mut scores: HashMap<ConcernKind, Vec<f64>> = HashMap::new();
        for record in records {
            for (kind, score) in record {
                if score.is_finite() {
                    scores.entry(kind).or_default().push(score);
                }
            }
        }
        for values in scores.values_mut() {
            values.sort_by(f64::total_cmp);
        }
        Self { scores }
    }

    /// Load a JSON array of records, e.g. `[{"acne": 4, "redness": 6}, ...]`.
    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self, PercentileStoreError> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path).await?;
        let records: Vec<CohortRecord> = serde_json::from_str(&contents)?;
        info!("Loaded {} cohort records from {}", records.len(), path.display());
        Ok(Self::from_records(records))
    }

    fn values(&self, metric: &Metric) -> &[f64] {
        self.scores
            .get(&metric.concern)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[async_trait]
impl CohortStore for InMemoryCohortStore {
    async fn count_worse_than(&self, metric: &Metric, score: f64) -> Result<usize, PercentileStoreError> {
        let values = self.values(metric);
        let count = match metric.direction {
            MetricDirection::HigherIsWorse => values.len() - values.partition_point(|v| *v <= score),
            MetricDirection::HigherIsBetter => values.partition_point(|v| *v < score),
        };
        Ok(count)
    }

    async fn total_count(&self, metric: &Metric) -> Result<usize, PercentileStoreError> {
        Ok(self.values(metric).len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(values: &[f64]) -> InMemoryCohortStore {
        InMemoryCohortStore::from_records(
            values
                .iter()
                .map(|v| CohortRecord::from([(ConcernKind::Acne, *v)])),
        )
    }

    #[tokio::test]
    async fn counts_in_metric_direction() {
        let store = store(&[1.0, 3.0, 3.0, 5.0, 8.0]);
        let worse = Metric::severity(ConcernKind::Acne);
        let better = Metric::new(ConcernKind::Acne, MetricDirection::HigherIsBetter);

        assert_eq!(store.total_count(&worse).await.unwrap(), 5);
        assert_eq!(store.count_worse_than(&worse, 3.0).await.unwrap(), 2);
        assert_eq!(store.count_worse_than(&worse, 8.0).await.unwrap(), 0);
        assert_eq!(store.count_worse_than(&better, 3.0).await.unwrap(), 1);
        assert_eq!(store.count_worse_than(&better, 9.0).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn unknown_metric_is_empty() {
        let store = store(&[2.0]);
        assert_eq!(
            store.total_count(&Metric::severity(ConcernKind::Pores)).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn loads_records_from_json_file() {
        let path = std::env::temp_dir().join(format!("cohort-{}.json", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, r#"[{"acne": 4, "redness": 6}, {"acne": 7}]"#)
            .await
            .unwrap();

        let store = InMemoryCohortStore::load_json(&path).await.unwrap();
        tokio::fs::remove_file(&path).await.unwrap();

        assert_eq!(store.total_count(&Metric::severity(ConcernKind::Acne)).await.unwrap(), 2);
        assert_eq!(store.total_count(&Metric::severity(ConcernKind::Redness)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let result = InMemoryCohortStore::load_json("/nonexistent/cohort.json").await;
        assert!(matches!(result, Err(PercentileStoreError::Io(_))));
    }
}
