use super::concern::{ConcernKind, ConcernScore, Severity, SkinType};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// The single result shape every provider and the fallback path produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalAnalysis {
    pub skin_type: SkinType,
    pub concerns: IndexSet<ConcernKind>,
    /// Complete: holds an entry for every tracked concern kind.
    pub severity: IndexMap<ConcernKind, Severity>,
    /// Ordered, never empty.
    pub recommendations: Vec<String>,
    pub confidence: f32,
}

impl CanonicalAnalysis {
    pub fn severity_of(&self, kind: ConcernKind) -> Severity {
        self.severity.get(&kind).copied().unwrap_or_default()
    }

    pub fn is_complete(&self) -> bool {
        ConcernKind::ALL
            .iter()
            .all(|kind| self.severity.contains_key(kind))
    }

    /// Scores for the reported concerns, in reported order.
    pub fn concern_scores(&self) -> Vec<ConcernScore> {
        self.concerns
            .iter()
            .map(|kind| ConcernScore::new(*kind, self.severity_of(*kind), self.confidence))
            .collect()
    }
}
