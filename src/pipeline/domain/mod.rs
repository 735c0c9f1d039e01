pub mod canonical_analysis;
pub mod concern;
pub mod hybrid_result;

pub use canonical_analysis::CanonicalAnalysis;
pub use concern::{ConcernKind, ConcernScore, Severity, SkinType};
pub use hybrid_result::{HybridResult, PercentileMethod, PercentileScore, Provenance};
