pub mod metrics;

pub use metrics::{AnalysisPhase, AnalysisTimings};
