pub mod analysis;

pub use analysis::{CvAnalysis, CvAnalysisConfig, CvPipeline};
