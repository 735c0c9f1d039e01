pub mod blob;
pub mod color_analyzer;
pub mod config;
pub mod core;
pub mod pipeline;
pub mod pore_analyzer;
pub mod redness_detector;
pub mod spot_detector;
pub mod texture_analyzer;
pub mod wrinkle_detector;

pub use color_analyzer::{ColorAnalysis, ColorAnalyzer, SkinTone};
pub use self::config::CvAnalysisConfig;
pub use self::core::{AlgorithmOutcome, ImageRegion, SeverityReport, SkinAlgorithm};
pub use pipeline::{CvAnalysis, CvPipeline};
pub use pore_analyzer::{PoreAnalysis, PoreAnalyzer};
pub use redness_detector::{RednessAnalysis, RednessDetector};
pub use spot_detector::{SpotAnalysis, SpotDetector};
pub use texture_analyzer::{TextureAnalysis, TextureAnalyzer};
pub use wrinkle_detector::{WrinkleAnalysis, WrinkleDetector};
