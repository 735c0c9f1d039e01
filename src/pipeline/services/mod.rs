pub mod face_validation;
pub mod fallback;
pub mod image;
pub mod normalizer;
pub mod percentile;
pub mod providers;

pub use face_validation::{FaceValidator, ImageQualityValidator, RemoteFaceValidator};
pub use fallback::FallbackSynthesizer;
pub use normalizer::ResultNormalizer;
pub use percentile::{CohortStore, InMemoryCohortStore, PercentileEngine};
pub use providers::{AnalysisMode, ProviderRace, SkinAnalysisProvider};
