pub mod context;
pub mod domain;
pub mod orchestration;
pub mod services;

pub use domain::{CanonicalAnalysis, ConcernKind, HybridResult, Severity, SkinType};
pub use orchestration::{HybridComposer, HybridComposerBuilder};
