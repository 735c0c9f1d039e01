pub mod common;
pub mod config;
pub mod error;
pub mod pipeline;

pub use common::ImageSample;
pub use config::Configuration;
pub use error::{AggregateProviderFailure, AppError, ProviderError, ValidationError};
pub use pipeline::{HybridComposer, HybridComposerBuilder, HybridResult};
