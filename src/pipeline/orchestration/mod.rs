pub mod composer;

pub use composer::{HybridComposer, HybridComposerBuilder};
