//! Effector implementations
//!
//! Backing services the engine's node types delegate to: Gemini model
//! inference and an HTTP media-processing pipeline. Both read their
//! credentials from the environment and fail at call time when
//! unconfigured, so text-only workflows run without any keys.

mod gemini;
mod media;

pub use gemini::{normalize_model, GeminiLlm};
pub use media::HttpMediaService;

use loomruntime::Effectors;
use std::sync::Arc;

/// Build the standard effector set from the environment
pub fn effectors_from_env() -> Effectors {
    Effectors::new(
        Arc::new(GeminiLlm::from_env()),
        Arc::new(HttpMediaService::from_env()),
    )
}
