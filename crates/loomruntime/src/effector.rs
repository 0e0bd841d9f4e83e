//! Effector seams: the opaque async operations node types delegate to.
//!
//! The engine depends only on these contracts, never on effector internals
//! (network calls, media pipelines, model inference). Each request carries
//! the run's cancellation token: the collaborator, not the orchestrator,
//! owns cancellation of an in-flight call.

use async_trait::async_trait;
use loomcore::{NodeError, NodeId};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Parameters for one LLM call
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub node_id: NodeId,
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub images: Vec<String>,
    pub model: String,
    pub cancellation: CancellationToken,
}

/// Parameters for one image crop
#[derive(Debug, Clone)]
pub struct CropRequest {
    pub image_url: String,
    pub width: u32,
    pub height: u32,
    pub x: u32,
    pub y: u32,
    pub cancellation: CancellationToken,
}

/// Parameters for one video frame extraction
#[derive(Debug, Clone)]
pub struct FrameRequest {
    pub video_url: String,
    pub timestamp: f64,
    pub cancellation: CancellationToken,
}

#[async_trait]
pub trait LlmEffector: Send + Sync {
    /// Run model inference, returning the generated text
    async fn generate(&self, request: LlmRequest) -> Result<String, NodeError>;
}

#[async_trait]
pub trait MediaEffector: Send + Sync {
    /// Crop an image, returning the result URL
    async fn crop_image(&self, request: CropRequest) -> Result<String, NodeError>;

    /// Extract a still frame from a video, returning the result URL
    async fn extract_frame(&self, request: FrameRequest) -> Result<String, NodeError>;
}

/// The full set of effector collaborators a runtime dispatches to
#[derive(Clone)]
pub struct Effectors {
    pub llm: Arc<dyn LlmEffector>,
    pub media: Arc<dyn MediaEffector>,
}

impl Effectors {
    pub fn new(llm: Arc<dyn LlmEffector>, media: Arc<dyn MediaEffector>) -> Self {
        Self { llm, media }
    }
}
