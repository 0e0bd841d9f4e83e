//! Per-node dispatch: resolves a node's inputs from upstream outputs,
//! invokes the node-type-specific effector, and records the outcome as an
//! execution step.

use crate::effector::{CropRequest, Effectors, FrameRequest, LlmRequest};
use crate::store::ExecutionStore;
use chrono::Utc;
use loomcore::{
    text_of, unwrap_scalar, url_of, urls_of, Edge, EventBus, ExecutionEvent, ExecutionId,
    ExecutionStep, Node, NodeError, NodeId, NodeKind, Result,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_PROMPT: &str = "Hello AI";

// Demo fallbacks for media nodes with no upstream input and no configured
// literal. Deliberate leniency so degraded or partial graphs stay runnable.
const FALLBACK_IMAGE_URL: &str = "https://picsum.photos/200/300";
const FALLBACK_VIDEO_URL: &str =
    "https://commondatastorage.googleapis.com/gtv-videos-bucket/sample/BigBuckBunny.mp4";

/// Executes single nodes within one run.
///
/// Owns the step record for the duration of each node's execution; writes
/// exactly one `ExecutionStep` per node, created in `Running` state before
/// any work happens and finalized exactly once.
pub(crate) struct NodeRunner {
    pub(crate) execution_id: ExecutionId,
    pub(crate) store: Arc<dyn ExecutionStore>,
    pub(crate) effectors: Effectors,
    pub(crate) events: Arc<EventBus>,
    pub(crate) cancellation: CancellationToken,
}

impl NodeRunner {
    /// Run one node against the current output table and persist its step.
    ///
    /// Effector errors are captured on the step before propagating, so
    /// every failure is observable through exactly one step record.
    pub(crate) async fn execute(
        &self,
        node: &Node,
        edges: &[Edge],
        outputs: &HashMap<NodeId, Value>,
    ) -> Result<Value> {
        tracing::info!(node_id = %node.id, node_type = node.kind.type_name(), "processing node");

        self.store
            .create_step(ExecutionStep::running(self.execution_id, node.id.clone()))
            .await?;
        self.events.emit(ExecutionEvent::NodeStarted {
            execution_id: self.execution_id,
            node_id: node.id.clone(),
            node_type: node.kind.type_name().to_string(),
            timestamp: Utc::now(),
        });

        let incoming: Vec<&Edge> = edges.iter().filter(|e| e.target == node.id).collect();

        match self.dispatch(node, &incoming, outputs).await {
            Ok(output) => {
                self.store
                    .complete_step(self.execution_id, &node.id, output.clone())
                    .await?;
                self.events.emit(ExecutionEvent::NodeCompleted {
                    execution_id: self.execution_id,
                    node_id: node.id.clone(),
                    output: output.clone(),
                    timestamp: Utc::now(),
                });
                Ok(output)
            }
            Err(e) => {
                tracing::error!(node_id = %node.id, error = %e, "node execution failed");
                self.store
                    .fail_step(self.execution_id, &node.id, e.to_string())
                    .await?;
                self.events.emit(ExecutionEvent::NodeFailed {
                    execution_id: self.execution_id,
                    node_id: node.id.clone(),
                    error: e.to_string(),
                    timestamp: Utc::now(),
                });
                Err(e.into())
            }
        }
    }

    async fn dispatch(
        &self,
        node: &Node,
        incoming: &[&Edge],
        outputs: &HashMap<NodeId, Value>,
    ) -> std::result::Result<Value, NodeError> {
        // The value produced by the unique incoming edge wired to `handle`
        let port_input = |handle: &str| -> Option<&Value> {
            incoming
                .iter()
                .find(|e| e.target_handle.as_deref() == Some(handle))
                .and_then(|e| outputs.get(&e.source))
        };
        // Fallback for single-input node types: any one incoming edge
        let any_input = || -> Option<&Value> {
            incoming.first().and_then(|e| outputs.get(&e.source))
        };

        match &node.kind {
            NodeKind::Text(cfg) => {
                let text = cfg.text.clone().unwrap_or_else(|| "No text".to_string());
                Ok(json!({ "text": text, "output": text }))
            }

            NodeKind::UploadImage(cfg) => {
                Ok(json!({ "output": cfg.image_url.clone().unwrap_or_default() }))
            }

            NodeKind::UploadVideo(cfg) => {
                Ok(json!({ "output": cfg.video_url.clone().unwrap_or_default() }))
            }

            NodeKind::Llm(cfg) => {
                let system_prompt = port_input("system_prompt").and_then(text_of);
                let prompt = port_input("user_message")
                    .or_else(any_input)
                    .and_then(text_of)
                    .or_else(|| cfg.prompt.clone())
                    .unwrap_or_else(|| DEFAULT_PROMPT.to_string());

                // Several image edges may feed one LLM node; their URLs
                // concatenate into an ordered list
                let images: Vec<String> = incoming
                    .iter()
                    .filter(|e| e.target_handle.as_deref() == Some("images"))
                    .filter_map(|e| outputs.get(&e.source))
                    .flat_map(urls_of)
                    .collect();

                let text = self
                    .effectors
                    .llm
                    .generate(LlmRequest {
                        node_id: node.id.clone(),
                        prompt,
                        system_prompt,
                        images,
                        model: cfg.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                        cancellation: self.cancellation.clone(),
                    })
                    .await?;

                Ok(json!({ "output": text }))
            }

            NodeKind::CropImage(cfg) => {
                let image_url = port_input("image_url")
                    .or_else(any_input)
                    .and_then(|v| url_of(v))
                    .or_else(|| cfg.image_url.clone())
                    .unwrap_or_else(|| FALLBACK_IMAGE_URL.to_string());

                let url = self
                    .effectors
                    .media
                    .crop_image(CropRequest {
                        image_url,
                        width: cfg.width.unwrap_or(100),
                        height: cfg.height.unwrap_or(100),
                        x: cfg.x.unwrap_or(0),
                        y: cfg.y.unwrap_or(0),
                        cancellation: self.cancellation.clone(),
                    })
                    .await?;

                Ok(json!({ "output": url }))
            }

            NodeKind::ExtractFrame(cfg) => {
                let video_url = port_input("video_url")
                    .or_else(any_input)
                    .and_then(|v| url_of(v))
                    .or_else(|| cfg.video_url.clone())
                    .unwrap_or_else(|| FALLBACK_VIDEO_URL.to_string());

                let url = self
                    .effectors
                    .media
                    .extract_frame(FrameRequest {
                        video_url,
                        timestamp: cfg.timestamp.unwrap_or(0.0),
                        cancellation: self.cancellation.clone(),
                    })
                    .await?;

                Ok(json!({ "output": url }))
            }

            NodeKind::Output => {
                let input = port_input("input").or_else(any_input);
                Ok(match input {
                    Some(value) => unwrap_scalar(value),
                    None => json!({ "message": "No input received" }),
                })
            }

            NodeKind::Unknown { type_name, .. } => {
                // Not an error: a single unrecognized node must not abort
                // the run
                tracing::warn!(node_id = %node.id, node_type = %type_name, "unknown node type");
                Ok(json!({ "message": "Unknown node type" }))
            }
        }
    }
}
