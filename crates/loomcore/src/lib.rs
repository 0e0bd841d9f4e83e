//! Core abstractions for the loom workflow engine
//!
//! This crate provides the graph model (nodes, edges, ports), the execution
//! records pollers observe, edit-time graph validation, and the event bus.
//! It carries no execution logic; the engine itself lives in `loomruntime`.

mod error;
mod events;
mod execution;
mod graph;
mod output;
mod schema;
mod validate;

pub use error::{EngineError, NodeError, WorkflowError};
pub use events::{EventBus, ExecutionEvent};
pub use execution::{
    Execution, ExecutionId, ExecutionScope, ExecutionStatus, ExecutionStep, RunRequest, StepStatus,
};
pub use graph::{
    CropImageConfig, Edge, ExtractFrameConfig, LlmConfig, Node, NodeId, NodeKind, TextConfig,
    UploadImageConfig, UploadVideoConfig, Workflow, WorkflowId,
};
pub use output::{text_of, unwrap_scalar, url_of, urls_of};
pub use schema::{infer_output_type, input_ports, output_ports, PortSchema, PortType};
pub use validate::{can_connect, creates_cycle, is_acyclic};

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
