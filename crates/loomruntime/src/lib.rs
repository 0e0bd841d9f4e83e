//! Workflow execution runtime
//!
//! This crate provides the execution engine: dependency-closure filtering
//! for partial runs, topological leveling, the orchestrator state machine
//! that drives one run level by level, the per-node executor, and the
//! persistence/effector seams the engine talks through.

mod effector;
mod executor;
mod memory;
mod node_executor;
mod runtime;
mod scheduler;
mod store;

pub use effector::{CropRequest, Effectors, FrameRequest, LlmEffector, LlmRequest, MediaEffector};
pub use executor::{ExecutionSummary, Orchestrator};
pub use memory::MemoryStore;
pub use runtime::{LoomRuntime, RuntimeConfig};
pub use scheduler::{dependency_closure, filter_to_closure, levelize};
pub use store::{ExecutionStore, WorkflowStore};
