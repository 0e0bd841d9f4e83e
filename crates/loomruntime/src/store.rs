//! Persistence seams the engine drives.
//!
//! Implementations must make writes immediately visible: pollers watching
//! an execution rely on read-after-write consistency, and the orchestrator
//! persists every status and step transition the moment it happens.

use async_trait::async_trait;
use loomcore::{
    Execution, ExecutionId, ExecutionStatus, ExecutionStep, NodeId, Result, Workflow, WorkflowId,
};
use serde_json::Value;

/// Read-only snapshot source for workflow graphs (plus save, for the
/// editing surfaces that sit in front of the engine)
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    async fn fetch_workflow(&self, id: WorkflowId) -> Result<Workflow>;

    async fn save_workflow(&self, workflow: Workflow) -> Result<()>;

    async fn list_workflows(&self) -> Result<Vec<Workflow>>;
}

/// Durable record of executions and their steps
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    async fn create_execution(&self, execution: Execution) -> Result<()>;

    /// Advance an execution's status. Implementations must enforce the
    /// monotonic lifecycle and stamp `started_at`/`ended_at` as the run
    /// enters `Running` or a terminal state.
    async fn update_execution(&self, id: ExecutionId, status: ExecutionStatus) -> Result<()>;

    async fn fetch_execution(&self, id: ExecutionId) -> Result<Execution>;

    /// Record a fresh step. At most one step may exist per
    /// (execution, node) pair.
    async fn create_step(&self, step: ExecutionStep) -> Result<()>;

    async fn complete_step(
        &self,
        execution_id: ExecutionId,
        node_id: &NodeId,
        output: Value,
    ) -> Result<()>;

    async fn fail_step(
        &self,
        execution_id: ExecutionId,
        node_id: &NodeId,
        error: String,
    ) -> Result<()>;

    /// Steps of one execution, in creation order
    async fn fetch_steps(&self, execution_id: ExecutionId) -> Result<Vec<ExecutionStep>>;
}
