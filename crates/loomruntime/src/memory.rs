use crate::store::{ExecutionStore, WorkflowStore};
use async_trait::async_trait;
use chrono::Utc;
use loomcore::{
    EngineError, Execution, ExecutionId, ExecutionStatus, ExecutionStep, NodeId, Result, StepStatus,
    Workflow, WorkflowError, WorkflowId,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory store backing the CLI, the server, and tests.
///
/// Writes are visible as soon as the lock is released, which satisfies the
/// read-after-write contract pollers depend on.
#[derive(Default)]
pub struct MemoryStore {
    workflows: Arc<RwLock<HashMap<WorkflowId, Workflow>>>,
    executions: Arc<RwLock<HashMap<ExecutionId, Execution>>>,
    steps: Arc<RwLock<HashMap<ExecutionId, Vec<ExecutionStep>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkflowStore for MemoryStore {
    async fn fetch_workflow(&self, id: WorkflowId) -> Result<Workflow> {
        self.workflows
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| WorkflowError::NotFound(id.to_string()).into())
    }

    async fn save_workflow(&self, workflow: Workflow) -> Result<()> {
        self.workflows.write().await.insert(workflow.id, workflow);
        Ok(())
    }

    async fn list_workflows(&self) -> Result<Vec<Workflow>> {
        Ok(self.workflows.read().await.values().cloned().collect())
    }
}

#[async_trait]
impl ExecutionStore for MemoryStore {
    async fn create_execution(&self, execution: Execution) -> Result<()> {
        self.executions
            .write()
            .await
            .insert(execution.id, execution);
        Ok(())
    }

    async fn update_execution(&self, id: ExecutionId, status: ExecutionStatus) -> Result<()> {
        let mut executions = self.executions.write().await;
        let execution = executions
            .get_mut(&id)
            .ok_or_else(|| WorkflowError::ExecutionNotFound(id.to_string()))?;

        if !execution.status.can_transition_to(status) {
            return Err(WorkflowError::InvalidTransition {
                from: execution.status,
                to: status,
            }
            .into());
        }

        execution.status = status;
        if status == ExecutionStatus::Running {
            execution.started_at = Some(Utc::now());
        }
        if status.is_terminal() {
            execution.ended_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn fetch_execution(&self, id: ExecutionId) -> Result<Execution> {
        self.executions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| WorkflowError::ExecutionNotFound(id.to_string()).into())
    }

    async fn create_step(&self, step: ExecutionStep) -> Result<()> {
        let mut steps = self.steps.write().await;
        let records = steps.entry(step.execution_id).or_default();
        if records.iter().any(|s| s.node_id == step.node_id) {
            return Err(WorkflowError::DuplicateStep {
                node_id: step.node_id.clone(),
            }
            .into());
        }
        records.push(step);
        Ok(())
    }

    async fn complete_step(
        &self,
        execution_id: ExecutionId,
        node_id: &NodeId,
        output: Value,
    ) -> Result<()> {
        let mut steps = self.steps.write().await;
        let step = find_step(&mut steps, execution_id, node_id)?;
        step.status = StepStatus::Completed;
        step.output = Some(output);
        step.ended_at = Some(Utc::now());
        Ok(())
    }

    async fn fail_step(
        &self,
        execution_id: ExecutionId,
        node_id: &NodeId,
        error: String,
    ) -> Result<()> {
        let mut steps = self.steps.write().await;
        let step = find_step(&mut steps, execution_id, node_id)?;
        step.status = StepStatus::Failed;
        step.error = Some(error);
        step.ended_at = Some(Utc::now());
        Ok(())
    }

    async fn fetch_steps(&self, execution_id: ExecutionId) -> Result<Vec<ExecutionStep>> {
        Ok(self
            .steps
            .read()
            .await
            .get(&execution_id)
            .cloned()
            .unwrap_or_default())
    }
}

fn find_step<'a>(
    steps: &'a mut HashMap<ExecutionId, Vec<ExecutionStep>>,
    execution_id: ExecutionId,
    node_id: &NodeId,
) -> std::result::Result<&'a mut ExecutionStep, EngineError> {
    steps
        .get_mut(&execution_id)
        .and_then(|records| records.iter_mut().find(|s| &s.node_id == node_id))
        .ok_or_else(|| WorkflowError::NodeNotFound(node_id.clone()).into())
}
