//! The orchestrator: the state machine driving one workflow run.

use crate::effector::Effectors;
use crate::node_executor::NodeRunner;
use crate::scheduler::{filter_to_closure, levelize};
use crate::store::{ExecutionStore, WorkflowStore};
use chrono::Utc;
use futures::future::join_all;
use loomcore::{
    EngineError, EventBus, ExecutionEvent, ExecutionId, ExecutionStatus, NodeError, NodeId,
    Result, RunRequest,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Drives executions level by level: fan out across a level, barrier on
/// the whole level settling, then advance. A later level never starts
/// before its entire predecessor level has settled, because its nodes may
/// depend on any node in any earlier level.
#[derive(Clone)]
pub struct Orchestrator {
    workflows: Arc<dyn WorkflowStore>,
    executions: Arc<dyn ExecutionStore>,
    events: Arc<EventBus>,
}

impl Orchestrator {
    pub fn new(
        workflows: Arc<dyn WorkflowStore>,
        executions: Arc<dyn ExecutionStore>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            workflows,
            executions,
            events,
        }
    }

    /// Execute one run to its terminal status.
    ///
    /// Marks the execution `Running`, walks the levels, and always
    /// persists a terminal status before returning: `Completed` when every
    /// level settled cleanly, `Canceled` when the run was cancelled
    /// cooperatively, `Failed` otherwise. Steps persisted before a failure
    /// are preserved, never rolled back.
    pub async fn run(
        &self,
        request: RunRequest,
        effectors: Effectors,
        cancellation: CancellationToken,
    ) -> Result<ExecutionSummary> {
        tracing::info!(
            execution_id = %request.execution_id,
            workflow_id = %request.workflow_id,
            mode = if request.is_partial() { "partial" } else { "full" },
            selected = request.selected_node_ids.len(),
            "starting workflow execution"
        );

        self.executions
            .update_execution(request.execution_id, ExecutionStatus::Running)
            .await?;
        self.events.emit(ExecutionEvent::ExecutionStarted {
            execution_id: request.execution_id,
            workflow_id: request.workflow_id,
            timestamp: Utc::now(),
        });

        let result = self.run_levels(&request, &effectors, &cancellation).await;

        let status = match &result {
            Ok(_) => ExecutionStatus::Completed,
            Err(EngineError::Node(NodeError::Cancelled)) => ExecutionStatus::Canceled,
            Err(_) => ExecutionStatus::Failed,
        };
        self.executions
            .update_execution(request.execution_id, status)
            .await?;
        self.events.emit(ExecutionEvent::ExecutionFinished {
            execution_id: request.execution_id,
            status,
            timestamp: Utc::now(),
        });

        tracing::info!(execution_id = %request.execution_id, ?status, "workflow execution finished");
        result
    }

    async fn run_levels(
        &self,
        request: &RunRequest,
        effectors: &Effectors,
        cancellation: &CancellationToken,
    ) -> Result<ExecutionSummary> {
        let workflow = self.workflows.fetch_workflow(request.workflow_id).await?;
        let (mut nodes, mut edges) = (workflow.nodes, workflow.edges);

        if request.is_partial() {
            (nodes, edges) = filter_to_closure(nodes, edges, &request.selected_node_ids);
            tracing::info!(
                nodes = nodes.len(),
                "partial execution (including dependencies)"
            );
        }

        let levels = levelize(&nodes, &edges);
        tracing::info!(
            levels = levels.len(),
            sizes = ?levels.iter().map(Vec::len).collect::<Vec<_>>(),
            "workflow leveled for execution"
        );

        let runner = NodeRunner {
            execution_id: request.execution_id,
            store: Arc::clone(&self.executions),
            effectors: effectors.clone(),
            events: Arc::clone(&self.events),
            cancellation: cancellation.clone(),
        };

        // Run-scoped output table: write-once per node, read by every
        // downstream level
        let mut outputs: HashMap<NodeId, Value> = HashMap::new();

        for (index, level) in levels.iter().enumerate() {
            // Cooperative cancellation is observed between levels only;
            // in-flight node tasks are never preempted here
            if cancellation.is_cancelled() {
                return Err(NodeError::Cancelled.into());
            }

            tracing::info!(
                level = index + 1,
                of = levels.len(),
                nodes = level.len(),
                "executing level"
            );

            let tasks = level
                .iter()
                .map(|node| runner.execute(node, &edges, &outputs));
            let results = join_all(tasks).await;

            // Every sibling has settled; only now does the first error
            // surface and stop the scheduling of later levels
            for (node, result) in level.iter().zip(results) {
                outputs.insert(node.id.clone(), result?);
            }
        }

        Ok(ExecutionSummary {
            execution_id: request.execution_id,
            levels: levels.len(),
            nodes: nodes.len(),
        })
    }
}

/// What a finished run reports back to its trigger
#[derive(Debug, Clone)]
pub struct ExecutionSummary {
    pub execution_id: ExecutionId,
    pub levels: usize,
    pub nodes: usize,
}
