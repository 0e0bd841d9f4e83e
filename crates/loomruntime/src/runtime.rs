use crate::effector::Effectors;
use crate::executor::{ExecutionSummary, Orchestrator};
use crate::store::{ExecutionStore, WorkflowStore};
use loomcore::{
    is_acyclic, EventBus, Execution, ExecutionEvent, ExecutionId, ExecutionScope, ExecutionStep,
    NodeId, Result, RunRequest, WorkflowError, WorkflowId,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// Main runtime: wires stores, effectors and the event bus together, and
/// tracks the cancellation token of every in-flight run
#[derive(Clone)]
pub struct LoomRuntime {
    workflows: Arc<dyn WorkflowStore>,
    executions: Arc<dyn ExecutionStore>,
    effectors: Effectors,
    events: Arc<EventBus>,
    orchestrator: Orchestrator,
    running: Arc<RwLock<HashMap<ExecutionId, CancellationToken>>>,
}

impl LoomRuntime {
    pub fn new(
        workflows: Arc<dyn WorkflowStore>,
        executions: Arc<dyn ExecutionStore>,
        effectors: Effectors,
    ) -> Self {
        Self::with_config(workflows, executions, effectors, RuntimeConfig::default())
    }

    pub fn with_config(
        workflows: Arc<dyn WorkflowStore>,
        executions: Arc<dyn ExecutionStore>,
        effectors: Effectors,
        config: RuntimeConfig,
    ) -> Self {
        let events = Arc::new(EventBus::new(config.event_buffer_size));
        let orchestrator = Orchestrator::new(
            Arc::clone(&workflows),
            Arc::clone(&executions),
            Arc::clone(&events),
        );

        Self {
            workflows,
            executions,
            effectors,
            events,
            orchestrator,
            running: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Validate the graph and persist a `Queued` execution for it.
    ///
    /// A cyclic graph is rejected here, synchronously, before any run
    /// state exists.
    pub async fn start_run(
        &self,
        workflow_id: WorkflowId,
        selected_node_ids: Vec<NodeId>,
    ) -> Result<RunRequest> {
        let workflow = self.workflows.fetch_workflow(workflow_id).await?;
        if !is_acyclic(&workflow.edges) {
            return Err(WorkflowError::CyclicDependency.into());
        }

        let scope = ExecutionScope::from_selection(&selected_node_ids);
        let execution = Execution::queued(workflow_id, scope);
        let execution_id = execution.id;
        self.executions.create_execution(execution).await?;

        Ok(RunRequest {
            execution_id,
            workflow_id,
            selected_node_ids,
        })
    }

    /// Drive a previously started run to completion
    pub async fn run(&self, request: RunRequest) -> Result<ExecutionSummary> {
        let execution_id = request.execution_id;
        let token = CancellationToken::new();
        self.running
            .write()
            .await
            .insert(execution_id, token.clone());

        let result = self
            .orchestrator
            .run(request, self.effectors.clone(), token)
            .await;

        self.running.write().await.remove(&execution_id);
        result
    }

    /// Start a run and detach it onto the executor, returning the queued
    /// execution id immediately (the trigger surface)
    pub async fn trigger(
        &self,
        workflow_id: WorkflowId,
        selected_node_ids: Vec<NodeId>,
    ) -> Result<ExecutionId> {
        let request = self.start_run(workflow_id, selected_node_ids).await?;
        let execution_id = request.execution_id;

        let runtime = self.clone();
        tokio::spawn(async move {
            if let Err(e) = runtime.run(request).await {
                tracing::error!(execution_id = %execution_id, error = %e, "workflow run failed");
            }
        });

        Ok(execution_id)
    }

    /// Best-effort cancellation of an in-flight run. Returns false when the
    /// run is unknown or already finished; the orchestrator reconciles the
    /// terminal status once in-flight node work settles.
    pub async fn cancel(&self, execution_id: ExecutionId) -> bool {
        match self.running.read().await.get(&execution_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Polling surface: the execution record plus its steps in creation
    /// order
    pub async fn execution(&self, id: ExecutionId) -> Result<(Execution, Vec<ExecutionStep>)> {
        let execution = self.executions.fetch_execution(id).await?;
        let steps = self.executions.fetch_steps(id).await?;
        Ok((execution, steps))
    }

    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<ExecutionEvent> {
        self.events.subscribe()
    }

    pub fn workflows(&self) -> &Arc<dyn WorkflowStore> {
        &self.workflows
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }
}

/// Configuration for the runtime
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub event_buffer_size: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: 1000,
        }
    }
}
