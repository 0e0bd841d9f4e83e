use crate::{NodeId, WorkflowId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

pub type ExecutionId = Uuid;

/// Run lifecycle. Transitions are monotonic:
/// `Queued -> Running -> {Completed | Failed | Canceled}`, never out of a
/// terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Canceled,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Canceled)
    }

    pub fn can_transition_to(self, next: ExecutionStatus) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
                | (Self::Running, Self::Canceled)
        )
    }
}

/// Step lifecycle: created at `Running`, finalized once, never re-opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl StepStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// What part of the graph a run covers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ExecutionScope {
    Full,
    Single(NodeId),
    Partial(usize),
}

impl ExecutionScope {
    pub fn from_selection(selected: &[NodeId]) -> Self {
        match selected {
            [] => Self::Full,
            [only] => Self::Single(only.clone()),
            many => Self::Partial(many.len()),
        }
    }
}

impl fmt::Display for ExecutionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Single(id) => write!(f, "single:{id}"),
            Self::Partial(count) => write!(f, "partial:{count}"),
        }
    }
}

impl FromStr for ExecutionScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "full" {
            return Ok(Self::Full);
        }
        if let Some(id) = s.strip_prefix("single:") {
            return Ok(Self::Single(id.to_string()));
        }
        if let Some(count) = s.strip_prefix("partial:") {
            let count = count
                .parse()
                .map_err(|_| format!("invalid scope count: {s}"))?;
            return Ok(Self::Partial(count));
        }
        Err(format!("invalid execution scope: {s}"))
    }
}

impl TryFrom<String> for ExecutionScope {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ExecutionScope> for String {
    fn from(scope: ExecutionScope) -> Self {
        scope.to_string()
    }
}

/// One run of a workflow (full or partial)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    pub id: ExecutionId,
    pub workflow_id: WorkflowId,
    pub status: ExecutionStatus,
    pub scope: ExecutionScope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

impl Execution {
    pub fn queued(workflow_id: WorkflowId, scope: ExecutionScope) -> Self {
        Self {
            id: Uuid::new_v4(),
            workflow_id,
            status: ExecutionStatus::Queued,
            scope,
            started_at: None,
            ended_at: None,
        }
    }
}

/// Record of one node's outcome within an execution.
///
/// Exactly one step exists per (execution, node) pair per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStep {
    pub execution_id: ExecutionId,
    pub node_id: NodeId,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

impl ExecutionStep {
    /// Fresh step in `Running` state, stamped with the current time
    pub fn running(execution_id: ExecutionId, node_id: NodeId) -> Self {
        Self {
            execution_id,
            node_id,
            status: StepStatus::Running,
            output: None,
            error: None,
            started_at: Some(Utc::now()),
            ended_at: None,
        }
    }
}

/// Payload accepted by the run trigger surface.
///
/// An empty selection means a full-graph run; one id a single-node run;
/// several a partial run with dependency closure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    pub execution_id: ExecutionId,
    pub workflow_id: WorkflowId,
    #[serde(default)]
    pub selected_node_ids: Vec<NodeId>,
}

impl RunRequest {
    pub fn is_partial(&self) -> bool {
        !self.selected_node_ids.is_empty()
    }
}
