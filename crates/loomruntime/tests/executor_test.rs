// crates/loomruntime/tests/executor_test.rs

use async_trait::async_trait;
use loomcore::{
    Edge, EngineError, ExecutionScope, ExecutionStatus, LlmConfig, Node, NodeError, NodeKind,
    StepStatus, TextConfig, Workflow, WorkflowError,
};
use loomruntime::{
    CropRequest, Effectors, FrameRequest, LlmEffector, LlmRequest, LoomRuntime, MediaEffector,
    MemoryStore, WorkflowStore,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Deterministic LLM double: echoes the prompt, fails on demand
struct ScriptedLlm;

#[async_trait]
impl LlmEffector for ScriptedLlm {
    async fn generate(&self, request: LlmRequest) -> Result<String, NodeError> {
        if request.prompt.contains("boom") {
            return Err(NodeError::EffectorFailed(
                "model backend unavailable".to_string(),
            ));
        }
        Ok(format!("echo: {}", request.prompt))
    }
}

/// LLM double that parks until cancelled
struct SlowLlm;

#[async_trait]
impl LlmEffector for SlowLlm {
    async fn generate(&self, request: LlmRequest) -> Result<String, NodeError> {
        tokio::select! {
            _ = request.cancellation.cancelled() => Err(NodeError::Cancelled),
            _ = tokio::time::sleep(Duration::from_secs(10)) => Ok("slow".to_string()),
        }
    }
}

/// Media double that tags URLs instead of processing anything
struct TaggingMedia;

#[async_trait]
impl MediaEffector for TaggingMedia {
    async fn crop_image(&self, request: CropRequest) -> Result<String, NodeError> {
        Ok(format!("{}#cropped", request.image_url))
    }

    async fn extract_frame(&self, request: FrameRequest) -> Result<String, NodeError> {
        Ok(format!("{}#frame@{}", request.video_url, request.timestamp))
    }
}

fn runtime_with(llm: Arc<dyn LlmEffector>) -> LoomRuntime {
    let store = Arc::new(MemoryStore::new());
    LoomRuntime::new(
        store.clone(),
        store,
        Effectors::new(llm, Arc::new(TaggingMedia)),
    )
}

fn text_node(id: &str, text: &str) -> Node {
    Node::new(
        id,
        NodeKind::Text(TextConfig {
            text: Some(text.to_string()),
            label: None,
        }),
    )
}

fn llm_node(id: &str) -> Node {
    Node::new(id, NodeKind::Llm(LlmConfig::default()))
}

fn output_node(id: &str) -> Node {
    Node::new(id, NodeKind::Output)
}

async fn save(runtime: &LoomRuntime, workflow: &Workflow) {
    runtime
        .workflows()
        .save_workflow(workflow.clone())
        .await
        .unwrap();
}

#[tokio::test]
async fn single_text_node_round_trips_to_output() {
    let runtime = runtime_with(Arc::new(ScriptedLlm));

    let mut workflow = Workflow::new("round trip");
    workflow.add_node(text_node("text-1", "hello"));
    workflow.add_node(output_node("out-1"));
    workflow.connect(Edge::new("text-1", "out-1").with_handles("text", "input"));
    save(&runtime, &workflow).await;

    let request = runtime.start_run(workflow.id, vec![]).await.unwrap();
    let summary = runtime.run(request).await.unwrap();
    assert_eq!(summary.levels, 2);

    let (execution, steps) = runtime.execution(summary.execution_id).await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert!(execution.started_at.is_some());
    assert!(execution.ended_at.is_some());

    let out_step = steps.iter().find(|s| s.node_id == "out-1").unwrap();
    assert_eq!(out_step.status, StepStatus::Completed);
    assert_eq!(out_step.output, Some(json!("hello")));

    let text_step = steps.iter().find(|s| s.node_id == "text-1").unwrap();
    assert_eq!(
        text_step.output,
        Some(json!({ "text": "hello", "output": "hello" }))
    );
}

#[tokio::test]
async fn chain_runs_three_levels_in_order() {
    let runtime = runtime_with(Arc::new(ScriptedLlm));

    let mut workflow = Workflow::new("chain");
    workflow.add_node(text_node("a", "Describe"));
    workflow.add_node(llm_node("b"));
    workflow.add_node(output_node("c"));
    workflow.connect(Edge::new("a", "b").with_handles("text", "user_message"));
    workflow.connect(Edge::new("b", "c").with_handles("output", "input"));
    save(&runtime, &workflow).await;

    let request = runtime.start_run(workflow.id, vec![]).await.unwrap();
    let summary = runtime.run(request).await.unwrap();
    assert_eq!(summary.levels, 3);
    assert_eq!(summary.nodes, 3);

    let (execution, steps) = runtime.execution(summary.execution_id).await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Completed);

    // Steps are created in level order: a, then b, then c
    let order: Vec<&str> = steps.iter().map(|s| s.node_id.as_str()).collect();
    assert_eq!(order, vec!["a", "b", "c"]);
    assert!(steps.iter().all(|s| s.status == StepStatus::Completed));

    let out_step = steps.iter().find(|s| s.node_id == "c").unwrap();
    assert_eq!(out_step.output, Some(json!("echo: Describe")));
}

#[tokio::test]
async fn independent_sources_run_in_one_level() {
    let runtime = runtime_with(Arc::new(ScriptedLlm));

    let mut workflow = Workflow::new("fan in");
    workflow.add_node(text_node("a", "first"));
    workflow.add_node(text_node("b", "second"));
    workflow.add_node(output_node("c"));
    workflow.connect(Edge::new("a", "c").with_handles("text", "input"));
    workflow.connect(Edge::new("b", "c"));
    save(&runtime, &workflow).await;

    let request = runtime.start_run(workflow.id, vec![]).await.unwrap();
    let summary = runtime.run(request).await.unwrap();

    // a and b are causally independent: exactly two levels
    assert_eq!(summary.levels, 2);

    let (execution, steps) = runtime.execution(summary.execution_id).await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(steps.len(), 3);
    assert!(steps.iter().all(|s| s.status == StepStatus::Completed));

    // The port-specific edge wins over the unqualified one
    let out_step = steps.iter().find(|s| s.node_id == "c").unwrap();
    assert_eq!(out_step.output, Some(json!("first")));
}

#[tokio::test]
async fn partial_run_pulls_upstream_dependencies() {
    let runtime = runtime_with(Arc::new(ScriptedLlm));

    let mut workflow = Workflow::new("partial");
    workflow.add_node(text_node("a", "Describe"));
    workflow.add_node(llm_node("b"));
    workflow.add_node(output_node("c"));
    workflow.connect(Edge::new("a", "b").with_handles("text", "user_message"));
    workflow.connect(Edge::new("b", "c").with_handles("output", "input"));
    save(&runtime, &workflow).await;

    // Requesting only the tail still runs the whole chain
    let request = runtime
        .start_run(workflow.id, vec!["c".to_string()])
        .await
        .unwrap();
    let summary = runtime.run(request).await.unwrap();
    assert_eq!(summary.levels, 3);
    assert_eq!(summary.nodes, 3);

    let (execution, steps) = runtime.execution(summary.execution_id).await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert_eq!(execution.scope, ExecutionScope::Single("c".to_string()));
    assert_eq!(steps.len(), 3);
    assert!(steps.iter().all(|s| s.status == StepStatus::Completed));

    let out_step = steps.iter().find(|s| s.node_id == "c").unwrap();
    assert_eq!(out_step.output, Some(json!("echo: Describe")));
}

#[tokio::test]
async fn failing_node_fails_the_run_but_siblings_settle() {
    let runtime = runtime_with(Arc::new(ScriptedLlm));

    let mut workflow = Workflow::new("partial failure");
    workflow.add_node(text_node("a", "fine"));
    workflow.add_node(text_node("b", "boom"));
    workflow.add_node(llm_node("llm-ok"));
    workflow.add_node(llm_node("llm-bad"));
    workflow.add_node(output_node("out"));
    workflow.connect(Edge::new("a", "llm-ok").with_handles("text", "user_message"));
    workflow.connect(Edge::new("b", "llm-bad").with_handles("text", "user_message"));
    workflow.connect(Edge::new("llm-ok", "out").with_handles("output", "input"));
    workflow.connect(Edge::new("llm-bad", "out").with_handles("output", "input"));
    save(&runtime, &workflow).await;

    let request = runtime.start_run(workflow.id, vec![]).await.unwrap();
    let execution_id = request.execution_id;
    let result = runtime.run(request).await;
    assert!(result.is_err());

    let (execution, steps) = runtime.execution(execution_id).await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Failed);

    // The failing sibling carries its error
    let bad = steps.iter().find(|s| s.node_id == "llm-bad").unwrap();
    assert_eq!(bad.status, StepStatus::Failed);
    assert!(bad
        .error
        .as_deref()
        .unwrap()
        .contains("model backend unavailable"));

    // Its in-flight sibling still settled, results preserved
    let ok = steps.iter().find(|s| s.node_id == "llm-ok").unwrap();
    assert_eq!(ok.status, StepStatus::Completed);
    assert_eq!(ok.output, Some(json!({ "output": "echo: fine" })));

    // Later levels were never scheduled
    assert!(steps.iter().all(|s| s.node_id != "out"));
    // And nothing is left dangling
    assert!(steps.iter().all(|s| s.status.is_terminal()));
}

#[tokio::test]
async fn unknown_node_type_is_diagnostic_not_fatal() {
    let runtime = runtime_with(Arc::new(ScriptedLlm));

    let mystery: Node = serde_json::from_value(json!({
        "id": "weird",
        "type": "hologram-node",
        "data": { "dimension": 4 }
    }))
    .unwrap();

    let mut workflow = Workflow::new("unknown node");
    workflow.add_node(mystery);
    workflow.add_node(output_node("out"));
    workflow.connect(Edge::new("weird", "out"));
    save(&runtime, &workflow).await;

    let request = runtime.start_run(workflow.id, vec![]).await.unwrap();
    let summary = runtime.run(request).await.unwrap();

    let (execution, steps) = runtime.execution(summary.execution_id).await.unwrap();
    assert_eq!(execution.status, ExecutionStatus::Completed);

    let weird = steps.iter().find(|s| s.node_id == "weird").unwrap();
    assert_eq!(
        weird.output,
        Some(json!({ "message": "Unknown node type" }))
    );
}

#[tokio::test]
async fn media_nodes_fall_back_to_configured_literals() {
    let runtime = runtime_with(Arc::new(ScriptedLlm));

    let crop: Node = serde_json::from_value(json!({
        "id": "crop-1",
        "type": "cropImage",
        "data": { "imageUrl": "https://example.com/photo.png", "width": 64, "height": 64 }
    }))
    .unwrap();

    // No upstream edge at all: the configured literal feeds the effector
    let mut workflow = Workflow::new("lenient crop");
    workflow.add_node(crop);
    save(&runtime, &workflow).await;

    let request = runtime.start_run(workflow.id, vec![]).await.unwrap();
    let summary = runtime.run(request).await.unwrap();

    let (_, steps) = runtime.execution(summary.execution_id).await.unwrap();
    let step = steps.iter().find(|s| s.node_id == "crop-1").unwrap();
    assert_eq!(step.status, StepStatus::Completed);
    assert_eq!(
        step.output,
        Some(json!({ "output": "https://example.com/photo.png#cropped" }))
    );
}

#[tokio::test]
async fn cancel_reconciles_to_canceled() {
    let runtime = runtime_with(Arc::new(SlowLlm));

    let mut workflow = Workflow::new("cancelable");
    workflow.add_node(text_node("a", "park"));
    workflow.add_node(llm_node("b"));
    workflow.connect(Edge::new("a", "b").with_handles("text", "user_message"));
    save(&runtime, &workflow).await;

    let execution_id = runtime.trigger(workflow.id, vec![]).await.unwrap();

    // Give the run time to reach the parked LLM call
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(runtime.cancel(execution_id).await);

    // Poll like an external client until the run reaches a terminal state
    let mut status = ExecutionStatus::Running;
    for _ in 0..50 {
        let (execution, _) = runtime.execution(execution_id).await.unwrap();
        status = execution.status;
        if status.is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(status, ExecutionStatus::Canceled);

    // Cancelling a finished run is a no-op
    assert!(!runtime.cancel(execution_id).await);

    let (_, steps) = runtime.execution(execution_id).await.unwrap();
    assert!(steps.iter().all(|s| s.status.is_terminal()));
}

#[tokio::test]
async fn cyclic_graphs_are_rejected_before_any_run_state_exists() {
    let runtime = runtime_with(Arc::new(ScriptedLlm));

    let mut workflow = Workflow::new("cycle");
    workflow.add_node(text_node("a", "x"));
    workflow.add_node(llm_node("b"));
    workflow.connect(Edge::new("a", "b"));
    workflow.connect(Edge::new("b", "a"));
    save(&runtime, &workflow).await;

    let err = runtime.start_run(workflow.id, vec![]).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Workflow(WorkflowError::CyclicDependency)
    ));
}

#[tokio::test]
async fn store_enforces_terminal_immutability() {
    use loomruntime::ExecutionStore;

    let store = MemoryStore::new();
    let execution = loomcore::Execution::queued(uuid::Uuid::new_v4(), ExecutionScope::Full);
    let id = execution.id;
    store.create_execution(execution).await.unwrap();

    store
        .update_execution(id, ExecutionStatus::Running)
        .await
        .unwrap();
    store
        .update_execution(id, ExecutionStatus::Completed)
        .await
        .unwrap();

    // No transition out of a terminal state
    let err = store
        .update_execution(id, ExecutionStatus::Failed)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Workflow(WorkflowError::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn store_rejects_duplicate_steps() {
    use loomcore::ExecutionStep;
    use loomruntime::ExecutionStore;

    let store = MemoryStore::new();
    let execution_id = uuid::Uuid::new_v4();

    store
        .create_step(ExecutionStep::running(execution_id, "n1".to_string()))
        .await
        .unwrap();
    let err = store
        .create_step(ExecutionStep::running(execution_id, "n1".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Workflow(WorkflowError::DuplicateStep { .. })
    ));
}
