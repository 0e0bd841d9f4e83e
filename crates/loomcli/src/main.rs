// crates/loomcli/src/main.rs

use anyhow::Result;
use clap::{Parser, Subcommand};
use loomcore::{
    can_connect, input_ports, is_acyclic, output_ports, Edge, ExecutionEvent, LlmConfig, Node,
    NodeKind, PortType, StepStatus, TextConfig, Workflow,
};
use loomruntime::{LoomRuntime, MemoryStore, WorkflowStore};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "loom")]
#[command(about = "Loom workflow engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a workflow file
    Run {
        /// Path to workflow JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Comma-separated node ids for a partial run
        #[arg(short, long)]
        nodes: Option<String>,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate a workflow file
    Validate {
        /// Path to workflow JSON file
        file: PathBuf,
    },

    /// List available node types
    Nodes,

    /// Create a new example workflow
    Init {
        /// Output file path
        #[arg(short, long, default_value = "workflow.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            file,
            nodes,
            verbose,
        } => {
            if verbose {
                tracing_subscriber::fmt()
                    .with_max_level(tracing::Level::DEBUG)
                    .init();
            } else {
                tracing_subscriber::fmt()
                    .with_max_level(tracing::Level::INFO)
                    .init();
            }

            let selected = nodes
                .map(|list| {
                    list.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();

            run_workflow(file, selected).await?;
        }

        Commands::Validate { file } => {
            validate_workflow(file)?;
        }

        Commands::Nodes => {
            list_nodes();
        }

        Commands::Init { output } => {
            create_example_workflow(output)?;
        }
    }

    Ok(())
}

async fn run_workflow(file: PathBuf, selected: Vec<String>) -> Result<()> {
    println!("🚀 Loading workflow from: {}", file.display());

    let workflow_json = std::fs::read_to_string(&file)?;
    let workflow: Workflow = serde_json::from_str(&workflow_json)?;

    println!("📋 Workflow: {}", workflow.name);
    println!("   Nodes: {}", workflow.nodes.len());
    println!("   Edges: {}", workflow.edges.len());
    if !selected.is_empty() {
        println!("   Partial run: {} selected node(s)", selected.len());
    }
    println!();

    let store = Arc::new(MemoryStore::new());
    let runtime = LoomRuntime::new(store.clone(), store, loomnodes::effectors_from_env());
    runtime.workflows().save_workflow(workflow.clone()).await?;

    // Live progress from the event bus
    let mut events = runtime.subscribe_events();
    let event_task = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                ExecutionEvent::ExecutionStarted { .. } => {
                    println!("▶️  Execution started");
                }
                ExecutionEvent::NodeStarted {
                    node_id, node_type, ..
                } => {
                    println!("  ⚡ Starting node: {} ({})", node_id, node_type);
                }
                ExecutionEvent::NodeCompleted { node_id, .. } => {
                    println!("  ✅ Node {} completed", node_id);
                }
                ExecutionEvent::NodeFailed { node_id, error, .. } => {
                    println!("  ❌ Node {} failed: {}", node_id, error);
                }
                ExecutionEvent::ExecutionFinished { status, .. } => {
                    println!("🏁 Execution finished: {:?}", status);
                }
            }
        }
    });

    let request = runtime.start_run(workflow.id, selected).await?;
    let execution_id = request.execution_id;
    let result = runtime.run(request).await;

    // Let in-flight event prints drain
    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
    event_task.abort();

    println!();
    match &result {
        Ok(summary) => {
            println!("📊 Execution Summary:");
            println!("   Execution ID: {}", summary.execution_id);
            println!("   Levels: {}", summary.levels);
            println!("   Nodes: {}", summary.nodes);
        }
        Err(e) => {
            println!("💥 Execution failed: {}", e);
        }
    }

    let (_, steps) = runtime.execution(execution_id).await?;
    if !steps.is_empty() {
        println!();
        println!("📤 Steps:");
        for step in steps {
            match step.status {
                StepStatus::Completed => println!(
                    "   ✅ {}: {}",
                    step.node_id,
                    step.output
                        .map(|o| o.to_string())
                        .unwrap_or_else(|| "(no output)".to_string())
                ),
                StepStatus::Failed => println!(
                    "   ❌ {}: {}",
                    step.node_id,
                    step.error.unwrap_or_else(|| "(no error message)".to_string())
                ),
                other => println!("   ⏳ {}: {:?}", step.node_id, other),
            }
        }
    }

    result?;
    Ok(())
}

fn validate_workflow(file: PathBuf) -> Result<()> {
    println!("🔍 Validating workflow: {}", file.display());

    let workflow_json = std::fs::read_to_string(&file)?;
    let workflow: Workflow = serde_json::from_str(&workflow_json)?;

    if !is_acyclic(&workflow.edges) {
        anyhow::bail!("workflow contains a cycle");
    }

    let mut blocked = 0;
    for edge in &workflow.edges {
        let source = workflow.find_node(&edge.source);
        let target = workflow.find_node(&edge.target);
        match (source, target) {
            (Some(source), Some(target)) => {
                if !can_connect(
                    source,
                    edge.source_handle.as_deref(),
                    target,
                    edge.target_handle.as_deref(),
                ) {
                    println!(
                        "   ❌ Incompatible ports: {} -> {}",
                        edge.source, edge.target
                    );
                    blocked += 1;
                }
            }
            _ => {
                println!(
                    "   ❌ Edge references missing node: {} -> {}",
                    edge.source, edge.target
                );
                blocked += 1;
            }
        }
    }

    if blocked > 0 {
        anyhow::bail!("{blocked} invalid edge(s)");
    }

    println!("✅ Workflow is valid:");
    println!("   Name: {}", workflow.name);
    println!("   Nodes: {}", workflow.nodes.len());
    println!("   Edges: {}", workflow.edges.len());

    Ok(())
}

fn port_type_name(port_type: PortType) -> &'static str {
    match port_type {
        PortType::Text => "text",
        PortType::Image => "image",
        PortType::Video => "video",
        PortType::Any => "any",
    }
}

fn list_nodes() {
    println!("📦 Available Node Types:");
    println!();

    let kinds = [
        NodeKind::Text(Default::default()),
        NodeKind::UploadImage(Default::default()),
        NodeKind::UploadVideo(Default::default()),
        NodeKind::Llm(Default::default()),
        NodeKind::CropImage(Default::default()),
        NodeKind::ExtractFrame(Default::default()),
        NodeKind::Output,
    ];

    for kind in &kinds {
        println!("  • {}", kind.type_name());
        for port in input_ports(kind) {
            println!("    in:  {} ({})", port.id, port_type_name(port.port_type));
        }
        for port in output_ports(kind) {
            println!("    out: {} ({})", port.id, port_type_name(port.port_type));
        }
    }
}

fn create_example_workflow(output: PathBuf) -> Result<()> {
    let mut workflow = Workflow::new("Example LLM Workflow");

    let text_id = workflow.add_node(Node::new(
        "text-1",
        NodeKind::Text(TextConfig {
            text: Some("Describe the Rust programming language in one sentence.".to_string()),
            label: Some("Prompt".to_string()),
        }),
    ));
    let llm_id = workflow.add_node(Node::new(
        "llm-1",
        NodeKind::Llm(LlmConfig {
            prompt: None,
            model: Some("gemini-2.0-flash".to_string()),
            label: Some("Run LLM".to_string()),
        }),
    ));
    let output_id = workflow.add_node(Node::new("output-1", NodeKind::Output));

    workflow.connect(Edge::new(text_id.clone(), llm_id.clone()).with_handles("text", "user_message"));
    workflow.connect(Edge::new(llm_id, output_id).with_handles("output", "input"));

    let json = serde_json::to_string_pretty(&workflow)?;
    std::fs::write(&output, json)?;

    println!("✨ Created example workflow: {}", output.display());
    println!();
    println!("Run it with:");
    println!("  loom run --file {}", output.display());

    Ok(())
}
