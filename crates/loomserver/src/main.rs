use actix_cors::Cors;
use actix_web::{
    get, post, web, App, HttpResponse, HttpServer, Responder, Result as ActixResult,
};
use loomcore::{is_acyclic, Execution, ExecutionStep, NodeId, Workflow};
use loomruntime::{LoomRuntime, MemoryStore, WorkflowStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

/// Application state shared across handlers
struct AppState {
    runtime: LoomRuntime,
}

/// Optional body of a run request
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunBody {
    #[serde(default)]
    selected_node_ids: Vec<NodeId>,
}

/// Response for workflow creation
#[derive(Debug, Serialize)]
struct WorkflowResponse {
    id: Uuid,
    message: String,
}

/// Response for triggering a run
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunResponse {
    success: bool,
    execution_id: Uuid,
    scope: String,
}

/// Polling view: the execution with its steps
#[derive(Debug, Serialize)]
struct ExecutionView {
    #[serde(flatten)]
    execution: Execution,
    steps: Vec<ExecutionStep>,
}

/// Error response
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Health check endpoint
#[get("/health")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "loomserver"
    }))
}

/// List all workflows
#[get("/api/workflows")]
async fn list_workflows(data: web::Data<AppState>) -> ActixResult<impl Responder> {
    match data.runtime.workflows().list_workflows().await {
        Ok(workflows) => {
            let summaries: Vec<_> = workflows
                .iter()
                .map(|w| {
                    serde_json::json!({
                        "id": w.id,
                        "name": w.name,
                        "nodes": w.nodes.len(),
                        "edges": w.edges.len(),
                    })
                })
                .collect();
            Ok(HttpResponse::Ok().json(summaries))
        }
        Err(e) => Ok(HttpResponse::InternalServerError().json(ErrorResponse {
            error: e.to_string(),
        })),
    }
}

/// Create a workflow. Cyclic graphs are rejected before anything persists.
#[post("/api/workflows")]
async fn create_workflow(
    data: web::Data<AppState>,
    workflow: web::Json<Workflow>,
) -> ActixResult<impl Responder> {
    let workflow = workflow.into_inner();
    let workflow_id = workflow.id;

    if !is_acyclic(&workflow.edges) {
        return Ok(HttpResponse::BadRequest().json(ErrorResponse {
            error: "Cyclic dependency detected".to_string(),
        }));
    }

    info!("Creating workflow: {} ({})", workflow.name, workflow_id);

    if let Err(e) = data.runtime.workflows().save_workflow(workflow).await {
        return Ok(HttpResponse::InternalServerError().json(ErrorResponse {
            error: e.to_string(),
        }));
    }

    Ok(HttpResponse::Created().json(WorkflowResponse {
        id: workflow_id,
        message: "Workflow created successfully".to_string(),
    }))
}

/// Get a specific workflow
#[get("/api/workflows/{id}")]
async fn get_workflow(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> ActixResult<impl Responder> {
    let workflow_id = path.into_inner();

    match data.runtime.workflows().fetch_workflow(workflow_id).await {
        Ok(workflow) => Ok(HttpResponse::Ok().json(workflow)),
        Err(_) => Ok(HttpResponse::NotFound().json(ErrorResponse {
            error: format!("Workflow {} not found", workflow_id),
        })),
    }
}

/// Trigger a run: full when the body names no nodes, otherwise partial
/// with dependency closure
#[post("/api/workflows/{id}/run")]
async fn run_workflow(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: Option<web::Json<RunBody>>,
) -> ActixResult<impl Responder> {
    let workflow_id = path.into_inner();
    let selected = body.map(|b| b.into_inner().selected_node_ids).unwrap_or_default();

    let scope = loomcore::ExecutionScope::from_selection(&selected).to_string();
    info!(
        "Triggering run for workflow {} (scope: {})",
        workflow_id, scope
    );

    match data.runtime.trigger(workflow_id, selected).await {
        Ok(execution_id) => Ok(HttpResponse::Ok().json(RunResponse {
            success: true,
            execution_id,
            scope,
        })),
        Err(e) => {
            error!("Failed to trigger run for {}: {}", workflow_id, e);
            Ok(HttpResponse::BadRequest().json(ErrorResponse {
                error: e.to_string(),
            }))
        }
    }
}

/// Polling surface: current execution status plus its steps
#[get("/api/executions/{id}")]
async fn get_execution(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> ActixResult<impl Responder> {
    let execution_id = path.into_inner();

    match data.runtime.execution(execution_id).await {
        Ok((execution, steps)) => Ok(HttpResponse::Ok().json(ExecutionView { execution, steps })),
        Err(_) => Ok(HttpResponse::NotFound().json(ErrorResponse {
            error: format!("Execution {} not found", execution_id),
        })),
    }
}

/// Best-effort cancellation of an in-flight run
#[post("/api/executions/{id}/cancel")]
async fn cancel_execution(
    data: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> ActixResult<impl Responder> {
    let execution_id = path.into_inner();

    if data.runtime.cancel(execution_id).await {
        Ok(HttpResponse::Ok().json(serde_json::json!({ "success": true })))
    } else {
        Ok(HttpResponse::NotFound().json(serde_json::json!({
            "success": false,
            "message": "Run not found or already finished"
        })))
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("🚀 Starting Loom Server");

    let store = Arc::new(MemoryStore::new());
    let runtime = LoomRuntime::new(store.clone(), store, loomnodes::effectors_from_env());

    info!("✅ Runtime initialized");

    let app_state = web::Data::new(AppState { runtime });

    let bind_address = std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

    info!("🌐 Server starting on http://{}", bind_address);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(app_state.clone())
            .wrap(cors)
            .wrap(actix_web::middleware::Logger::default())
            .service(health_check)
            .service(list_workflows)
            .service(create_workflow)
            .service(get_workflow)
            .service(run_workflow)
            .service(get_execution)
            .service(cancel_execution)
    })
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}
