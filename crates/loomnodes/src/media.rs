use async_trait::async_trait;
use loomcore::NodeError;
use loomruntime::{CropRequest, FrameRequest, MediaEffector};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

/// Media effector backed by an HTTP media-processing pipeline.
///
/// Jobs are posted as assemblies of named steps; the pipeline runs them
/// synchronously and replies with per-step results, from which the terminal
/// step's first output URL is taken.
pub struct HttpMediaService {
    client: reqwest::Client,
    endpoint: Option<String>,
    auth_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AssemblyResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    results: HashMap<String, Vec<AssemblyResult>>,
}

#[derive(Debug, Deserialize)]
struct AssemblyResult {
    ssl_url: String,
}

impl HttpMediaService {
    pub fn new(endpoint: impl Into<String>, auth_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: Some(endpoint.into()),
            auth_key: Some(auth_key.into()),
        }
    }

    /// Credentials resolved lazily, erroring only when a media node runs
    pub fn from_env() -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: std::env::var("MEDIA_PIPELINE_URL").ok(),
            auth_key: std::env::var("MEDIA_PIPELINE_KEY").ok(),
        }
    }

    async fn run_assembly(
        &self,
        steps: Value,
        terminal_step: &str,
        cancellation: &tokio_util::sync::CancellationToken,
    ) -> Result<String, NodeError> {
        let (endpoint, auth_key) = match (&self.endpoint, &self.auth_key) {
            (Some(endpoint), Some(auth_key)) => (endpoint, auth_key),
            _ => {
                return Err(NodeError::Configuration(
                    "Missing MEDIA_PIPELINE_URL or MEDIA_PIPELINE_KEY".to_string(),
                ))
            }
        };

        tracing::info!(terminal_step, "creating media assembly");

        let request = self
            .client
            .post(format!("{endpoint}/assemblies"))
            .bearer_auth(auth_key)
            .json(&json!({ "steps": steps, "wait": true }));

        let response = tokio::select! {
            _ = cancellation.cancelled() => return Err(NodeError::Cancelled),
            response = request.send() => response
                .map_err(|e| NodeError::EffectorFailed(format!("media pipeline request failed: {e}")))?,
        };

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(NodeError::EffectorFailed(format!(
                "media pipeline error: {status} - {detail}"
            )));
        }

        let assembly: AssemblyResponse = response.json().await.map_err(|e| {
            NodeError::EffectorFailed(format!("media pipeline response unreadable: {e}"))
        })?;

        if let Some(error) = assembly.error {
            return Err(NodeError::EffectorFailed(format!(
                "media pipeline error: {error}"
            )));
        }

        assembly
            .results
            .get(terminal_step)
            .and_then(|results| results.first())
            .map(|result| result.ssl_url.clone())
            .ok_or_else(|| {
                NodeError::EffectorFailed("No output generated from media pipeline".to_string())
            })
    }
}

#[async_trait]
impl MediaEffector for HttpMediaService {
    async fn crop_image(&self, request: CropRequest) -> Result<String, NodeError> {
        let steps = json!({
            "imported": { "robot": "/http/import", "url": request.image_url },
            "cropped": {
                "robot": "/image/resize",
                "use": "imported",
                "mode": "crop",
                "width": request.width,
                "height": request.height,
                "x": request.x,
                "y": request.y,
            },
        });

        self.run_assembly(steps, "cropped", &request.cancellation)
            .await
    }

    async fn extract_frame(&self, request: FrameRequest) -> Result<String, NodeError> {
        let steps = json!({
            "imported": { "robot": "/http/import", "url": request.video_url },
            "frame": {
                "robot": "/video/thumbs",
                "use": "imported",
                "offsets": [request.timestamp],
                "count": 1,
            },
        });

        self.run_assembly(steps, "frame", &request.cancellation)
            .await
    }
}
