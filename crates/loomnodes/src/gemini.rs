use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use loomcore::NodeError;
use loomruntime::{LlmEffector, LlmRequest};
use serde_json::{json, Value};

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Map friendly editor model names onto API model ids; legacy and
/// deprecated names upgrade to the current flash model
pub fn normalize_model(requested: &str) -> String {
    let m = requested.trim();
    match m {
        "Gemini 2.0 Flash" | "gemini-2.0-flash" => DEFAULT_MODEL.to_string(),
        "Gemini 1.5 Flash" | "gemini-1.5-flash" => DEFAULT_MODEL.to_string(),
        "Gemini Pro" | "gemini-pro" => DEFAULT_MODEL.to_string(),
        m if m.starts_with("gemini-") => m.to_string(),
        _ => DEFAULT_MODEL.to_string(),
    }
}

/// LLM effector backed by the Generative Language API
pub struct GeminiLlm {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl GeminiLlm {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: Some(api_key.into()),
        }
    }

    /// Key resolved lazily: a missing `GEMINI_API_KEY` only errors once an
    /// LLM node actually executes
    pub fn from_env() -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: std::env::var("GEMINI_API_KEY").ok(),
        }
    }

    async fn call(&self, request: &LlmRequest) -> Result<String, NodeError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| NodeError::Configuration("GEMINI_API_KEY not set".to_string()))?;

        let model = normalize_model(&request.model);
        tracing::debug!(requested = %request.model, resolved = %model, "resolved model name");

        let url = format!("{API_BASE}/{model}:generateContent?key={api_key}");

        let mut parts: Vec<Value> = Vec::new();
        if !request.prompt.is_empty() {
            parts.push(json!({ "text": request.prompt }));
        }

        for image_url in &request.images {
            match self.inline_image(image_url).await {
                Ok(part) => parts.push(part),
                // A dead image URL degrades the call, it does not fail it
                Err(e) => {
                    tracing::error!(image_url = %image_url, error = %e, "failed to inline image")
                }
            }
        }

        let mut body = json!({ "contents": [{ "parts": parts }] });
        if let Some(system_prompt) = &request.system_prompt {
            body["systemInstruction"] = json!({ "parts": [{ "text": system_prompt }] });
        }

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| NodeError::EffectorFailed(format!("Gemini request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(NodeError::EffectorFailed(format!(
                "Gemini API error: {status} - {detail}"
            )));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| NodeError::EffectorFailed(format!("Gemini response unreadable: {e}")))?;

        let text = data["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .unwrap_or("No response generated")
            .to_string();

        Ok(text)
    }

    async fn inline_image(&self, image_url: &str) -> Result<Value, NodeError> {
        let response = self
            .client
            .get(image_url)
            .send()
            .await
            .map_err(|e| NodeError::EffectorFailed(format!("image fetch failed: {e}")))?;

        if !response.status().is_success() {
            return Err(NodeError::EffectorFailed(format!(
                "image fetch returned {}",
                response.status()
            )));
        }

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/jpeg")
            .to_string();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| NodeError::EffectorFailed(format!("image body unreadable: {e}")))?;

        Ok(json!({
            "inlineData": {
                "mimeType": mime_type,
                "data": BASE64.encode(&bytes),
            }
        }))
    }
}

#[async_trait]
impl LlmEffector for GeminiLlm {
    async fn generate(&self, request: LlmRequest) -> Result<String, NodeError> {
        tracing::info!(
            node_id = %request.node_id,
            model = %request.model,
            images = request.images.len(),
            "running LLM node"
        );

        tokio::select! {
            _ = request.cancellation.cancelled() => Err(NodeError::Cancelled),
            result = self.call(&request) => result,
        }
    }
}
