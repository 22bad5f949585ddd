//! HTTP client for the local Ollama daemon.
//!
//! Talks to `/api/generate`, falling back to `/api/chat` when the
//! generate endpoint is absent (older daemons). A transport failure
//! never aborts an analysis run: `ask` degrades to a synthesized
//! structured answer describing the connection problem.

use crate::models::ModelAnswer;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from the Ollama client.
#[derive(Debug, Error)]
pub enum OllamaError {
    #[error("cannot reach Ollama at {url}: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("Ollama API error {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("failed to decode Ollama response: {0}")]
    Decode(#[source] reqwest::Error),
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: ChatResponseMessage,
}

#[derive(Debug, Default, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: String,
}

/// Client for one Ollama server and model.
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    timeout_secs: u64,
}

impl OllamaClient {
    /// Build a client with request and connect timeouts.
    pub fn new(
        base_url: &str,
        model: &str,
        timeout_secs: u64,
        connect_timeout_secs: u64,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            timeout_secs,
        })
    }

    /// Model name this client sends.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Check that the server answers at all (GET /api/tags).
    pub async fn probe(&self) -> Result<(), OllamaError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            return Err(OllamaError::Unreachable {
                url: self.base_url.clone(),
                reason: format!("server returned status {}", response.status()),
            });
        }
        Ok(())
    }

    /// Ask the model, degrading to a synthesized structured answer on
    /// any client error so a run always produces a report.
    pub async fn ask(&self, prompt: &str) -> ModelAnswer {
        match self.ask_text(prompt).await {
            Ok(text) => decode_answer(text.trim()),
            Err(e) => {
                warn!("Ollama request failed: {}", e);
                ModelAnswer::Structured(unreachable_answer(&self.base_url, &self.model, &e))
            }
        }
    }

    /// Ask the model and return the raw reply text. Errors propagate;
    /// used where the caller has its own fallback (MMM refinement).
    pub async fn ask_text(&self, prompt: &str) -> Result<String, OllamaError> {
        self.probe().await?;

        match self.try_generate(prompt).await {
            Ok(text) => Ok(text),
            // /api/generate missing on this daemon, try the chat API
            Err(OllamaError::Api { status, .. }) if status == reqwest::StatusCode::NOT_FOUND => {
                debug!("/api/generate returned 404, falling back to /api/chat");
                self.try_chat(prompt).await
            }
            Err(e) => Err(e),
        }
    }

    async fn try_generate(&self, prompt: &str) -> Result<String, OllamaError> {
        let url = format!("{}/api/generate", self.base_url);
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OllamaError::Api { status, body });
        }

        let decoded: GenerateResponse = response.json().await.map_err(OllamaError::Decode)?;
        Ok(decoded.response.trim().to_string())
    }

    async fn try_chat(&self, prompt: &str) -> Result<String, OllamaError> {
        let url = format!("{}/api/chat", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
        };

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(OllamaError::Api { status, body });
        }

        let decoded: ChatResponse = response.json().await.map_err(OllamaError::Decode)?;
        Ok(decoded.message.content.trim().to_string())
    }

    fn transport_error(&self, e: reqwest::Error) -> OllamaError {
        if e.is_timeout() {
            OllamaError::Timeout {
                secs: self.timeout_secs,
            }
        } else {
            OllamaError::Unreachable {
                url: self.base_url.clone(),
                reason: e.to_string(),
            }
        }
    }
}

/// Decode a model reply: a JSON object, a JSON object embedded in
/// surrounding prose, or plain text.
pub fn decode_answer(text: &str) -> ModelAnswer {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        if value.is_object() {
            return ModelAnswer::Structured(value);
        }
    }

    // Try the substring from the first '{' to the last '}'
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<Value>(&text[start..=end]) {
                if value.is_object() {
                    return ModelAnswer::Structured(value);
                }
            }
        }
    }

    ModelAnswer::Text(text.to_string())
}

/// The degraded answer returned when the server cannot be used.
fn unreachable_answer(url: &str, model: &str, err: &OllamaError) -> Value {
    json!({
        "root_cause": format!(
            "Ollama server connection failed. Cannot reach the local AI model server at {}.",
            url
        ),
        "why": [
            format!("Connection error: {}", err),
            "Ollama server may not be running or accessible",
            "Network connectivity issues or incorrect server configuration",
        ],
        "next_steps": [
            "Start Ollama server by running: ollama serve",
            format!("Ensure the {} model is available by running: ollama pull {}", model, model),
            "Verify the server URL and port configuration in the application",
        ],
    })
}
