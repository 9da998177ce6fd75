//! Ollama text generation client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AiConfig;
use crate::error::{AiError, AiResult};
use crate::TextGenerator;

const BACKEND: &str = "Ollama";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Client for Ollama's `/api/generate` endpoint.
pub struct OllamaClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl OllamaClient {
    pub fn new(client: Client, config: &AiConfig) -> Self {
        Self {
            client,
            endpoint: config.ollama_endpoint.clone(),
            model: config.ollama_model.clone(),
            api_key: config.ollama_api_key.clone(),
        }
    }
}

#[async_trait]
impl TextGenerator for OllamaClient {
    async fn generate(&self, prompt: &str) -> AiResult<String> {
        let url = format!("{}/api/generate", self.endpoint);
        debug!(model = %self.model, prompt_len = prompt.len(), "Requesting text generation");

        let mut request = self.client.post(&url).json(&GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AiError::request(BACKEND, e))?;
        let response = AiError::check(BACKEND, response).await?;

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AiError::invalid_response(BACKEND, e.to_string()))?;
        Ok(body.response)
    }
}
