//! Backend endpoints and HTTP settings.

use std::time::Duration;

use crate::error::{AiError, AiResult};

#[derive(Debug, Clone)]
pub struct AiConfig {
    /// Ollama base URL
    pub ollama_endpoint: String,
    pub ollama_model: String,
    /// Bearer token sent to Ollama when set
    pub ollama_api_key: Option<String>,
    /// Stable Diffusion WebUI base URL
    pub sd_endpoint: String,
    /// Text-to-speech service base URL
    pub tts_endpoint: String,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            ollama_endpoint: "http://127.0.0.1:11434".to_string(),
            ollama_model: "llama2".to_string(),
            ollama_api_key: None,
            sd_endpoint: "http://127.0.0.1:7860".to_string(),
            tts_endpoint: "http://127.0.0.1:50021".to_string(),
            request_timeout: Duration::from_secs(300),
        }
    }
}

impl AiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            ollama_endpoint: env_or("OLLAMA_ENDPOINT", defaults.ollama_endpoint),
            ollama_model: env_or("OLLAMA_MODEL", defaults.ollama_model),
            ollama_api_key: std::env::var("OLLAMA_API_KEY")
                .ok()
                .filter(|s| !s.is_empty()),
            sd_endpoint: env_or("SD_ENDPOINT", defaults.sd_endpoint),
            tts_endpoint: env_or("TTS_ENDPOINT", defaults.tts_endpoint),
            request_timeout: Duration::from_secs(
                std::env::var("AI_REQUEST_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
        }
    }

    /// HTTP client shared by the backend clients.
    pub fn http_client(&self) -> AiResult<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.request_timeout)
            .build()
            .map_err(|e| AiError::Client(e.to_string()))
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key)
        .ok()
        .filter(|s| !s.is_empty())
        .map(|s| s.trim_end_matches('/').to_string())
        .unwrap_or(default)
}
