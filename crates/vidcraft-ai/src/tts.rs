//! Text-to-speech client.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::config::AiConfig;
use crate::error::{AiError, AiResult};
use crate::media::GeneratedAudio;
use crate::SpeechSynthesizer;

const BACKEND: &str = "TTS";

#[derive(Debug, Serialize)]
struct SynthesizeRequest<'a> {
    text: &'a str,
}

/// Client for a `/tts` endpoint that answers with raw audio bytes.
pub struct TtsClient {
    client: Client,
    endpoint: String,
}

impl TtsClient {
    pub fn new(client: Client, config: &AiConfig) -> Self {
        Self {
            client,
            endpoint: config.tts_endpoint.clone(),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for TtsClient {
    async fn synthesize(&self, text: &str) -> AiResult<GeneratedAudio> {
        let url = format!("{}/tts", self.endpoint);
        debug!(text_len = text.len(), "Requesting speech synthesis");

        let response = self
            .client
            .post(&url)
            .json(&SynthesizeRequest { text })
            .send()
            .await
            .map_err(|e| AiError::request(BACKEND, e))?;
        let response = AiError::check(BACKEND, response).await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = response
            .bytes()
            .await
            .map_err(|e| AiError::request(BACKEND, e))?
            .to_vec();

        if data.is_empty() {
            return Err(AiError::invalid_response(BACKEND, "empty audio"));
        }
        Ok(GeneratedAudio::new(data, content_type))
    }
}
