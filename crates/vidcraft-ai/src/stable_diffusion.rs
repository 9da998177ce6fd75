//! Stable Diffusion WebUI client.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AiConfig;
use crate::error::{AiError, AiResult};
use crate::media::GeneratedImage;
use crate::ImageGenerator;

const BACKEND: &str = "Stable Diffusion";

#[derive(Debug, Serialize)]
struct Txt2ImgRequest<'a> {
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct Txt2ImgResponse {
    #[serde(default)]
    images: Vec<String>,
}

/// Client for `/sdapi/v1/txt2img`.
pub struct StableDiffusionClient {
    client: Client,
    endpoint: String,
}

impl StableDiffusionClient {
    pub fn new(client: Client, config: &AiConfig) -> Self {
        Self {
            client,
            endpoint: config.sd_endpoint.clone(),
        }
    }
}

fn decode_image(encoded: &str) -> AiResult<Vec<u8>> {
    // WebUI may prefix the payload with a data URL header.
    let payload = match encoded.split_once(";base64,") {
        Some((_, data)) => data,
        None => encoded,
    };
    STANDARD
        .decode(payload.trim())
        .map_err(|e| AiError::invalid_response(BACKEND, format!("image is not valid base64: {e}")))
}

#[async_trait]
impl ImageGenerator for StableDiffusionClient {
    async fn text_to_image(&self, prompt: &str) -> AiResult<GeneratedImage> {
        let url = format!("{}/sdapi/v1/txt2img", self.endpoint);
        debug!(prompt_len = prompt.len(), "Requesting image generation");

        let response = self
            .client
            .post(&url)
            .json(&Txt2ImgRequest { prompt })
            .send()
            .await
            .map_err(|e| AiError::request(BACKEND, e))?;
        let response = AiError::check(BACKEND, response).await?;

        let body: Txt2ImgResponse = response
            .json()
            .await
            .map_err(|e| AiError::invalid_response(BACKEND, e.to_string()))?;
        let first = body
            .images
            .first()
            .ok_or_else(|| AiError::invalid_response(BACKEND, "no image returned"))?;

        Ok(GeneratedImage::new(decode_image(first)?))
    }
}
