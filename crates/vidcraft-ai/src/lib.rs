//! Generative backends.
//!
//! The narrative pipeline depends only on the three traits here. Each has
//! a thin HTTP client for the backend used in deployment:
//! - [`OllamaClient`] for text
//! - [`StableDiffusionClient`] for images (Stable Diffusion WebUI)
//! - [`TtsClient`] for speech

use async_trait::async_trait;

pub mod config;
pub mod error;
pub mod media;
pub mod ollama;
pub mod stable_diffusion;
pub mod tts;

pub use config::AiConfig;
pub use error::{AiError, AiResult};
pub use media::{GeneratedAudio, GeneratedImage};
pub use ollama::OllamaClient;
pub use stable_diffusion::StableDiffusionClient;
pub use tts::TtsClient;

/// Single-prompt text generation.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> AiResult<String>;
}

/// Text-to-image generation.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn text_to_image(&self, prompt: &str) -> AiResult<GeneratedImage>;
}

/// Text-to-speech synthesis.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> AiResult<GeneratedAudio>;
}
