//! Generative backend error types.

use thiserror::Error;

pub type AiResult<T> = Result<T, AiError>;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("{backend} request failed: {source}")]
    Request {
        backend: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{backend} API error: {status} {body}")]
    Status {
        backend: &'static str,
        status: u16,
        body: String,
    },

    #[error("{backend} returned an invalid response: {message}")]
    InvalidResponse {
        backend: &'static str,
        message: String,
    },

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl AiError {
    pub fn request(backend: &'static str, source: reqwest::Error) -> Self {
        Self::Request { backend, source }
    }

    pub fn invalid_response(backend: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            backend,
            message: message.into(),
        }
    }

    /// Turn a non-success response into [`AiError::Status`].
    pub(crate) async fn check(
        backend: &'static str,
        response: reqwest::Response,
    ) -> AiResult<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(Self::Status {
            backend,
            status,
            body,
        })
    }
}
