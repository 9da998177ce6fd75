//! Axum HTTP API server.
//!
//! This crate provides:
//! - Narrative submission and task status polling
//! - Render CRUD, progress and download URLs
//! - Gateway-supplied caller identity (`X-User-Id`)
//! - Security headers, request ids and Prometheus metrics

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use auth::AuthUser;
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
